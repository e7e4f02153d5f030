mod helpers;

use std::cell::RefCell;

use flowchart_core::decode::{DecodeStrategy, decode_entities};
use flowchart_core::{Diagnostic, decode, decode_with, parse};
use helpers::{encode_diagram_payload, escape_entities, graph_model, percent_encode, vertex};
use proptest::prelude::*;

fn sample_model() -> String {
    graph_model(&vertex("2", "Hello", helpers::RECT))
}

fn strategy_used(input: &str) -> Option<DecodeStrategy> {
    let events = RefCell::new(Vec::new());
    let sink = |diagnostic: Diagnostic| events.borrow_mut().push(diagnostic);
    decode_with(input, &sink);
    events.into_inner().into_iter().find_map(|d| match d {
        Diagnostic::Decoded { strategy } => Some(strategy),
        _ => None,
    })
}

#[test]
fn plain_xml_passes_through_unchanged() {
    let xml = sample_model();
    assert_eq!(decode(&xml), xml);

    let indented = format!("\n   {xml}\n");
    assert_eq!(decode(&indented), indented);
    assert_eq!(strategy_used(&xml), Some(DecodeStrategy::PassThrough));
}

#[test]
fn entity_escaped_xml_is_unescaped_and_parses() {
    let xml = sample_model();
    let escaped = escape_entities(&xml);
    let decoded = decode(&escaped);

    assert_eq!(decoded, xml);
    for entity in ["&lt;", "&gt;", "&quot;", "&#39;", "&nbsp;"] {
        assert!(!decoded.contains(entity), "{entity} left in output");
    }
    assert!(parse(&decoded).is_some());
    assert_eq!(strategy_used(&escaped), Some(DecodeStrategy::Entities));
}

#[test]
fn compressed_payload_round_trips() {
    let xml = sample_model();
    let payload = encode_diagram_payload(&xml);
    assert_eq!(decode(&payload), xml);
    assert_eq!(strategy_used(&payload), Some(DecodeStrategy::Compressed));
}

#[test]
fn percent_wrapped_compressed_payload_round_trips() {
    let xml = sample_model();
    let wrapped = percent_encode(&encode_diagram_payload(&xml));
    assert_eq!(decode(&wrapped), xml);
    assert_eq!(
        strategy_used(&wrapped),
        Some(DecodeStrategy::WrappedCompressed)
    );
}

#[test]
fn compressed_payload_tolerates_line_breaks() {
    let xml = sample_model();
    let payload = encode_diagram_payload(&xml);
    let (head, tail) = payload.split_at(payload.len() / 2);
    assert_eq!(decode(&format!("  {head}\n{tail}\n")), xml);
}

#[test]
fn unusable_input_decodes_to_empty_and_reports_failure() {
    for input in ["", "   ", "not a diagram", "SGVsbG8gd29ybGQ=", "%%%"] {
        assert_eq!(decode(input), "", "input {input:?}");
    }

    let events = RefCell::new(Vec::new());
    let sink = |diagnostic: Diagnostic| events.borrow_mut().push(diagnostic);
    decode_with("not a diagram", &sink);
    assert_eq!(
        events.into_inner(),
        vec![Diagnostic::DecodeFailed { input_len: 13 }]
    );
}

#[test]
fn ampersand_is_decoded_last() {
    assert_eq!(decode_entities("&amp;lt;b&amp;gt;"), "&lt;b&gt;");
    assert_eq!(decode_entities("a&nbsp;b"), "a\u{a0}b");
    assert_eq!(decode_entities("&apos;x&#39;"), "'x'");
}

proptest! {
    #[test]
    fn xml_like_input_is_returned_verbatim(s in "[ \t\n]{0,3}<[a-zA-Z][ -~]{0,60}") {
        prop_assert_eq!(decode(&s), s);
    }

    #[test]
    fn any_label_survives_both_compressed_forms(label in "[A-Za-z0-9 ?=+<>-]{0,40}") {
        let xml = graph_model(&vertex("n", &escape_entities(&label), helpers::RECT));
        let payload = encode_diagram_payload(&xml);
        prop_assert_eq!(decode(&payload), xml.clone());
        prop_assert_eq!(decode(&percent_encode(&payload)), xml);
    }
}
