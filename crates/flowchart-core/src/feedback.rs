//! Turns findings into short, actionable sentences for the diagram author.

use crate::assess::{Finding, Severity};
use crate::classify::strip_tags;
use crate::decode::decode_entities;

pub const ALL_GOOD: &str =
    "Great! Your flowchart structure looks good and follows all the basic rules.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Group {
    Start,
    End,
    Connection,
    Other,
}

fn group_of(rule_id: &str) -> Group {
    if rule_id.contains("START") {
        Group::Start
    } else if rule_id.contains("END") {
        Group::End
    } else if rule_id.contains("UNCONNECTED")
        || rule_id.contains("OUTGOING")
        || rule_id.contains("INCOMING")
    {
        Group::Connection
    } else {
        Group::Other
    }
}

/// One message per finding, start issues first, then end, connection, other.
pub fn generate_feedback_messages(findings: &[Finding]) -> Vec<String> {
    if findings.is_empty() {
        return vec![ALL_GOOD.to_string()];
    }
    let mut ordered: Vec<&Finding> = findings.iter().collect();
    // Stable: findings keep their relative order inside a group.
    ordered.sort_by_key(|finding| group_of(&finding.rule_id));
    ordered
        .into_iter()
        .filter_map(|finding| match group_of(&finding.rule_id) {
            Group::Start => start_feedback(finding),
            Group::End => end_feedback(finding),
            Group::Connection => Some(connection_feedback(finding)),
            Group::Other => Some(other_feedback(finding)),
        })
        .collect()
}

fn start_feedback(finding: &Finding) -> Option<String> {
    match finding.rule_id.as_str() {
        "NO_START_SYMBOL" => Some(
            "Missing start symbol: add exactly one 'Start' symbol (usually an oval) to show where the program begins."
                .into(),
        ),
        "MULTIPLE_START_SYMBOLS" => Some(format!(
            "Too many start symbols: the flowchart has {} but needs exactly one entry point.",
            finding.elements.len()
        )),
        "START_SYMBOL_NO_OUTGOING" => Some(
            "Disconnected start: draw an arrow from the start symbol to the first step.".into(),
        ),
        _ => None,
    }
}

fn end_feedback(finding: &Finding) -> Option<String> {
    match finding.rule_id.as_str() {
        "NO_END_SYMBOL" => Some(
            "Missing end symbol: add at least one 'End' symbol (usually an oval) to show where the program finishes."
                .into(),
        ),
        "END_SYMBOL_NO_INCOMING" => Some(
            "Disconnected end: draw an arrow from the last step to the end symbol.".into(),
        ),
        _ => None,
    }
}

fn connection_feedback(finding: &Finding) -> String {
    let symbol = quoted_symbol(&finding.message)
        .map(clean_label)
        .filter(|label| !label.is_empty());
    let subject = match &symbol {
        Some(label) => format!("The element \"{label}\""),
        None => "An element".to_string(),
    };
    match finding.rule_id.as_str() {
        "UNCONNECTED_SYMBOL_BOTH" => format!(
            "Floating element: {subject} is not connected. Connect it with arrows to show the flow."
        ),
        "UNCONNECTED_SYMBOL_NO_INCOMING" => format!(
            "Missing incoming connection: {subject} has no incoming arrows. Connect it to the previous step."
        ),
        "UNCONNECTED_SYMBOL_NO_OUTGOING" => format!(
            "Missing outgoing connection: {subject} has no outgoing arrows. Connect it to the next step or to an end symbol."
        ),
        _ => "Connection issue: check that every element has arrows showing the flow.".into(),
    }
}

fn other_feedback(finding: &Finding) -> String {
    let prefix = match finding.severity {
        Severity::Error => "Error",
        Severity::Warning => "Warning",
        Severity::Info => "Tip",
    };
    format!("{prefix}: {}", without_parentheticals(&finding.message))
}

/// Text between the first `'` pair after `Symbol `.
fn quoted_symbol(message: &str) -> Option<&str> {
    let rest = &message[message.find("Symbol '")? + "Symbol '".len()..];
    rest.rfind("' (").map(|end| &rest[..end])
}

/// Strip HTML tags and entities from a node label.
pub fn clean_label(text: &str) -> String {
    strip_tags(&decode_entities(text))
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drops `(...)` runs such as element ids and collapses whitespace.
fn without_parentheticals(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut depth = 0usize;
    for c in message.chars() {
        match c {
            '(' => {
                depth += 1;
                out.push(' ');
            }
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
