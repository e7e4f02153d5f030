//! Diagram payload embedded in an exported SVG.
//!
//! The editor stores the diagram on the `<svg>` root as a `content` attribute,
//! either as plain container XML or as base64 + raw deflate (sometimes with a
//! percent-encoding layer inside).

use percent_encoding::percent_decode_str;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::decode::{inflate_base64, looks_like_xml};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::document::{attrs_to_map, local_name_start, parse_document};
use crate::unwrap::{PageContent, first_page_content};

/// Attribute on the SVG root carrying the diagram.
pub const PAYLOAD_ATTR: &str = "content";

/// Pull the diagram XML out of an SVG export.
///
/// A container document is unwrapped one level, so the result is normally a
/// bare `<mxGraphModel>`. `None` when the attribute is absent or nothing decodes.
pub fn extract_from_svg(svg: &str) -> Option<String> {
    extract_from_svg_with(svg, &TracingSink)
}

pub fn extract_from_svg_with(svg: &str, sink: &dyn DiagnosticSink) -> Option<String> {
    let Some(payload) = svg_payload(svg) else {
        sink.emit(Diagnostic::SvgPayloadMissing);
        return None;
    };

    let xml = if looks_like_xml(&payload) && parse_document(&payload).is_ok() {
        payload
    } else {
        inflate_svg_payload(&payload)?
    };

    let document = match parse_document(&xml) {
        Ok(document) => document,
        Err(err) => {
            tracing::debug!(%err, "svg payload is not well-formed");
            return None;
        }
    };
    if !document.is_wrapper() {
        return Some(xml);
    }
    match first_page_content(&document, sink)? {
        PageContent::Inline => Some(xml),
        PageContent::Decoded(page) => Some(page),
    }
}

fn inflate_svg_payload(payload: &str) -> Option<String> {
    let inflated = inflate_base64(payload).ok()?;
    if looks_like_xml(&inflated) {
        return Some(inflated);
    }
    let decoded = percent_decode_str(&inflated).decode_utf8().ok()?;
    looks_like_xml(&decoded).then(|| decoded.into_owned())
}

/// Value of [`PAYLOAD_ATTR`] when the first element is `<svg>`.
fn svg_payload(svg: &str) -> Option<String> {
    let mut reader = Reader::from_str(svg);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Start(e) | Event::Empty(e) => {
                if local_name_start(&e).ok()? != "svg" {
                    return None;
                }
                return attrs_to_map(&e).ok()?.remove(PAYLOAD_ATTR);
            }
            Event::Eof => return None,
            _ => {}
        }
        buf.clear();
    }
}
