//! Multi-page container handling and last-resort payload recovery.

use crate::decode::decode_with;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::document::parse_with;
use crate::model::Document;

/// Length a text span must exceed before the recovery scan tries to decode it.
pub const DEFAULT_MIN_PAYLOAD_LEN: usize = 50;

/// Decode the first page of a container document into its own [`Document`].
///
/// Returns `None` when the container has no page or the page payload decodes
/// to nothing. A page that holds its model inline (no text payload) already
/// has its cells in `document`, so a clone of it is returned.
pub fn unwrap_wrapper(document: &Document) -> Option<Document> {
    unwrap_wrapper_with(document, &TracingSink)
}

pub fn unwrap_wrapper_with(document: &Document, sink: &dyn DiagnosticSink) -> Option<Document> {
    match first_page_content(document, sink)? {
        PageContent::Inline => Some(document.clone()),
        PageContent::Decoded(xml) => parse_with(&xml, sink),
    }
}

pub(crate) enum PageContent {
    /// The page holds its model as child elements, already in the document.
    Inline,
    /// Decoded text of the page payload.
    Decoded(String),
}

pub(crate) fn first_page_content(
    document: &Document,
    sink: &dyn DiagnosticSink,
) -> Option<PageContent> {
    let Some(page) = document.pages.first() else {
        sink.emit(Diagnostic::WrapperPageMissing);
        return None;
    };
    let decoded = match page.payload.as_deref() {
        Some(payload) => decode_with(payload.trim(), sink),
        None if document.has_graph_cells() => return Some(PageContent::Inline),
        None => String::new(),
    };
    if decoded.is_empty() {
        sink.emit(Diagnostic::WrapperPayloadEmpty {
            page_id: page.id.clone(),
        });
        return None;
    }
    Some(PageContent::Decoded(decoded))
}

/// Scan leaf text for an encoded model buried somewhere unexpected.
///
/// Spans no longer than `min_len` characters are ignored. The first span that
/// decodes and parses into a document with at least one vertex or edge wins.
pub fn recover_buried_payload(document: &Document, min_len: usize) -> Option<Document> {
    recover_buried_payload_with(document, min_len, &TracingSink)
}

pub fn recover_buried_payload_with(
    document: &Document,
    min_len: usize,
    sink: &dyn DiagnosticSink,
) -> Option<Document> {
    document
        .text_spans
        .iter()
        .map(|span| span.trim())
        .filter(|span| span.chars().count() > min_len)
        .find_map(|span| {
            let decoded = decode_with(span, sink);
            if decoded.is_empty() {
                return None;
            }
            let recovered = parse_with(&decoded, sink)?;
            if !recovered.has_graph_cells() {
                return None;
            }
            sink.emit(Diagnostic::BuriedPayloadRecovered {
                span_len: span.len(),
            });
            Some(recovered)
        })
}
