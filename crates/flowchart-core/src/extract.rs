//! Element extraction: flat cell list -> typed nodes and edges.

use std::collections::BTreeSet;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::classify::classify;
use crate::diagnostics::{Diagnostic, DiagnosticSink, SkipReason, TracingSink};
use crate::document::{ParseError, ParseResult};
use crate::graph::{Edge, ExtractionResult, Geometry, Node, Topology};
use crate::model::{Cell, Document};

/// Fill used when a style names no recognizable color.
pub const DEFAULT_FILL: &str = "#f0f0f0";

const NAMED_COLORS: &[(&str, &str)] = &[
    ("red", "#ff0000"),
    ("blue", "#0000ff"),
    ("green", "#008000"),
    ("yellow", "#ffff00"),
    ("orange", "#ffa500"),
    ("purple", "#800080"),
    ("pink", "#ffc0cb"),
    ("cyan", "#00ffff"),
    ("white", "#ffffff"),
    ("black", "#000000"),
];

/// Build nodes and edges from `document`.
///
/// Returns `None` only for a document without a root element. Edges are read
/// first so that every node is classified with its final in/out degrees.
pub fn extract(document: &Document) -> Option<ExtractionResult> {
    extract_with(document, &TracingSink)
}

pub fn extract_with(document: &Document, sink: &dyn DiagnosticSink) -> Option<ExtractionResult> {
    if document.root.is_empty() {
        return None;
    }

    // Cells without a parent that are neither shape nor connector: the model root.
    let root_ids: BTreeSet<&str> = document
        .cells
        .iter()
        .filter(|cell| cell.parent.is_none() && !cell.is_vertex() && !cell.is_edge())
        .filter_map(|cell| cell.id.as_deref())
        .collect();

    let mut edges = Vec::new();
    let mut edge_ids = BTreeSet::new();
    for cell in document.cells.iter().filter(|c| c.is_edge() && !c.is_vertex()) {
        let Some(id) = cell.id.as_deref() else {
            continue;
        };
        if let Some(reason) = structural_skip(cell, &root_ids) {
            sink.emit(skipped(id, reason));
            continue;
        }
        if !edge_ids.insert(id) {
            sink.emit(skipped(id, SkipReason::DuplicateId));
            continue;
        }
        edges.push(Edge {
            id: id.to_string(),
            value: cell.value.clone(),
            style: cell.style.clone(),
            edge: true,
            parent_id: cell.parent.clone(),
            source_id: cell.source.clone(),
            target_id: cell.target.clone(),
        });
    }

    let topology = Topology::from_edges(&edges);

    let mut nodes = Vec::new();
    let mut node_ids = BTreeSet::new();
    for cell in document.cells.iter().filter(|c| c.is_vertex()) {
        let Some(id) = cell.id.as_deref() else {
            continue;
        };
        let value = effective_value(cell, id, sink);
        if let Some(reason) = structural_skip(cell, &root_ids)
            .or_else(|| vertex_skip(cell.style.as_deref(), value.as_deref()))
        {
            sink.emit(skipped(id, reason));
            continue;
        }
        if !node_ids.insert(id) {
            sink.emit(skipped(id, SkipReason::DuplicateId));
            continue;
        }
        let kind = classify(
            cell.style.as_deref(),
            value.as_deref(),
            topology.incoming(id) > 0,
            topology.outgoing(id) > 0,
        );
        nodes.push(Node {
            id: id.to_string(),
            value,
            style: cell.style.clone(),
            kind: Some(kind),
            vertex: true,
            parent_id: cell.parent.clone(),
            color: Some(fill_color(cell.style.as_deref())),
            geometry: cell.geometry.as_ref().map(|g| Geometry {
                x: g.x.unwrap_or(0.0),
                y: g.y.unwrap_or(0.0),
                width: g.width.unwrap_or(0.0),
                height: g.height.unwrap_or(0.0),
            }),
        });
    }

    Some(ExtractionResult { nodes, edges })
}

fn skipped(id: &str, reason: SkipReason) -> Diagnostic {
    Diagnostic::CellSkipped {
        cell_id: id.to_string(),
        reason,
    }
}

fn structural_skip(cell: &Cell, root_ids: &BTreeSet<&str>) -> Option<SkipReason> {
    let parent = cell.parent.as_deref()?;
    root_ids.contains(parent).then_some(SkipReason::Structural)
}

fn vertex_skip(style: Option<&str>, value: Option<&str>) -> Option<SkipReason> {
    let style = style.unwrap_or_default();
    if is_floating_label(style) {
        return Some(SkipReason::FloatingLabel);
    }
    let has_value = value.is_some_and(|v| !v.trim().is_empty());
    if !has_value && !style.contains("group") {
        return Some(SkipReason::Empty);
    }
    None
}

fn is_floating_label(style: &str) -> bool {
    style.contains("edgeLabel")
        || style
            .split(';')
            .next()
            .is_some_and(|first| first.trim() == "text")
}

/// The cell value, replaced by the digits of any embedded math markup.
fn effective_value(cell: &Cell, id: &str, sink: &dyn DiagnosticSink) -> Option<String> {
    let raw = cell.value.as_deref()?;
    match math_value(raw) {
        Ok(Some(digits)) => Some(digits),
        Ok(None) => Some(raw.to_string()),
        Err(err) => {
            sink.emit(Diagnostic::MathMarkupIgnored {
                cell_id: id.to_string(),
                error: err.to_string(),
            });
            Some(raw.to_string())
        }
    }
}

/// Concatenated `<mn>` text of a `<math>` fragment inside `raw`, if any.
pub fn math_value(raw: &str) -> ParseResult<Option<String>> {
    let lower = raw.to_ascii_lowercase();
    let Some(start) = lower.find("<math") else {
        return Ok(None);
    };
    let end = lower
        .rfind("</math>")
        .map(|idx| idx + "</math>".len())
        .filter(|&end| end > start)
        .ok_or_else(|| ParseError::Structure("unterminated <math> element".into()))?;
    let fragment = &raw[start..end];

    let mut reader = Reader::from_str(fragment);
    let mut buf = Vec::new();
    let mut number_depth = 0usize;
    let mut digits = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if number_depth > 0 || e.local_name().as_ref() == b"mn" {
                    number_depth += 1;
                }
            }
            Event::End(_) => {
                number_depth = number_depth.saturating_sub(1);
            }
            Event::Text(t) if number_depth > 0 => {
                digits.push_str(t.decode()?.trim());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((!digits.is_empty()).then_some(digits))
}

/// Normalized `fillColor` of a style string, or [`DEFAULT_FILL`].
pub fn fill_color(style: Option<&str>) -> String {
    style
        .and_then(|style| style_value(style, "fillColor"))
        .and_then(normalize_color)
        .unwrap_or_else(|| DEFAULT_FILL.to_string())
}

/// Value of `key` in a `k=v;k=v` style string.
pub fn style_value<'a>(style: &'a str, key: &str) -> Option<&'a str> {
    style.split(';').find_map(|entry| {
        let (k, v) = entry.split_once('=')?;
        (k.trim() == key).then_some(v.trim())
    })
}

fn normalize_color(raw: &str) -> Option<String> {
    if let Some(hex) = raw.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let hex = hex.to_ascii_lowercase();
        return match hex.len() {
            6 => Some(format!("#{hex}")),
            3 => Some(hex.chars().fold(String::from("#"), |mut out, c| {
                out.push(c);
                out.push(c);
                out
            })),
            _ => None,
        };
    }
    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw))
        .map(|(_, hex)| (*hex).to_string())
}
