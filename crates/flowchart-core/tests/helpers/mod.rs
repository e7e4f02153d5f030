#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::DeflateEncoder;
use percent_encoding::utf8_percent_encode;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use std::io::Read;

/// What `encodeURIComponent` leaves alone.
const ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn percent_encode(text: &str) -> String {
    utf8_percent_encode(text, ENCODE_SET).to_string()
}

pub fn deflate_base64(text: &str) -> String {
    let mut encoder = DeflateEncoder::new(text.as_bytes(), Compression::default());
    let mut compressed = Vec::new();
    encoder
        .read_to_end(&mut compressed)
        .expect("deflate encode");
    STANDARD.encode(compressed)
}

/// base64(raw deflate(percent-encoded xml)), the page payload draw.io writes.
pub fn encode_diagram_payload(xml: &str) -> String {
    deflate_base64(&percent_encode(xml))
}

pub fn escape_entities(xml: &str) -> String {
    xml.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn mxfile(page_payload: &str) -> String {
    format!(r#"<mxfile host="test"><diagram id="page-1" name="Page-1">{page_payload}</diagram></mxfile>"#)
}

/// A graph model holding the given cells under the usual `0`/`1` root cells.
pub fn graph_model(cells: &str) -> String {
    format!(
        r#"<mxGraphModel dx="800" dy="600"><root><mxCell id="0"/><mxCell id="1" parent="0"/>{cells}</root></mxGraphModel>"#
    )
}

pub fn vertex(id: &str, value: &str, style: &str) -> String {
    format!(
        r#"<mxCell id="{id}" value="{value}" style="{style}" vertex="1" parent="1"><mxGeometry x="0" y="0" width="120" height="60" as="geometry"/></mxCell>"#
    )
}

pub fn edge(id: &str, source: &str, target: &str) -> String {
    format!(
        r#"<mxCell id="{id}" style="edgeStyle=orthogonalEdgeStyle;" edge="1" parent="1" source="{source}" target="{target}"><mxGeometry relative="1" as="geometry"/></mxCell>"#
    )
}

pub const OVAL: &str = "ellipse;whiteSpace=wrap;html=1;";
pub const RECT: &str = "rounded=0;whiteSpace=wrap;html=1;";
pub const DIAMOND: &str = "rhombus;whiteSpace=wrap;html=1;";
pub const PARALLELOGRAM: &str = "shape=parallelogram;perimeter=parallelogramPerimeter;whiteSpace=wrap;html=1;";
