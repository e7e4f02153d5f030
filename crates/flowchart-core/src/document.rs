// Streaming quick-xml reader that flattens a diagram document into `Document`.
//
// - Collects every <mxCell> in document order, however deeply nested
// - Attaches the first <mxGeometry> child to its cell
// - Takes id/label from an enclosing <UserObject>/<object> when the cell lacks them
// - Records <diagram> pages with their raw text payload
// - Records the text of every leaf element for the buried-payload scan
//
// Whitespace-only text is formatting and is dropped; other text is kept exactly.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str;

use quick_xml::Reader;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::decode::{decode_entities, decode_with};
use crate::diagnostics::{Diagnostic, DiagnosticSink, ParseAttempt, TracingSink};
use crate::model::{Cell, Document, PAGE_TAG, Page, RawGeometry};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    #[error("unexpected structure: {0}")]
    Structure(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse `text`, falling back to its entity-decoded and content-decoded forms.
///
/// Returns `None` when all three attempts fail; the caller should stop there.
pub fn parse(text: &str) -> Option<Document> {
    parse_with(text, &TracingSink)
}

pub fn parse_with(text: &str, sink: &dyn DiagnosticSink) -> Option<Document> {
    for attempt in [
        ParseAttempt::Raw,
        ParseAttempt::EntityDecoded,
        ParseAttempt::ContentDecoded,
    ] {
        let candidate: Cow<'_, str> = match attempt {
            ParseAttempt::Raw => Cow::Borrowed(text),
            ParseAttempt::EntityDecoded => Cow::Owned(decode_entities(text)),
            ParseAttempt::ContentDecoded => Cow::Owned(decode_with(text, sink)),
        };
        match parse_document(&candidate) {
            Ok(document) => return Some(document),
            Err(err) => sink.emit(Diagnostic::ParseAttemptFailed {
                attempt,
                error: err.to_string(),
            }),
        }
    }
    sink.emit(Diagnostic::ParseFailed);
    None
}

/// Local name of the first element in `text`, without building a document.
pub fn root_element_name(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => return local_name_start(&e).ok(),
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }
}

struct Frame {
    name: String,
    has_children: bool,
    text: String,
    cell_idx: Option<usize>,
    page_idx: Option<usize>,
    is_user_object: bool,
}

#[derive(Debug, Clone)]
struct UserObjectContext {
    id: Option<String>,
    label: Option<String>,
}

/// Strict single-attempt parse of `xml` into a [`Document`].
pub fn parse_document(xml: &str) -> ParseResult<Document> {
    let mut reader = Reader::from_str(xml);
    // Global trim_text stays off: whitespace-only text is dropped by hand below.

    let mut buf = Vec::new();
    let mut document = Document::default();
    let mut root: Option<String> = None;
    let mut root_closed = false;
    let mut stack: Vec<Frame> = Vec::new();
    let mut user_objects: Vec<UserObjectContext> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = open_element(&mut root, root_closed, &mut stack, &e)?;
                let mut frame = Frame {
                    name: name.clone(),
                    has_children: false,
                    text: String::new(),
                    cell_idx: None,
                    page_idx: None,
                    is_user_object: false,
                };
                if is_user_object(&name) {
                    user_objects.push(parse_user_object_ctx(&e)?);
                    frame.is_user_object = true;
                } else {
                    match name.as_str() {
                        "mxCell" => {
                            let cell = parse_cell(&e, user_objects.last())?;
                            document.cells.push(cell);
                            frame.cell_idx = Some(document.cells.len() - 1);
                        }
                        "mxGeometry" => attach_geometry(&mut document, &stack, &e)?,
                        PAGE_TAG => {
                            document.pages.push(parse_page(&e)?);
                            frame.page_idx = Some(document.pages.len() - 1);
                        }
                        _ => {}
                    }
                }
                stack.push(frame);
            }

            Event::Empty(e) => {
                let name = open_element(&mut root, root_closed, &mut stack, &e)?;
                if stack.is_empty() {
                    root_closed = true;
                }
                match name.as_str() {
                    "mxCell" => {
                        let cell = parse_cell(&e, user_objects.last())?;
                        document.cells.push(cell);
                    }
                    "mxGeometry" => attach_geometry(&mut document, &stack, &e)?,
                    PAGE_TAG => document.pages.push(parse_page(&e)?),
                    _ => {}
                }
            }

            Event::Text(t) => {
                let txt = t.decode()?;
                push_text(&mut stack, &txt)?;
            }

            Event::CData(c) => {
                let txt = c.decode()?;
                push_text(&mut stack, &txt)?;
            }

            Event::GeneralRef(r) => {
                let name = r.decode()?;
                let resolved = resolve_reference(&name);
                push_text(&mut stack, &resolved)?;
            }

            Event::End(e) => {
                let name = local_name_end(&e)?;
                let frame = stack.pop().ok_or_else(|| {
                    ParseError::Structure(format!("closing </{name}> but nothing open"))
                })?;
                if frame.name != name {
                    return Err(ParseError::Structure(format!(
                        "mismatched </{name}>, expected </{}>",
                        frame.name
                    )));
                }
                if frame.is_user_object {
                    user_objects.pop();
                }
                let has_text = !frame.text.trim().is_empty();
                if let Some(idx) = frame.page_idx
                    && has_text
                {
                    document.pages[idx].payload = Some(frame.text.clone());
                }
                if !frame.has_children && has_text {
                    document.text_spans.push(frame.text);
                }
                if stack.is_empty() {
                    root_closed = true;
                }
            }

            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Structure(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    document.root =
        root.ok_or_else(|| ParseError::Structure("no root element found".into()))?;
    Ok(document)
}

fn open_element(
    root: &mut Option<String>,
    root_closed: bool,
    stack: &mut [Frame],
    e: &BytesStart<'_>,
) -> ParseResult<String> {
    let name = local_name_start(e)?;
    if root_closed {
        return Err(ParseError::Structure(format!(
            "element <{name}> after the root element"
        )));
    }
    if root.is_none() {
        *root = Some(name.clone());
    }
    if let Some(parent) = stack.last_mut() {
        parent.has_children = true;
    }
    Ok(name)
}

fn push_text(stack: &mut [Frame], txt: &str) -> ParseResult<()> {
    match stack.last_mut() {
        Some(frame) => {
            frame.text.push_str(txt);
            Ok(())
        }
        None if txt.trim().is_empty() => Ok(()),
        None => Err(ParseError::Structure("text outside the root element".into())),
    }
}

fn resolve_reference(name: &str) -> Cow<'static, str> {
    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        if let Some(ch) = parsed.and_then(char::from_u32) {
            return Cow::Owned(ch.to_string());
        }
    }
    match name {
        "lt" => Cow::Borrowed("<"),
        "gt" => Cow::Borrowed(">"),
        "amp" => Cow::Borrowed("&"),
        "quot" => Cow::Borrowed("\""),
        "apos" => Cow::Borrowed("'"),
        other => Cow::Owned(format!("&{other};")),
    }
}

fn attach_geometry(
    document: &mut Document,
    stack: &[Frame],
    e: &BytesStart<'_>,
) -> ParseResult<()> {
    // Only a direct child of a cell counts.
    let Some(idx) = stack.last().and_then(|frame| frame.cell_idx) else {
        return Ok(());
    };
    let cell = &mut document.cells[idx];
    if cell.geometry.is_none() {
        cell.geometry = Some(parse_geometry(e)?);
    }
    Ok(())
}

fn parse_user_object_ctx(e: &BytesStart<'_>) -> ParseResult<UserObjectContext> {
    let attrs = attrs_to_map(e)?;
    Ok(UserObjectContext {
        id: attrs.get("id").cloned(),
        label: attrs.get("label").cloned(),
    })
}

fn parse_cell(e: &BytesStart<'_>, user_object: Option<&UserObjectContext>) -> ParseResult<Cell> {
    let attrs = attrs_to_map(e)?;
    Ok(Cell {
        id: attrs
            .get("id")
            .cloned()
            .or_else(|| user_object.and_then(|ctx| ctx.id.clone())),
        parent: attrs.get("parent").cloned(),
        source: attrs.get("source").cloned(),
        target: attrs.get("target").cloned(),
        value: attrs
            .get("value")
            .cloned()
            .or_else(|| user_object.and_then(|ctx| ctx.label.clone())),
        style: attrs.get("style").cloned(),
        vertex: parse_bool_opt(attrs.get("vertex")),
        edge: parse_bool_opt(attrs.get("edge")),
        geometry: None,
    })
}

fn parse_geometry(e: &BytesStart<'_>) -> ParseResult<RawGeometry> {
    let attrs = attrs_to_map(e)?;
    Ok(RawGeometry {
        x: parse_f64_lenient(attrs.get("x")),
        y: parse_f64_lenient(attrs.get("y")),
        width: parse_f64_lenient(attrs.get("width")),
        height: parse_f64_lenient(attrs.get("height")),
    })
}

fn parse_page(e: &BytesStart<'_>) -> ParseResult<Page> {
    let attrs = attrs_to_map(e)?;
    Ok(Page {
        id: attrs.get("id").cloned(),
        name: attrs.get("name").cloned(),
        payload: None,
    })
}

pub(crate) fn attrs_to_map(e: &BytesStart<'_>) -> ParseResult<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for a in e.attributes() {
        let a = a?;
        let key = str::from_utf8(a.key.as_ref())?.to_string();
        let val = a.unescape_value()?.to_string();
        out.insert(key, val);
    }
    Ok(out)
}

pub(crate) fn local_name_start(e: &BytesStart<'_>) -> ParseResult<String> {
    Ok(str::from_utf8(e.local_name().as_ref())?.to_string())
}

fn local_name_end(e: &BytesEnd<'_>) -> ParseResult<String> {
    Ok(str::from_utf8(e.local_name().as_ref())?.to_string())
}

fn is_user_object(name: &str) -> bool {
    name.eq_ignore_ascii_case("userObject") || name == "object"
}

fn parse_bool_opt(v: Option<&String>) -> Option<bool> {
    let s = v?;
    match s.as_str() {
        "1" | "true" | "TRUE" | "True" => Some(true),
        "0" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn parse_f64_lenient(v: Option<&String>) -> Option<f64> {
    v.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|parsed| parsed.is_finite())
}
