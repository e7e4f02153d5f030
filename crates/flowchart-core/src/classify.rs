//! Node classification.
//!
//! A node's role comes from three signals: the shape named in its style, the
//! keywords in its text, and whether it has incoming/outgoing edges. The result
//! depends on nothing else, so extraction order cannot change it.

use crate::decode::decode_entities;
use crate::graph::NodeKind;

/// Shape bucket read from a style string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Oval,
    Diamond,
    Parallelogram,
    Rectangle,
}

#[derive(Debug, Clone, Copy)]
enum Keyword {
    /// Matches a whole word of the normalized text.
    Word(&'static str),
    /// Matches anywhere in the normalized text.
    Symbol(&'static str),
}

use Keyword::{Symbol, Word};

/// Checked top to bottom; the first row with a matching keyword wins.
const CONTENT_RULES: &[(NodeKind, &[Keyword])] = &[
    (
        NodeKind::Start,
        &[
            Word("start"),
            Word("begin"),
            Word("initialize"),
            Word("init"),
            Word("launch"),
            Word("commence"),
            Word("open"),
        ],
    ),
    (
        NodeKind::End,
        &[
            Word("end"),
            Word("stop"),
            Word("finish"),
            Word("terminate"),
            Word("exit"),
            Word("close"),
            Word("complete"),
            Word("done"),
        ],
    ),
    (
        NodeKind::Input,
        &[
            Word("input"),
            Word("read"),
            Word("get"),
            Word("enter"),
            Word("scan"),
            Word("receive"),
            Word("accept"),
            Word("ask"),
        ],
    ),
    (
        NodeKind::Output,
        &[
            Word("output"),
            Word("print"),
            Word("display"),
            Word("show"),
            Word("write"),
            Word("return"),
            Word("echo"),
        ],
    ),
    (
        NodeKind::Decision,
        &[
            Word("if"),
            Word("while"),
            Word("for"),
            Word("check"),
            Word("whether"),
            Symbol("?"),
            Symbol("=="),
            Symbol("!="),
            Symbol("<="),
            Symbol(">="),
            Symbol("<"),
            Symbol(">"),
        ],
    ),
    (
        NodeKind::Process,
        &[
            Word("calculate"),
            Word("compute"),
            Word("set"),
            Word("assign"),
            Word("increment"),
            Word("decrement"),
            Word("update"),
            Word("add"),
            Word("subtract"),
            Word("multiply"),
            Word("divide"),
            Symbol("="),
            Symbol("+"),
            Symbol("-"),
            Symbol("*"),
            Symbol("/"),
            Symbol("%"),
        ],
    ),
];

/// Assign a role from style, text and topology.
pub fn classify(
    style: Option<&str>,
    value: Option<&str>,
    has_incoming: bool,
    has_outgoing: bool,
) -> NodeKind {
    let shape = detect_shape(style);
    let content = detect_content(value);
    resolve(shape, content, has_incoming, has_outgoing)
}

pub fn detect_shape(style: Option<&str>) -> Shape {
    let style = style.unwrap_or_default().to_ascii_lowercase();
    if style.contains("ellipse") || style.contains("oval") || style.contains("terminator") {
        Shape::Oval
    } else if style.contains("rhombus")
        || style.contains("diamond")
        || style.contains("mxgraph.flowchart.decision")
    {
        Shape::Diamond
    } else if style.contains("parallelogram") || style.contains("mxgraph.flowchart.data") {
        Shape::Parallelogram
    } else {
        Shape::Rectangle
    }
}

/// Role suggested by the text alone; `Process` when nothing matches.
pub fn detect_content(value: Option<&str>) -> NodeKind {
    let text = normalize_text(value.unwrap_or_default());
    if text.is_empty() {
        return NodeKind::Process;
    }
    let words: Vec<&str> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .collect();

    CONTENT_RULES
        .iter()
        .find(|(_, keywords)| {
            keywords.iter().any(|keyword| match keyword {
                Word(word) => words.contains(word),
                Symbol(symbol) => text.contains(symbol),
            })
        })
        .map(|(kind, _)| *kind)
        .unwrap_or(NodeKind::Process)
}

fn resolve(shape: Shape, content: NodeKind, has_incoming: bool, has_outgoing: bool) -> NodeKind {
    match shape {
        Shape::Oval => match (has_incoming, has_outgoing) {
            (false, true) => NodeKind::Start,
            (true, false) => NodeKind::End,
            _ if content.is_terminal() => content,
            (true, _) => NodeKind::End,
            (false, _) => NodeKind::Start,
        },
        Shape::Diamond => NodeKind::Decision,
        Shape::Parallelogram => {
            if content == NodeKind::Output {
                NodeKind::Output
            } else {
                NodeKind::Input
            }
        }
        Shape::Rectangle => match content {
            NodeKind::Start if !has_incoming => NodeKind::Start,
            NodeKind::End if !has_outgoing => NodeKind::End,
            NodeKind::Start | NodeKind::End => NodeKind::Process,
            other => other,
        },
    }
}

/// Lowercase text with HTML tags removed and common entities decoded.
pub(crate) fn normalize_text(raw: &str) -> String {
    strip_tags(&decode_entities(raw))
        .replace('\u{a0}', " ")
        .trim()
        .to_lowercase()
}

/// Drop `<tag ...>` and `</tag>` runs; a `<` not followed by a letter or `/` is kept.
pub(crate) fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let opens_tag = c == '<'
            && chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || *next == '/' || *next == '!');
        if !opens_tag {
            out.push(c);
            continue;
        }
        let mut closed = false;
        for inner in chars.by_ref() {
            if inner == '>' {
                closed = true;
                break;
            }
        }
        if closed {
            out.push(' ');
        }
    }
    out
}
