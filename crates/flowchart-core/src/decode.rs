//! Content decoder.
//!
//! The editor has emitted four encodings of the same document over time:
//! plain XML, HTML-entity-escaped XML, base64 of raw-deflated percent-encoded
//! XML, and a percent-encoded wrapping of that last form. [`decode`] tries them
//! in that order and returns the first result that looks like XML.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::DeflateDecoder;
use percent_encoding::percent_decode_str;
use std::io::Read;

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("deflate decode error: {0}")]
    Deflate(#[from] std::io::Error),

    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("decoded payload is not xml")]
    NotXml,
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Decode strategies in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    PassThrough,
    Compressed,
    WrappedCompressed,
    Entities,
}

impl DecodeStrategy {
    pub const ORDER: [DecodeStrategy; 4] = [
        DecodeStrategy::PassThrough,
        DecodeStrategy::Compressed,
        DecodeStrategy::WrappedCompressed,
        DecodeStrategy::Entities,
    ];

    pub fn apply(self, input: &str) -> DecodeResult<String> {
        match self {
            DecodeStrategy::PassThrough => {
                if looks_like_xml(input) {
                    Ok(input.to_string())
                } else {
                    Err(DecodeError::NotXml)
                }
            }
            DecodeStrategy::Compressed => decode_compressed(input),
            DecodeStrategy::WrappedCompressed => {
                let unwrapped = percent_decode_str(input).decode_utf8()?;
                decode_compressed(&unwrapped)
            }
            DecodeStrategy::Entities => {
                let decoded = decode_entities(input);
                if looks_like_xml(&decoded) {
                    Ok(decoded)
                } else {
                    Err(DecodeError::NotXml)
                }
            }
        }
    }
}

/// Normalize `input` to XML text. Returns an empty string when no strategy works.
pub fn decode(input: &str) -> String {
    decode_with(input, &TracingSink)
}

pub fn decode_with(input: &str, sink: &dyn DiagnosticSink) -> String {
    for strategy in DecodeStrategy::ORDER {
        if let Ok(decoded) = strategy.apply(input) {
            sink.emit(Diagnostic::Decoded { strategy });
            return decoded;
        }
    }
    sink.emit(Diagnostic::DecodeFailed {
        input_len: input.len(),
    });
    String::new()
}

pub fn looks_like_xml(text: &str) -> bool {
    text.trim_start().starts_with('<')
}

/// base64 -> raw inflate -> percent-decode, accepted only if the result is XML.
pub fn decode_compressed(payload: &str) -> DecodeResult<String> {
    let inflated = inflate_base64(payload)?;
    let decoded = percent_decode_str(&inflated).decode_utf8()?;
    if looks_like_xml(&decoded) {
        Ok(decoded.into_owned())
    } else {
        Err(DecodeError::NotXml)
    }
}

/// base64 -> raw inflate, no percent layer.
pub fn inflate_base64(payload: &str) -> DecodeResult<String> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = STANDARD.decode(compact)?;
    let mut decoder = DeflateDecoder::new(&decoded[..]);
    let mut inflated = Vec::new();
    decoder.read_to_end(&mut inflated)?;
    Ok(std::str::from_utf8(&inflated)?.to_string())
}

/// Replace the common HTML entities. `&amp;` goes last so `&amp;lt;` becomes `&lt;`, not `<`.
pub fn decode_entities(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
