//! Structured pipeline events.
//!
//! Stages never print. Anything worth reporting is emitted as a [`Diagnostic`]
//! into a caller-supplied [`DiagnosticSink`]; the default sink forwards to
//! `tracing`.

use std::fmt;

use crate::decode::DecodeStrategy;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A decode strategy produced text starting with `<`.
    Decoded { strategy: DecodeStrategy },

    /// No decode strategy produced usable XML.
    DecodeFailed { input_len: usize },

    /// One parse attempt failed; later attempts may still succeed.
    ParseAttemptFailed {
        attempt: ParseAttempt,
        error: String,
    },

    /// Every parse attempt failed.
    ParseFailed,

    /// A multi-page container held no page element.
    WrapperPageMissing,

    /// The first page payload decoded to nothing.
    WrapperPayloadEmpty { page_id: Option<String> },

    /// A text span buried somewhere in the document decoded to a usable model.
    BuriedPayloadRecovered { span_len: usize },

    /// Math markup inside a cell value could not be parsed; the raw value is kept.
    MathMarkupIgnored { cell_id: String, error: String },

    /// A cell was dropped by the extractor.
    CellSkipped { cell_id: String, reason: SkipReason },

    /// The SVG root carried no diagram payload attribute.
    SvgPayloadMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAttempt {
    Raw,
    EntityDecoded,
    ContentDecoded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Structural,
    FloatingLabel,
    Empty,
    DuplicateId,
}

impl fmt::Display for ParseAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseAttempt::Raw => "raw",
            ParseAttempt::EntityDecoded => "entity-decoded",
            ParseAttempt::ContentDecoded => "content-decoded",
        })
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Structural => "structural container",
            SkipReason::FloatingLabel => "floating text label",
            SkipReason::Empty => "empty decorative shape",
            SkipReason::DuplicateId => "duplicate id",
        })
    }
}

pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(Diagnostic),
{
    fn emit(&self, diagnostic: Diagnostic) {
        self(diagnostic)
    }
}

/// Forwards diagnostics to `tracing`. Failures are warnings, everything else debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::Decoded { strategy } => {
                tracing::debug!(?strategy, "decoded diagram payload");
            }
            Diagnostic::DecodeFailed { input_len } => {
                tracing::warn!(input_len, "could not decode flowchart data");
            }
            Diagnostic::ParseAttemptFailed { attempt, error } => {
                tracing::debug!(%attempt, %error, "parse attempt failed");
            }
            Diagnostic::ParseFailed => {
                tracing::warn!("could not parse flowchart data");
            }
            Diagnostic::WrapperPageMissing => {
                tracing::warn!("diagram container has no page");
            }
            Diagnostic::WrapperPayloadEmpty { page_id } => {
                tracing::warn!(?page_id, "diagram page payload decoded to nothing");
            }
            Diagnostic::BuriedPayloadRecovered { span_len } => {
                tracing::debug!(span_len, "recovered diagram from buried payload");
            }
            Diagnostic::MathMarkupIgnored { cell_id, error } => {
                tracing::debug!(%cell_id, %error, "ignoring malformed math markup");
            }
            Diagnostic::CellSkipped { cell_id, reason } => {
                tracing::trace!(%cell_id, %reason, "skipping cell");
            }
            Diagnostic::SvgPayloadMissing => {
                tracing::debug!("svg root carries no diagram payload");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}
