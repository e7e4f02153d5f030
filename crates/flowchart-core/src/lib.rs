//! Decode, extract, classify and validate draw.io flowcharts.
//!
//! The stages can be used one by one ([`decode`], [`parse`],
//! [`unwrap_wrapper`], [`extract`], [`analyze`]) or end to end through
//! [`Pipeline`], which also picks the input format and runs the rule-based
//! [`assess`]ment.

pub mod analyze;
pub mod assess;
pub mod capture;
pub mod classify;
pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod document;
pub mod extract;
pub mod feedback;
pub mod graph;
pub mod model;
pub mod pipeline;
pub mod serde_f64;
pub mod svg;
pub mod unwrap;

pub use analyze::{AnalysisResult, analyze};
pub use assess::{Finding, Severity, assess};
pub use classify::classify;
pub use config::{ConfigError, FlowchartConfig};
pub use decode::{decode, decode_with};
pub use diagnostics::{Diagnostic, DiagnosticSink, NullSink, TracingSink};
pub use document::{ParseError, ParseResult, parse, parse_with};
pub use extract::{extract, extract_with};
pub use feedback::generate_feedback_messages;
pub use graph::{Edge, ExtractionResult, Geometry, Node, NodeKind};
pub use model::Document;
pub use pipeline::{PayloadFormat, Pipeline, PipelineError, Report};
pub use svg::{extract_from_svg, extract_from_svg_with};
pub use unwrap::{recover_buried_payload, unwrap_wrapper};
