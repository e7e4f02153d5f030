//! End-to-end orchestration: raw input in, typed graph and findings out.
//!
//! The input format is decided once, up front, as a [`PayloadFormat`]; each
//! format then has exactly one way to reach XML. From there every input runs
//! the same chain: parse, unwrap a container, extract, and if nothing usable
//! came out, scan for a buried payload.

use std::borrow::Cow;

use serde::Serialize;
use tracing::debug;

use crate::analyze::{AnalysisResult, analyze};
use crate::assess::{Finding, assess};
use crate::capture::{SnapshotSource, capture_blocking};
use crate::config::FlowchartConfig;
use crate::decode::decode_with;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::document::{parse_with, root_element_name};
use crate::extract::extract_with;
use crate::feedback::generate_feedback_messages;
use crate::graph::ExtractionResult;
use crate::model::{Document, WRAPPER_TAG};
use crate::svg::extract_from_svg_with;
use crate::unwrap::{recover_buried_payload_with, unwrap_wrapper_with};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// A bare XML model.
    PlainXml,
    /// A multi-page container whose pages carry their own encoded payload.
    WrapperPage,
    /// Anything that is not XML yet: deflate+base64, its percent-encoded
    /// wrapping, or entity-escaped XML.
    CompressedBinary,
    /// An SVG export carrying the diagram in a root attribute.
    SvgEmbedded,
}

impl PayloadFormat {
    pub fn detect(input: &str) -> Self {
        let trimmed = input.trim_start();
        if !trimmed.starts_with('<') {
            return PayloadFormat::CompressedBinary;
        }
        match root_element_name(trimmed).as_deref() {
            Some("svg") => PayloadFormat::SvgEmbedded,
            Some(WRAPPER_TAG) => PayloadFormat::WrapperPage,
            _ => PayloadFormat::PlainXml,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("could not decode flowchart data")]
    Decode,

    #[error("could not parse flowchart data")]
    Parse,

    #[error("diagram container has no decodable page")]
    Wrapper,

    #[error("no shapes or connectors found in flowchart data")]
    Incomplete,
}

/// Everything the pipeline knows about one diagram.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub extraction: ExtractionResult,
    pub analysis: Option<AnalysisResult>,
    pub findings: Vec<Finding>,
    pub feedback: Vec<String>,
}

pub struct Pipeline<S = TracingSink> {
    config: FlowchartConfig,
    sink: S,
}

impl Pipeline {
    pub fn new(config: FlowchartConfig) -> Self {
        Self::with_sink(config, TracingSink)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(FlowchartConfig::default())
    }
}

impl<S: DiagnosticSink> Pipeline<S> {
    pub fn with_sink(config: FlowchartConfig, sink: S) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &FlowchartConfig {
        &self.config
    }

    /// Read the current diagram text from `source`, retrying once after the
    /// configured delay when the first answer is blank.
    pub fn capture(&self, source: &mut dyn SnapshotSource) -> Option<String> {
        capture_blocking(source, self.config.capture.retry_delay())
    }

    /// The input as XML text, without parsing it.
    pub fn canonical_xml<'i>(&self, input: &'i str) -> Result<Cow<'i, str>, PipelineError> {
        let format = PayloadFormat::detect(input);
        debug!(?format, "detected payload format");
        match format {
            PayloadFormat::PlainXml | PayloadFormat::WrapperPage => Ok(Cow::Borrowed(input)),
            PayloadFormat::SvgEmbedded => extract_from_svg_with(input, &self.sink)
                .map(Cow::Owned)
                .ok_or(PipelineError::Decode),
            PayloadFormat::CompressedBinary => {
                let xml = decode_with(input, &self.sink);
                if xml.is_empty() {
                    Err(PipelineError::Decode)
                } else {
                    Ok(Cow::Owned(xml))
                }
            }
        }
    }

    /// Decode and parse `input`, unwrapping a container and falling back to
    /// the buried-payload scan when the model has no cells.
    pub fn document(&self, input: &str) -> Result<Document, PipelineError> {
        let top = self.parse_top(input)?;
        self.select(&top)
    }

    /// Nodes and edges of `input`. When every cell of the model is filtered
    /// out, the buried-payload scan gets one more chance before giving up.
    pub fn extract(&self, input: &str) -> Result<ExtractionResult, PipelineError> {
        let top = self.parse_top(input)?;
        let document = self.select(&top)?;
        let mut result = extract_with(&document, &self.sink).ok_or(PipelineError::Parse)?;
        if result.is_empty() {
            let recovered = self.recover(&top).ok_or(PipelineError::Incomplete)?;
            result = extract_with(&recovered, &self.sink).ok_or(PipelineError::Incomplete)?;
        }
        if result.is_empty() {
            return Err(PipelineError::Incomplete);
        }
        debug!(
            nodes = result.nodes.len(),
            edges = result.edges.len(),
            "extracted flowchart"
        );
        Ok(result)
    }

    pub fn analyze(&self, input: &str) -> Result<Report, PipelineError> {
        let extraction = self.extract(input)?;
        let analysis = analyze(&extraction);
        let findings = assess(&extraction, &self.config.analysis);
        let feedback = generate_feedback_messages(&findings);
        Ok(Report {
            extraction,
            analysis,
            findings,
            feedback,
        })
    }

    fn parse_top(&self, input: &str) -> Result<Document, PipelineError> {
        let xml = self.canonical_xml(input)?;
        parse_with(&xml, &self.sink).ok_or(PipelineError::Parse)
    }

    fn select(&self, top: &Document) -> Result<Document, PipelineError> {
        let unwrapped = if top.is_wrapper() {
            unwrap_wrapper_with(top, &self.sink).ok_or(PipelineError::Wrapper)
        } else {
            Ok(top.clone())
        };
        match unwrapped {
            Ok(document) if document.has_graph_cells() => Ok(document),
            Ok(_) => self.recover(top).ok_or(PipelineError::Incomplete),
            Err(err) => self.recover(top).ok_or(err),
        }
    }

    fn recover(&self, top: &Document) -> Option<Document> {
        recover_buried_payload_with(top, self.config.recovery.min_payload_len, &self.sink)
    }
}
