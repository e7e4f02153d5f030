use serde::{Deserialize, Serialize};

use crate::serde_f64;

/// A parsed diagram document: the flat cell list plus whatever the extractor
/// and unwrapper need to look at beyond it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Local name of the root element (`mxGraphModel`, `mxfile`, `svg`, ...).
    pub root: String,

    /// `<diagram>` page elements, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<Page>,

    /// Every `<mxCell>` in document order, regardless of nesting depth.
    #[serde(default)]
    pub cells: Vec<Cell>,

    /// Non-whitespace text of leaf elements, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_spans: Vec<String>,
}

impl Document {
    pub fn is_wrapper(&self) -> bool {
        self.root == WRAPPER_TAG
    }

    /// True when at least one cell is flagged as a vertex or an edge.
    pub fn has_graph_cells(&self) -> bool {
        self.cells.iter().any(|cell| cell.is_vertex() || cell.is_edge())
    }
}

/// Root tag of the multi-page container format.
pub const WRAPPER_TAG: &str = "mxfile";

/// Page element inside [`WRAPPER_TAG`].
pub const PAGE_TAG: &str = "diagram";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Raw text inside `<diagram>...</diagram>`; absent when the page holds an
    /// inline `<mxGraphModel>` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<RawGeometry>,
}

impl Cell {
    pub fn is_vertex(&self) -> bool {
        self.vertex == Some(true)
    }

    pub fn is_edge(&self) -> bool {
        self.edge == Some(true)
    }
}

/// `<mxGeometry>` as written; missing or unparseable fields stay `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawGeometry {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serde_f64::ser_opt_f64_compact",
        deserialize_with = "serde_f64::de_opt_f64"
    )]
    pub x: Option<f64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serde_f64::ser_opt_f64_compact",
        deserialize_with = "serde_f64::de_opt_f64"
    )]
    pub y: Option<f64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serde_f64::ser_opt_f64_compact",
        deserialize_with = "serde_f64::de_opt_f64"
    )]
    pub width: Option<f64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serde_f64::ser_opt_f64_compact",
        deserialize_with = "serde_f64::de_opt_f64"
    )]
    pub height: Option<f64>,
}
