use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::feedback::clean_label;
use crate::serde_f64;

/// Semantic role of a flowchart shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    End,
    Decision,
    Process,
    Input,
    Output,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Decision => "decision",
            NodeKind::Process => "process",
            NodeKind::Input => "input",
            NodeKind::Output => "output",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, NodeKind::Start | NodeKind::End)
    }

    pub fn is_io(self) -> bool {
        matches!(self, NodeKind::Input | NodeKind::Output)
    }

    /// `"Process"`, `"Decision"`, ...
    pub fn title(self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::End => "End",
            NodeKind::Decision => "Decision",
            NodeKind::Process => "Process",
            NodeKind::Input => "Input",
            NodeKind::Output => "Output",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(
        serialize_with = "serde_f64::ser_f64_compact",
        deserialize_with = "serde_f64::de_f64"
    )]
    pub x: f64,
    #[serde(
        serialize_with = "serde_f64::ser_f64_compact",
        deserialize_with = "serde_f64::de_f64"
    )]
    pub y: f64,
    #[serde(
        serialize_with = "serde_f64::ser_f64_compact",
        deserialize_with = "serde_f64::de_f64"
    )]
    pub width: f64,
    #[serde(
        serialize_with = "serde_f64::ser_f64_compact",
        deserialize_with = "serde_f64::de_f64"
    )]
    pub height: f64,
}

/// A shape. Field names match the analysis service's request schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,

    pub vertex: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

impl Node {
    /// Value as plain text when it has any, id otherwise. Used in issue text.
    pub fn label(&self) -> String {
        let text = self.value.as_deref().map(clean_label).unwrap_or_default();
        if text.is_empty() {
            self.id.clone()
        } else {
            text
        }
    }
}

/// A connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    pub edge: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl Edge {
    /// `(source, target)` when both ends are set.
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        Some((self.source_id.as_deref()?, self.target_id.as_deref()?))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Directed adjacency built from edges that have both endpoints.
///
/// Dangling endpoints are kept: they count toward degrees of ids that may not
/// name any node, which is harmless for lookups by node id.
#[derive(Debug, Clone, Default)]
pub struct Topology<'a> {
    successors: BTreeMap<&'a str, Vec<&'a str>>,
    incoming: BTreeMap<&'a str, usize>,
    outgoing: BTreeMap<&'a str, usize>,
    order: Vec<&'a str>,
}

impl<'a> Topology<'a> {
    pub fn from_edges(edges: &'a [Edge]) -> Self {
        let mut topology = Topology::default();
        for (source, target) in edges.iter().filter_map(Edge::endpoints) {
            topology.add(source, target);
        }
        topology
    }

    /// Like [`Topology::from_edges`] but drops edges whose ends are not both nodes.
    pub fn between_nodes(result: &'a ExtractionResult) -> Self {
        let ids: BTreeSet<&str> = result.nodes.iter().map(|node| node.id.as_str()).collect();
        let mut topology = Topology::default();
        for (source, target) in result.edges.iter().filter_map(Edge::endpoints) {
            if ids.contains(source) && ids.contains(target) {
                topology.add(source, target);
            }
        }
        topology
    }

    fn add(&mut self, source: &'a str, target: &'a str) {
        for id in [source, target] {
            if !self.successors.contains_key(id) {
                self.successors.insert(id, Vec::new());
                self.order.push(id);
            }
        }
        if let Some(next) = self.successors.get_mut(source) {
            next.push(target);
        }
        *self.outgoing.entry(source).or_insert(0) += 1;
        *self.incoming.entry(target).or_insert(0) += 1;
    }

    pub fn incoming(&self, id: &str) -> usize {
        self.incoming.get(id).copied().unwrap_or(0)
    }

    pub fn outgoing(&self, id: &str) -> usize {
        self.outgoing.get(id).copied().unwrap_or(0)
    }

    pub fn successors(&self, id: &str) -> &[&'a str] {
        self.successors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every id touched by an edge, in first-seen order.
    pub fn vertices(&self) -> &[&'a str] {
        &self.order
    }

    /// Predecessor lists, built on demand.
    pub fn predecessors(&self) -> BTreeMap<&'a str, Vec<&'a str>> {
        let mut out: BTreeMap<&'a str, Vec<&'a str>> = BTreeMap::new();
        for (&source, targets) in &self.successors {
            for &target in targets {
                out.entry(target).or_default().push(source);
            }
        }
        out
    }
}
