//! Structural and logic validation of an extracted flowchart.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::graph::{Edge, ExtractionResult, Node, NodeKind, Topology};

pub const ISSUE_NO_START: &str = "The flowchart has no start node.";
pub const ISSUE_NO_END: &str = "The flowchart has no end node.";
pub const ISSUE_INFINITE_LOOP: &str = "The flowchart contains a cycle: potential infinite loop.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub total_elements: usize,
    pub start_nodes: Vec<Node>,
    pub end_nodes: Vec<Node>,
    pub decision_nodes: Vec<Node>,
    pub process_nodes: Vec<Node>,
    pub io_nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub issues: Vec<String>,
}

/// Run every check over `result` and collect all issues in one pass.
///
/// Returns `None` when there are no nodes. Unclassified nodes count as process.
pub fn analyze(result: &ExtractionResult) -> Option<AnalysisResult> {
    if result.nodes.is_empty() {
        return None;
    }

    let mut analysis = AnalysisResult {
        total_elements: result.nodes.len() + result.edges.len(),
        start_nodes: Vec::new(),
        end_nodes: Vec::new(),
        decision_nodes: Vec::new(),
        process_nodes: Vec::new(),
        io_nodes: Vec::new(),
        edges: result.edges.clone(),
        issues: Vec::new(),
    };
    for node in &result.nodes {
        let bucket = match node_kind(node) {
            NodeKind::Start => &mut analysis.start_nodes,
            NodeKind::End => &mut analysis.end_nodes,
            NodeKind::Decision => &mut analysis.decision_nodes,
            NodeKind::Process => &mut analysis.process_nodes,
            NodeKind::Input | NodeKind::Output => &mut analysis.io_nodes,
        };
        bucket.push(node.clone());
    }

    let topology = Topology::from_edges(&result.edges);
    let mut issues = Vec::new();
    check_terminals(&analysis, &mut issues);
    check_connectivity(result, &mut issues);
    if has_cycle(&topology) {
        issues.push(ISSUE_INFINITE_LOOP.to_string());
    }
    check_decision_branches(&analysis.decision_nodes, &topology, &mut issues);
    check_dead_ends(result, &topology, &mut issues);
    analysis.issues = issues;

    Some(analysis)
}

fn node_kind(node: &Node) -> NodeKind {
    node.kind.unwrap_or(NodeKind::Process)
}

fn check_terminals(analysis: &AnalysisResult, issues: &mut Vec<String>) {
    match analysis.start_nodes.len() {
        0 => issues.push(ISSUE_NO_START.to_string()),
        1 => {}
        n => issues.push(format!(
            "The flowchart has {n} start nodes; exactly one is required."
        )),
    }
    if analysis.end_nodes.is_empty() {
        issues.push(ISSUE_NO_END.to_string());
    }
}

fn check_connectivity(result: &ExtractionResult, issues: &mut Vec<String>) {
    if result.nodes.len() <= 1 {
        return;
    }
    let connected: BTreeSet<&str> = result
        .edges
        .iter()
        .flat_map(|edge| [edge.source_id.as_deref(), edge.target_id.as_deref()])
        .flatten()
        .collect();
    for node in &result.nodes {
        if !connected.contains(node.id.as_str()) {
            issues.push(format!(
                "Node '{}' is disconnected from the flowchart.",
                node.label()
            ));
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Depth-first search for a back edge. Stops at the first cycle found.
fn has_cycle(topology: &Topology<'_>) -> bool {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    for &root in topology.vertices() {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root, Mark::OnStack);
        // (vertex, index of the next successor to visit)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        while let Some((vertex, next)) = stack.last_mut() {
            let successors = topology.successors(vertex);
            let Some(&successor) = successors.get(*next) else {
                marks.insert(*vertex, Mark::Done);
                stack.pop();
                continue;
            };
            *next += 1;
            match marks.get(successor) {
                Some(Mark::OnStack) => return true,
                Some(Mark::Done) => {}
                None => {
                    marks.insert(successor, Mark::OnStack);
                    stack.push((successor, 0));
                }
            }
        }
    }
    false
}

fn check_decision_branches(decisions: &[Node], topology: &Topology<'_>, issues: &mut Vec<String>) {
    for node in decisions {
        let outgoing = topology.outgoing(&node.id);
        if outgoing < 2 {
            issues.push(format!(
                "Decision node '{}' should have at least two outgoing branches, but has {outgoing}.",
                node.label()
            ));
        }
    }
}

fn check_dead_ends(result: &ExtractionResult, topology: &Topology<'_>, issues: &mut Vec<String>) {
    for node in &result.nodes {
        let kind = node_kind(node);
        if kind.is_terminal() || topology.outgoing(&node.id) > 0 {
            continue;
        }
        issues.push(format!(
            "{} node '{}' is a dead end: it has no outgoing connections.",
            kind.title(),
            node.label()
        ));
    }
}
