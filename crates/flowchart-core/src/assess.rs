//! Rule-based assessment producing structured findings.
//!
//! Where [`crate::analyze`] yields plain issue strings, these rules attach a
//! stable rule id, a severity and the ids of the elements involved, which is
//! what the feedback generator and machine consumers work from.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::config::AnalysisConfig;
use crate::graph::{ExtractionResult, Node, NodeKind, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub elements: Vec<String>,
}

impl Finding {
    fn new(rule_id: &str, severity: Severity, message: String, elements: Vec<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            message,
            severity,
            elements,
        }
    }
}

/// What every rule sees: the graph plus its node-to-node adjacency.
pub struct RuleContext<'a> {
    pub result: &'a ExtractionResult,
    /// Only edges whose two ends are existing nodes.
    pub topology: Topology<'a>,
}

impl<'a> RuleContext<'a> {
    pub fn new(result: &'a ExtractionResult) -> Self {
        Self {
            result,
            topology: Topology::between_nodes(result),
        }
    }

    fn kind_of(&self, id: &str) -> Option<NodeKind> {
        self.result.node(id).and_then(|node| node.kind)
    }

    fn ids_of(&self, kind: NodeKind) -> Vec<&'a str> {
        self.result
            .nodes
            .iter()
            .filter(|node| node.kind == Some(kind))
            .map(|node| node.id.as_str())
            .collect()
    }
}

pub trait AnalysisRule {
    fn id(&self) -> &'static str;
    fn apply(&self, ctx: &RuleContext<'_>) -> Vec<Finding>;
}

pub const EMPTY_DATA_RECEIVED: &str = "EMPTY_DATA_RECEIVED";

/// The default rule set, in reporting order.
pub fn default_rules(config: &AnalysisConfig) -> Vec<Box<dyn AnalysisRule>> {
    vec![
        Box::new(SingleStartMultipleEnd),
        Box::new(UnconnectedSymbols),
        Box::new(InfiniteLoop {
            max_paths: config.max_explored_paths,
        }),
        Box::new(UnreachableCode),
        Box::new(DecisionBranchBalance),
        Box::new(OrphanedIo),
        Box::new(DecisionNestingDepth {
            max_depth: config.max_nesting_depth,
            max_paths: config.max_explored_paths,
        }),
    ]
}

pub fn assess(result: &ExtractionResult, config: &AnalysisConfig) -> Vec<Finding> {
    if result.nodes.is_empty() {
        return vec![Finding::new(
            EMPTY_DATA_RECEIVED,
            Severity::Warning,
            "The flowchart is empty or could not be captured. Make sure it is not blank and try again."
                .into(),
            Vec::new(),
        )];
    }
    let ctx = RuleContext::new(result);
    default_rules(config)
        .iter()
        .flat_map(|rule| {
            let findings = rule.apply(&ctx);
            tracing::trace!(rule = rule.id(), count = findings.len(), "applied rule");
            findings
        })
        .collect()
}

fn describe(node: Option<&Node>, id: &str, fallback: &str) -> String {
    match node.and_then(|n| n.value.as_deref()).filter(|v| !v.trim().is_empty()) {
        Some(value) => format!("'{value}' (ID: {id})"),
        None => format!("{fallback} (ID: {id})"),
    }
}

pub struct SingleStartMultipleEnd;

impl AnalysisRule for SingleStartMultipleEnd {
    fn id(&self) -> &'static str {
        "single_start_multiple_end"
    }

    fn apply(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        let starts = ctx.ids_of(NodeKind::Start);
        match starts.len() {
            0 => findings.push(Finding::new(
                "NO_START_SYMBOL",
                Severity::Error,
                "The flowchart must have exactly one start symbol, but none was found.".into(),
                Vec::new(),
            )),
            1 => {}
            n => findings.push(Finding::new(
                "MULTIPLE_START_SYMBOLS",
                Severity::Error,
                format!("The flowchart must have exactly one start symbol, but {n} were found."),
                starts.iter().map(|id| id.to_string()).collect(),
            )),
        }
        if ctx.ids_of(NodeKind::End).is_empty() {
            findings.push(Finding::new(
                "NO_END_SYMBOL",
                Severity::Error,
                "The flowchart must have at least one end symbol, but none was found.".into(),
                Vec::new(),
            ));
        }
        findings
    }
}

pub struct UnconnectedSymbols;

impl AnalysisRule for UnconnectedSymbols {
    fn id(&self) -> &'static str {
        "unconnected_symbols"
    }

    fn apply(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let several = ctx.result.nodes.len() > 1;
        let mut findings = Vec::new();
        for node in &ctx.result.nodes {
            let has_in = ctx.topology.incoming(&node.id) > 0;
            let has_out = ctx.topology.outgoing(&node.id) > 0;
            let label = node.label();
            let finding = match node.kind {
                Some(NodeKind::Start) if several && !has_out => Some((
                    "START_SYMBOL_NO_OUTGOING",
                    format!("Start symbol '{label}' ({}) has no outgoing connections.", node.id),
                )),
                Some(NodeKind::End) if several && !has_in => Some((
                    "END_SYMBOL_NO_INCOMING",
                    format!("End symbol '{label}' ({}) has no incoming connections.", node.id),
                )),
                Some(NodeKind::Start) | Some(NodeKind::End) => None,
                _ => match (has_in, has_out) {
                    (false, false) => Some((
                        "UNCONNECTED_SYMBOL_BOTH",
                        format!("Symbol '{label}' ({}) is fully unconnected.", node.id),
                    )),
                    (false, true) => Some((
                        "UNCONNECTED_SYMBOL_NO_INCOMING",
                        format!("Symbol '{label}' ({}) has no incoming connections.", node.id),
                    )),
                    (true, false) => Some((
                        "UNCONNECTED_SYMBOL_NO_OUTGOING",
                        format!("Symbol '{label}' ({}) has no outgoing connections.", node.id),
                    )),
                    (true, true) => None,
                },
            };
            if let Some((rule_id, message)) = finding {
                findings.push(Finding::new(
                    rule_id,
                    Severity::Warning,
                    message,
                    vec![node.id.clone()],
                ));
            }
        }
        findings
    }
}

/// Cycles with no decision that can leave them.
///
/// Every simple cycle is checked on its own: a cycle has an exit when one of
/// its own decisions has a successor outside that cycle. Enumeration stops
/// after `max_paths` path extensions.
pub struct InfiniteLoop {
    pub max_paths: usize,
}

impl AnalysisRule for InfiniteLoop {
    fn id(&self) -> &'static str {
        "infinite_loop"
    }

    fn apply(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut budget = self.max_paths;
        let mut findings = Vec::new();
        for component in strongly_connected_components(&ctx.topology) {
            for cycle in simple_cycles(&ctx.topology, &component, &mut budget) {
                let members: BTreeSet<&str> = cycle.iter().copied().collect();
                let has_exit = cycle.iter().any(|&id| {
                    ctx.kind_of(id) == Some(NodeKind::Decision)
                        && ctx
                            .topology
                            .successors(id)
                            .iter()
                            .any(|next| !members.contains(next))
                });
                if has_exit {
                    continue;
                }
                findings.push(Finding::new(
                    "MISSING_LOOP_EXIT",
                    Severity::Error,
                    format!(
                        "A potential infinite loop was detected: this loop has no decision that leads out of it. Path: {}",
                        cycle.join(" -> ")
                    ),
                    cycle.iter().map(|id| id.to_string()).collect(),
                ));
            }
        }
        if budget == 0 {
            tracing::debug!(
                max_paths = self.max_paths,
                "cycle enumeration stopped at path budget"
            );
        }
        findings
    }
}

pub struct UnreachableCode;

impl AnalysisRule for UnreachableCode {
    fn id(&self) -> &'static str {
        "unreachable_code"
    }

    fn apply(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let starts = ctx.ids_of(NodeKind::Start);
        if starts.is_empty() {
            return Vec::new();
        }
        let successors = |id: &str| ctx.topology.successors(id).to_vec();
        let mut reachable = reach(&starts, successors);
        reachable.extend(starts.iter().copied());

        ctx.result
            .nodes
            .iter()
            .filter(|node| !reachable.contains(node.id.as_str()))
            .map(|node| {
                Finding::new(
                    "UNREACHABLE_CODE",
                    Severity::Warning,
                    format!(
                        "The {} is unreachable from any start node.",
                        describe(Some(node), &node.id, "element")
                    ),
                    vec![node.id.clone()],
                )
            })
            .collect()
    }
}

pub struct DecisionBranchBalance;

impl AnalysisRule for DecisionBranchBalance {
    fn id(&self) -> &'static str {
        "decision_branch_balance"
    }

    fn apply(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for id in ctx.ids_of(NodeKind::Decision) {
            let repr = describe(ctx.result.node(id), id, "decision node");
            match ctx.topology.outgoing(id) {
                0 => findings.push(Finding::new(
                    "DECISION_NO_BRANCHES",
                    Severity::Error,
                    format!("The {repr} is a dead end. Decision nodes must have exit paths."),
                    vec![id.to_string()],
                )),
                1 => findings.push(Finding::new(
                    "DECISION_SINGLE_BRANCH",
                    Severity::Warning,
                    format!(
                        "The {repr} has only one exit path. A decision should offer at least two branches."
                    ),
                    vec![id.to_string()],
                )),
                _ => {}
            }
        }
        findings
    }
}

/// Input never feeding logic, or output never fed by logic.
pub struct OrphanedIo;

impl AnalysisRule for OrphanedIo {
    fn id(&self) -> &'static str {
        "orphaned_io"
    }

    fn apply(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let is_logic = |id: &str| {
            matches!(
                ctx.kind_of(id),
                Some(NodeKind::Process) | Some(NodeKind::Decision)
            )
        };
        let predecessors = ctx.topology.predecessors();
        let mut findings = Vec::new();

        for node in &ctx.result.nodes {
            let repr = describe(Some(node), &node.id, "I/O node");
            match node.kind {
                Some(NodeKind::Input) => {
                    let descendants =
                        reach(&[node.id.as_str()], |id| ctx.topology.successors(id).to_vec());
                    if !descendants.is_empty() && !descendants.iter().any(|&id| is_logic(id)) {
                        findings.push(Finding::new(
                            "ORPHAN_INPUT",
                            Severity::Warning,
                            format!("Input from {repr} is never used in a process or decision."),
                            vec![node.id.clone()],
                        ));
                    }
                }
                Some(NodeKind::Output) => {
                    let ancestors = reach(&[node.id.as_str()], |id| {
                        predecessors.get(id).cloned().unwrap_or_default()
                    });
                    if !ancestors.is_empty() && !ancestors.iter().any(|&id| is_logic(id)) {
                        findings.push(Finding::new(
                            "ORPHAN_OUTPUT",
                            Severity::Warning,
                            format!(
                                "Output to {repr} does not originate from any process or decision."
                            ),
                            vec![node.id.clone()],
                        ));
                    }
                }
                _ => {}
            }
        }
        findings
    }
}

/// Decisions reached through too many earlier decisions on some path from a start.
pub struct DecisionNestingDepth {
    pub max_depth: usize,
    pub max_paths: usize,
}

impl AnalysisRule for DecisionNestingDepth {
    fn id(&self) -> &'static str {
        "decision_nesting_depth"
    }

    fn apply(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let starts = ctx.ids_of(NodeKind::Start);
        if starts.is_empty() {
            return Vec::new();
        }

        let mut walk = NestingWalk {
            ctx,
            depth: BTreeMap::new(),
            on_path: BTreeSet::new(),
            budget: self.max_paths,
        };
        for start in starts {
            walk.explore_from(start);
        }
        if walk.budget == 0 {
            tracing::debug!(
                max_paths = self.max_paths,
                "nesting depth walk stopped at path budget"
            );
        }

        ctx.ids_of(NodeKind::Decision)
            .into_iter()
            .filter_map(|id| {
                let depth = walk.depth.get(id).copied()?;
                (depth >= self.max_depth).then(|| {
                    let repr = describe(ctx.result.node(id), id, "decision node");
                    Finding::new(
                        "DEEP_NESTING",
                        Severity::Info,
                        format!(
                            "The {repr} is nested {} levels deep. Consider simplifying the logic.",
                            depth + 1
                        ),
                        vec![id.to_string()],
                    )
                })
            })
            .collect()
    }
}

struct NestingWalk<'c, 'a> {
    ctx: &'c RuleContext<'a>,
    /// Most decisions seen before reaching each decision.
    depth: BTreeMap<&'a str, usize>,
    on_path: BTreeSet<&'a str>,
    budget: usize,
}

impl<'a> NestingWalk<'_, 'a> {
    /// Every simple path from `start`, depth first on an explicit stack.
    fn explore_from(&mut self, start: &'a str) {
        let ctx = self.ctx;
        let Some(through) = self.enter(start, 0) else {
            return;
        };
        // (vertex, next successor index, decisions up to and including vertex)
        let mut stack: Vec<(&'a str, usize, usize)> = vec![(start, 0, through)];
        while let Some(&mut (id, ref mut next, through)) = stack.last_mut() {
            match ctx.topology.successors(id).get(*next) {
                Some(&successor) => {
                    *next += 1;
                    if self.on_path.contains(successor) {
                        continue;
                    }
                    match self.enter(successor, through) {
                        Some(below) => stack.push((successor, 0, below)),
                        None => {
                            self.on_path.clear();
                            return;
                        }
                    }
                }
                None => {
                    self.on_path.remove(id);
                    stack.pop();
                }
            }
        }
    }

    /// Puts `id` on the current path. `None` once the budget is spent.
    fn enter(&mut self, id: &'a str, decisions_before: usize) -> Option<usize> {
        if self.budget == 0 {
            return None;
        }
        self.budget -= 1;

        let is_decision = self.ctx.kind_of(id) == Some(NodeKind::Decision);
        if is_decision {
            let best = self.depth.entry(id).or_insert(0);
            *best = (*best).max(decisions_before);
        }
        self.on_path.insert(id);
        Some(decisions_before + usize::from(is_decision))
    }
}

/// Simple cycles inside one strongly connected component.
///
/// Each cycle is reported once, starting from its member that comes first in
/// `component`. Path extensions draw on `budget`; at zero the search stops.
fn simple_cycles<'a>(
    topology: &Topology<'a>,
    component: &[&'a str],
    budget: &mut usize,
) -> Vec<Vec<&'a str>> {
    let mut cycles: Vec<Vec<&'a str>> = Vec::new();
    for (idx, &start) in component.iter().enumerate() {
        let allowed: BTreeSet<&str> = component[idx..].iter().copied().collect();
        let mut path = vec![start];
        let mut on_path: BTreeSet<&'a str> = BTreeSet::from([start]);
        let mut stack: Vec<usize> = vec![0];
        while let Some(next) = stack.last_mut() {
            let Some(&vertex) = path.last() else {
                break;
            };
            match topology.successors(vertex).get(*next) {
                Some(&successor) => {
                    *next += 1;
                    if successor == start {
                        if !cycles.contains(&path) {
                            cycles.push(path.clone());
                        }
                    } else if allowed.contains(successor) && !on_path.contains(successor) {
                        if *budget == 0 {
                            return cycles;
                        }
                        *budget -= 1;
                        path.push(successor);
                        on_path.insert(successor);
                        stack.push(0);
                    }
                }
                None => {
                    stack.pop();
                    if let Some(done) = path.pop() {
                        on_path.remove(done);
                    }
                }
            }
        }
    }
    cycles
}

/// Every id reachable from `roots` in one or more steps.
fn reach<'a, F>(roots: &[&'a str], mut next: F) -> BTreeSet<&'a str>
where
    F: FnMut(&str) -> Vec<&'a str>,
{
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<&'a str> = roots.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        for successor in next(id) {
            if seen.insert(successor) {
                queue.push_back(successor);
            }
        }
    }
    seen
}

/// Kosaraju, iteratively. Components come out in the order their first
/// member appears in the topology's vertex order.
fn strongly_connected_components<'a>(topology: &Topology<'a>) -> Vec<Vec<&'a str>> {
    let mut finished: Vec<&'a str> = Vec::new();
    let mut visited: BTreeSet<&'a str> = BTreeSet::new();
    for &root in topology.vertices() {
        if !visited.insert(root) {
            continue;
        }
        let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];
        while let Some(&mut (vertex, ref mut next)) = stack.last_mut() {
            let successors = topology.successors(vertex);
            if let Some(&successor) = successors.get(*next) {
                *next += 1;
                if visited.insert(successor) {
                    stack.push((successor, 0));
                }
            } else {
                finished.push(vertex);
                stack.pop();
            }
        }
    }

    let predecessors = topology.predecessors();
    let mut assigned: BTreeSet<&'a str> = BTreeSet::new();
    let mut components: Vec<Vec<&'a str>> = Vec::new();
    for &root in finished.iter().rev() {
        if !assigned.insert(root) {
            continue;
        }
        let mut component = vec![root];
        let mut stack = vec![root];
        while let Some(vertex) = stack.pop() {
            for &prev in predecessors.get(vertex).map(Vec::as_slice).unwrap_or(&[]) {
                if assigned.insert(prev) {
                    component.push(prev);
                    stack.push(prev);
                }
            }
        }
        components.push(component);
    }

    let position: BTreeMap<&str, usize> = topology
        .vertices()
        .iter()
        .enumerate()
        .map(|(idx, &id)| (id, idx))
        .collect();
    for component in &mut components {
        component.sort_by_key(|id| position.get(id).copied().unwrap_or(usize::MAX));
    }
    components.sort_by_key(|component| {
        component
            .first()
            .and_then(|id| position.get(id).copied())
            .unwrap_or(usize::MAX)
    });
    components
}
