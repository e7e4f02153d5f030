use flowchart_core::analyze::{ISSUE_INFINITE_LOOP, ISSUE_NO_END, ISSUE_NO_START};
use flowchart_core::config::AnalysisConfig;
use flowchart_core::{Edge, ExtractionResult, Node, NodeKind, Severity, analyze, assess};
use pretty_assertions::assert_eq;

fn node(id: &str, kind: NodeKind) -> Node {
    Node {
        id: id.to_string(),
        value: Some(format!("{} {id}", kind.title())),
        style: None,
        kind: Some(kind),
        vertex: true,
        parent_id: Some("1".into()),
        color: None,
        geometry: None,
    }
}

fn edge(source: &str, target: &str) -> Edge {
    Edge {
        id: format!("{source}->{target}"),
        value: None,
        style: None,
        edge: true,
        parent_id: Some("1".into()),
        source_id: Some(source.to_string()),
        target_id: Some(target.to_string()),
    }
}

fn graph(nodes: Vec<Node>, edges: Vec<Edge>) -> ExtractionResult {
    ExtractionResult { nodes, edges }
}

fn issues(result: &ExtractionResult) -> Vec<String> {
    analyze(result).expect("analysis").issues
}

fn rule_ids(result: &ExtractionResult) -> Vec<String> {
    assess(result, &AnalysisConfig::default())
        .into_iter()
        .map(|finding| finding.rule_id)
        .collect()
}

fn linear() -> ExtractionResult {
    graph(
        vec![
            node("s", NodeKind::Start),
            node("p", NodeKind::Process),
            node("e", NodeKind::End),
        ],
        vec![edge("s", "p"), edge("p", "e")],
    )
}

#[test]
fn well_formed_chart_has_no_issues() {
    let result = linear();
    let analysis = analyze(&result).expect("analysis");

    assert_eq!(analysis.issues, Vec::<String>::new());
    assert_eq!(analysis.total_elements, 5);
    assert_eq!(analysis.start_nodes.len(), 1);
    assert_eq!(analysis.end_nodes.len(), 1);
    assert_eq!(analysis.process_nodes.len(), 1);
    assert_eq!(analysis.edges.len(), 2);
    assert!(rule_ids(&result).is_empty());
}

#[test]
fn no_nodes_means_no_analysis() {
    assert!(analyze(&ExtractionResult::default()).is_none());
    let findings = assess(&ExtractionResult::default(), &AnalysisConfig::default());
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, "EMPTY_DATA_RECEIVED");
}

#[test]
fn missing_start_is_the_only_terminal_issue() {
    let result = graph(
        vec![node("p", NodeKind::Process), node("e", NodeKind::End)],
        vec![edge("p", "e")],
    );
    assert_eq!(issues(&result), vec![ISSUE_NO_START.to_string()]);
    assert!(issues(&result).iter().all(|issue| !issue.contains("end node")));
}

#[test]
fn multiple_starts_and_missing_end_are_counted() {
    let result = graph(
        vec![
            node("s1", NodeKind::Start),
            node("s2", NodeKind::Start),
            node("p", NodeKind::Process),
        ],
        vec![edge("s1", "p"), edge("s2", "p"), edge("p", "s1")],
    );
    let found = issues(&result);
    assert!(found.contains(&"The flowchart has 2 start nodes; exactly one is required.".into()));
    assert!(found.contains(&ISSUE_NO_END.to_string()));
}

#[test]
fn three_node_cycle_is_reported_once() {
    let cyclic = graph(
        vec![
            node("a", NodeKind::Process),
            node("b", NodeKind::Process),
            node("c", NodeKind::Process),
        ],
        vec![edge("a", "b"), edge("b", "c"), edge("c", "a")],
    );
    let found = issues(&cyclic);
    assert!(found.iter().any(|issue| issue.contains("potential infinite loop")));
    assert_eq!(
        found.iter().filter(|issue| *issue == ISSUE_INFINITE_LOOP).count(),
        1
    );

    let acyclic = graph(
        cyclic.nodes.clone(),
        vec![edge("a", "b"), edge("b", "c"), edge("a", "c")],
    );
    assert!(
        issues(&acyclic)
            .iter()
            .all(|issue| !issue.contains("infinite loop"))
    );
}

#[test]
fn decision_needs_two_branches() {
    let one_branch = graph(
        vec![
            node("s", NodeKind::Start),
            node("d", NodeKind::Decision),
            node("e", NodeKind::End),
        ],
        vec![edge("s", "d"), edge("d", "e")],
    );
    let branch_issues: Vec<String> = issues(&one_branch)
        .into_iter()
        .filter(|issue| issue.contains("should have at least two outgoing branches"))
        .collect();
    assert_eq!(
        branch_issues,
        vec![
            "Decision node 'Decision d' should have at least two outgoing branches, but has 1."
                .to_string()
        ]
    );

    let mut two_branches = one_branch.clone();
    two_branches.nodes.push(node("p", NodeKind::Process));
    two_branches.edges.push(edge("d", "p"));
    two_branches.edges.push(edge("p", "e"));
    assert!(
        issues(&two_branches)
            .iter()
            .all(|issue| !issue.contains("outgoing branches"))
    );
}

#[test]
fn dead_ends_exempt_terminals() {
    let result = graph(
        vec![
            node("s", NodeKind::Start),
            node("p", NodeKind::Process),
            node("e", NodeKind::End),
        ],
        vec![edge("s", "p"), edge("s", "e")],
    );
    let dead_ends: Vec<String> = issues(&result)
        .into_iter()
        .filter(|issue| issue.contains("dead end"))
        .collect();
    assert_eq!(
        dead_ends,
        vec!["Process node 'Process p' is a dead end: it has no outgoing connections.".to_string()]
    );
}

#[test]
fn disconnected_node_is_named_by_label_then_id() {
    let mut result = linear();
    result.nodes.push(node("lonely", NodeKind::Process));
    let mut unnamed = node("x9", NodeKind::Output);
    unnamed.value = None;
    result.nodes.push(unnamed);

    let mut marked_up = node("html", NodeKind::Process);
    marked_up.value = Some("<b>Sum</b>&nbsp;a + b".into());
    result.nodes.push(marked_up);

    let found = issues(&result);
    assert!(found.contains(&"Node 'Process lonely' is disconnected from the flowchart.".into()));
    assert!(found.contains(&"Node 'Sum a + b' is disconnected from the flowchart.".into()));
    assert!(found.contains(&"Process node 'Sum a + b' is a dead end: it has no outgoing connections.".into()));
    assert!(found.contains(&"Node 'x9' is disconnected from the flowchart.".into()));
}

#[test]
fn every_check_runs_in_one_pass() {
    let result = graph(
        vec![node("d", NodeKind::Decision), node("p", NodeKind::Process)],
        vec![edge("d", "p"), edge("p", "d")],
    );
    let found = issues(&result);
    assert_eq!(
        found,
        vec![
            ISSUE_NO_START.to_string(),
            ISSUE_NO_END.to_string(),
            ISSUE_INFINITE_LOOP.to_string(),
            "Decision node 'Decision d' should have at least two outgoing branches, but has 1."
                .to_string(),
        ]
    );
}

#[test]
fn loop_with_decision_exit_is_not_a_missing_exit() {
    let result = graph(
        vec![
            node("s", NodeKind::Start),
            node("p", NodeKind::Process),
            node("d", NodeKind::Decision),
            node("e", NodeKind::End),
        ],
        vec![edge("s", "p"), edge("p", "d"), edge("d", "p"), edge("d", "e")],
    );
    assert!(!rule_ids(&result).contains(&"MISSING_LOOP_EXIT".to_string()));
    // The plain analyzer stays conservative about any cycle.
    assert!(issues(&result).contains(&ISSUE_INFINITE_LOOP.to_string()));
}

#[test]
fn loop_without_exit_lists_its_members() {
    let result = graph(
        vec![
            node("s", NodeKind::Start),
            node("a", NodeKind::Process),
            node("b", NodeKind::Process),
            node("e", NodeKind::End),
        ],
        vec![edge("s", "a"), edge("a", "b"), edge("b", "a")],
    );
    let findings = assess(&result, &AnalysisConfig::default());
    let exit = findings
        .iter()
        .find(|finding| finding.rule_id == "MISSING_LOOP_EXIT")
        .expect("missing loop exit");
    let mut members = exit.elements.clone();
    members.sort();
    assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(exit.severity, Severity::Error);

    let ids = rule_ids(&result);
    assert!(ids.contains(&"UNREACHABLE_CODE".to_string()));
    assert!(ids.contains(&"END_SYMBOL_NO_INCOMING".to_string()));
}

#[test]
fn decision_exit_does_not_cover_a_sibling_loop() {
    // p1 -> p2 -> p1 shares a component with p1 -> d -> p1, whose decision can leave.
    let result = graph(
        vec![
            node("s", NodeKind::Start),
            node("p1", NodeKind::Process),
            node("p2", NodeKind::Process),
            node("d", NodeKind::Decision),
            node("e", NodeKind::End),
        ],
        vec![
            edge("s", "p1"),
            edge("p1", "p2"),
            edge("p2", "p1"),
            edge("p1", "d"),
            edge("d", "p1"),
            edge("d", "e"),
        ],
    );
    let loops: Vec<Vec<String>> = assess(&result, &AnalysisConfig::default())
        .into_iter()
        .filter(|finding| finding.rule_id == "MISSING_LOOP_EXIT")
        .map(|finding| finding.elements)
        .collect();
    assert_eq!(loops, vec![vec!["p1".to_string(), "p2".to_string()]]);
}

#[test]
fn long_linear_chart_is_assessed() {
    let mut nodes = vec![node("s", NodeKind::Start)];
    let mut edges = Vec::new();
    let mut previous = "s".to_string();
    for i in 0..9_000 {
        let id = format!("p{i}");
        nodes.push(node(&id, NodeKind::Process));
        edges.push(edge(&previous, &id));
        previous = id;
    }
    nodes.push(node("e", NodeKind::End));
    edges.push(edge(&previous, "e"));

    let findings = assess(&graph(nodes, edges), &AnalysisConfig::default());
    assert!(findings.is_empty(), "{findings:?}");
}

#[test]
fn assessment_rules_report_in_order() {
    let result = graph(
        vec![
            node("s", NodeKind::Start),
            node("d", NodeKind::Decision),
            node("lost", NodeKind::Process),
        ],
        vec![edge("s", "d")],
    );
    assert_eq!(
        rule_ids(&result),
        vec![
            "NO_END_SYMBOL",
            "UNCONNECTED_SYMBOL_NO_OUTGOING",
            "UNCONNECTED_SYMBOL_BOTH",
            "UNREACHABLE_CODE",
            "DECISION_NO_BRANCHES",
        ]
    );
}

#[test]
fn orphaned_io_needs_logic_around_it() {
    let result = graph(
        vec![
            node("s", NodeKind::Start),
            node("in", NodeKind::Input),
            node("out", NodeKind::Output),
            node("e", NodeKind::End),
        ],
        vec![edge("s", "in"), edge("in", "out"), edge("out", "e")],
    );
    let ids = rule_ids(&result);
    assert!(ids.contains(&"ORPHAN_INPUT".to_string()));
    assert!(ids.contains(&"ORPHAN_OUTPUT".to_string()));

    let mut fed = result.clone();
    fed.nodes.push(node("p", NodeKind::Process));
    fed.edges = vec![
        edge("s", "in"),
        edge("in", "p"),
        edge("p", "out"),
        edge("out", "e"),
    ];
    let ids = rule_ids(&fed);
    assert!(!ids.contains(&"ORPHAN_INPUT".to_string()));
    assert!(!ids.contains(&"ORPHAN_OUTPUT".to_string()));
}

#[test]
fn deep_decision_chains_are_flagged() {
    let mut nodes = vec![node("s", NodeKind::Start), node("e", NodeKind::End)];
    let mut edges = Vec::new();
    let mut previous = "s".to_string();
    for i in 1..=4 {
        let id = format!("d{i}");
        nodes.push(node(&id, NodeKind::Decision));
        edges.push(edge(&previous, &id));
        edges.push(edge(&id, "e"));
        previous = id;
    }
    edges.push(edge(&previous, "e"));
    let result = graph(nodes, edges);

    let deep: Vec<Vec<String>> = assess(&result, &AnalysisConfig::default())
        .into_iter()
        .filter(|finding| finding.rule_id == "DEEP_NESTING")
        .map(|finding| finding.elements)
        .collect();
    assert_eq!(deep, vec![vec!["d4".to_string()]]);

    let strict = AnalysisConfig {
        max_nesting_depth: 2,
        ..AnalysisConfig::default()
    };
    let flagged = assess(&result, &strict)
        .into_iter()
        .filter(|finding| finding.rule_id == "DEEP_NESTING")
        .count();
    assert_eq!(flagged, 2);
}
