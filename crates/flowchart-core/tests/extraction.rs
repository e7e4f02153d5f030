mod helpers;

use std::cell::RefCell;

use flowchart_core::diagnostics::SkipReason;
use flowchart_core::{Diagnostic, Geometry, NodeKind, extract, extract_with, parse};
use helpers::{DIAMOND, OVAL, PARALLELOGRAM, RECT, edge, graph_model, vertex};
use pretty_assertions::assert_eq;

fn extract_xml(xml: &str) -> flowchart_core::ExtractionResult {
    let document = parse(xml).expect("parse");
    extract(&document).expect("extract")
}

fn kinds(result: &flowchart_core::ExtractionResult) -> Vec<(&str, Option<NodeKind>)> {
    result
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), node.kind))
        .collect()
}

#[test]
fn single_vertex_geometry_is_read_exactly() {
    let xml = graph_model(
        r#"<mxCell id="2" value="Box" style="rounded=0;" vertex="1" parent="1"><mxGeometry x="10" y="20" width="80" height="40" as="geometry"/></mxCell>"#,
    );
    let result = extract_xml(&xml);

    assert_eq!(result.nodes.len(), 1);
    assert_eq!(
        result.nodes[0].geometry,
        Some(Geometry {
            x: 10.0,
            y: 20.0,
            width: 80.0,
            height: 40.0
        })
    );
}

#[test]
fn missing_geometry_fields_default_to_zero_but_missing_element_stays_absent() {
    let xml = graph_model(
        r#"<mxCell id="a" value="Partial" vertex="1" parent="1"><mxGeometry width="80" as="geometry"/></mxCell><mxCell id="b" value="None" vertex="1" parent="1"/>"#,
    );
    let result = extract_xml(&xml);

    assert_eq!(
        result.nodes[0].geometry,
        Some(Geometry {
            x: 0.0,
            y: 0.0,
            width: 80.0,
            height: 0.0
        })
    );
    assert_eq!(result.nodes[1].geometry, None);
}

#[test]
fn math_markup_value_becomes_its_number() {
    let xml = graph_model(
        r#"<mxCell id="m" value="&lt;math xmlns=&quot;http://www.w3.org/1998/Math/MathML&quot;&gt;&lt;mn&gt;123&lt;/mn&gt;&lt;/math&gt;" style="rounded=0;" vertex="1" parent="1"/>"#,
    );
    let result = extract_xml(&xml);
    assert_eq!(result.nodes[0].value.as_deref(), Some("123"));
}

#[test]
fn broken_math_markup_keeps_raw_value() {
    let xml = graph_model(
        r#"<mxCell id="m" value="&lt;math&gt;&lt;mn&gt;1" style="rounded=0;" vertex="1" parent="1"/>"#,
    );
    let document = parse(&xml).expect("parse");
    let events = RefCell::new(Vec::new());
    let sink = |diagnostic: Diagnostic| events.borrow_mut().push(diagnostic);
    let result = extract_with(&document, &sink).expect("extract");

    assert_eq!(result.nodes[0].value.as_deref(), Some("<math><mn>1"));
    assert!(
        events
            .borrow()
            .iter()
            .any(|d| matches!(d, Diagnostic::MathMarkupIgnored { cell_id, .. } if cell_id == "m"))
    );
}

#[test]
fn structural_labels_and_empty_shapes_are_filtered() {
    let cells = [
        // Shape hung directly off the model root.
        r#"<mxCell id="top" value="Top" vertex="1" parent="0"/>"#.to_string(),
        vertex("label", "yes", "text;html=1;align=center;"),
        vertex("on-edge", "no", "edgeLabel;html=1;resizable=0;"),
        vertex("blank", "", RECT),
        vertex("spaces", "   ", RECT),
        vertex("group", "", "group"),
        r#"<mxCell value="No id" vertex="1" parent="1"/>"#.to_string(),
        vertex("keep", "Keep me", RECT),
        vertex("keep", "Duplicate", RECT),
    ]
    .concat();
    let document = parse(&graph_model(&cells)).expect("parse");

    let events = RefCell::new(Vec::new());
    let sink = |diagnostic: Diagnostic| events.borrow_mut().push(diagnostic);
    let result = extract_with(&document, &sink).expect("extract");

    let ids: Vec<&str> = result.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["group", "keep"]);
    assert_eq!(result.nodes[1].value.as_deref(), Some("Keep me"));

    let skipped: Vec<(String, SkipReason)> = events
        .into_inner()
        .into_iter()
        .filter_map(|d| match d {
            Diagnostic::CellSkipped { cell_id, reason } => Some((cell_id, reason)),
            _ => None,
        })
        .collect();
    assert_eq!(
        skipped,
        vec![
            ("top".to_string(), SkipReason::Structural),
            ("label".to_string(), SkipReason::FloatingLabel),
            ("on-edge".to_string(), SkipReason::FloatingLabel),
            ("blank".to_string(), SkipReason::Empty),
            ("spaces".to_string(), SkipReason::Empty),
            ("keep".to_string(), SkipReason::DuplicateId),
        ]
    );
}

#[test]
fn classification_uses_final_edge_counts() {
    // Edges appear before their endpoints, so degrees must be known up front.
    let cells = [
        edge("e1", "start", "read"),
        edge("e2", "read", "check"),
        edge("e3", "check", "calc"),
        edge("e4", "check", "show"),
        edge("e5", "calc", "show"),
        edge("e6", "show", "stop"),
        vertex("start", "Begin", OVAL),
        vertex("read", "Read x", PARALLELOGRAM),
        vertex("check", "x > 10", DIAMOND),
        vertex("calc", "y = x * 2", RECT),
        vertex("show", "Print y", PARALLELOGRAM),
        vertex("stop", "Bye", OVAL),
    ]
    .concat();
    let result = extract_xml(&graph_model(&cells));

    assert_eq!(
        kinds(&result),
        vec![
            ("start", Some(NodeKind::Start)),
            ("read", Some(NodeKind::Input)),
            ("check", Some(NodeKind::Decision)),
            ("calc", Some(NodeKind::Process)),
            ("show", Some(NodeKind::Output)),
            ("stop", Some(NodeKind::End)),
        ]
    );
    assert_eq!(result.edges.len(), 6);
}

#[test]
fn dangling_edges_are_kept_and_node_colors_normalized() {
    let cells = [
        vertex("a", "Work", "rounded=0;fillColor=#DAE8FC;"),
        vertex("b", "More", "rounded=0;fillColor=#f00;"),
        vertex("c", "Other", "rounded=0;fillColor=green;"),
        vertex("d", "Plain", RECT),
        edge("e1", "a", "ghost"),
        r#"<mxCell id="e2" edge="1" parent="1" source="b"/>"#.to_string(),
    ]
    .concat();
    let result = extract_xml(&graph_model(&cells));

    let colors: Vec<Option<&str>> = result.nodes.iter().map(|n| n.color.as_deref()).collect();
    assert_eq!(
        colors,
        vec![Some("#dae8fc"), Some("#ff0000"), Some("#008000"), Some("#f0f0f0")]
    );
    assert_eq!(result.edges.len(), 2);
    assert_eq!(result.edges[1].target_id, None);
    assert_eq!(result.edges[1].endpoints(), None);
}

#[test]
fn user_object_supplies_id_and_label() {
    let xml = graph_model(
        r#"<UserObject label="Start here" id="u1"><mxCell style="ellipse;" vertex="1" parent="1"><mxGeometry x="5" y="5" width="40" height="40" as="geometry"/></mxCell></UserObject>"#,
    );
    let result = extract_xml(&xml);

    assert_eq!(result.nodes.len(), 1);
    assert_eq!(result.nodes[0].id, "u1");
    assert_eq!(result.nodes[0].value.as_deref(), Some("Start here"));
    assert_eq!(result.nodes[0].kind, Some(NodeKind::Start));
}

#[test]
fn empty_model_extracts_to_empty_collections() {
    let result = extract_xml(&graph_model(""));
    assert!(result.nodes.is_empty());
    assert!(result.edges.is_empty());
}

#[test]
fn node_json_uses_downstream_field_names() {
    let cells = [vertex("n1", "Start", OVAL), edge("e1", "n1", "n2")].concat();
    let result = extract_xml(&graph_model(&cells));
    let json = serde_json::to_value(&result).expect("json");

    assert_eq!(
        json["nodes"][0],
        serde_json::json!({
            "id": "n1",
            "value": "Start",
            "style": OVAL,
            "type": "start",
            "vertex": true,
            "parentId": "1",
            "color": "#f0f0f0",
            "geometry": { "x": 0, "y": 0, "width": 120, "height": 60 }
        })
    );
    assert_eq!(
        json["edges"][0],
        serde_json::json!({
            "id": "e1",
            "style": "edgeStyle=orthogonalEdgeStyle;",
            "edge": true,
            "parentId": "1",
            "sourceId": "n1",
            "targetId": "n2"
        })
    );
}
