//! Document tree: parsing, serialization and traversal

use rstest::rstest;
use serde_json::json;

use mindtree::domain::{DocumentNode, DocumentRecord, DocumentTree, DomainError, NodeKey};

fn names(tree: &DocumentTree, keys: &[NodeKey]) -> Vec<String> {
    keys.iter()
        .map(|&k| tree.get(k).map(|n| n.name.clone()).unwrap_or_default())
        .collect()
}

/// Root
/// ├── A
/// │   ├── A1
/// │   └── A2
/// │       └── X
/// └── B
///     └── X
fn sample() -> DocumentTree {
    DocumentTree::from_value(json!({
        "name": "Root",
        "children": [
            {"name": "A", "children": [
                {"name": "A1"},
                {"name": "A2", "children": [{"name": "X", "id": "x-1"}]}
            ]},
            {"name": "B", "body": "<p>b</p>", "children": [{"name": "X"}]}
        ]
    }))
    .expect("valid document")
}

// ============================================================
// Parse / serialize
// ============================================================

#[test]
fn given_document_when_serialized_and_parsed_then_structurally_equal() {
    // Arrange
    let tree = sample();

    // Act
    let json = tree.to_json().unwrap();
    let parsed = DocumentTree::from_json(&json).unwrap();

    // Assert
    assert_eq!(parsed, tree);
    assert_eq!(parsed.to_record(), tree.to_record());
}

#[test]
fn given_chain_deeper_than_parser_default_when_round_tripped_then_structurally_equal() {
    // Arrange
    let depth = 300;
    let mut tree = DocumentTree::new("level-0", "");
    let mut tip = tree.root();
    for level in 1..=depth {
        tip = tree
            .append_child(tip, DocumentNode::new(format!("level-{level}"), ""))
            .unwrap();
    }

    // Act
    let compact = DocumentTree::from_json(&tree.to_json().unwrap()).unwrap();
    let pretty = DocumentTree::from_json(&tree.to_json_pretty().unwrap()).unwrap();

    // Assert
    assert_eq!(compact, tree);
    assert_eq!(pretty, tree);
    assert_eq!(compact.max_depth(), depth);
    assert_eq!(compact.node_count(), depth + 1);
    let deepest = compact.find_first_by_name("level-300").unwrap();
    assert_eq!(compact.depth_of(deepest), Some(depth));
}

#[test]
fn given_trailing_content_after_document_when_parsing_then_malformed() {
    let result = DocumentTree::from_json(r#"{"name": "Root"} {"name": "Other"}"#);

    assert!(matches!(result, Err(DomainError::MalformedDocument { .. })));
}

#[test]
fn given_leaf_without_id_when_serialized_then_children_and_id_keys_are_omitted() {
    let tree = DocumentTree::new("Solo", "");

    let value = tree.to_value().unwrap();

    assert_eq!(value, json!({"name": "Solo", "body": ""}));
}

#[rstest]
#[case::missing_name(json!({"body": "x"}))]
#[case::numeric_name(json!({"name": 7}))]
#[case::children_not_a_sequence(json!({"name": "Root", "children": {"name": "A"}}))]
#[case::nested_child_without_name(json!({"name": "Root", "children": [{"body": "x"}]}))]
#[case::not_an_object(json!("Root"))]
fn given_malformed_input_when_parsing_then_malformed_document_error(
    #[case] input: serde_json::Value,
) {
    let result = DocumentTree::from_value(input);

    assert!(matches!(
        result,
        Err(DomainError::MalformedDocument { .. })
    ));
}

#[test]
fn given_invalid_json_text_when_parsing_then_malformed_document_error() {
    let result = DocumentTree::from_json("{\"name\": ");

    assert!(matches!(
        result,
        Err(DomainError::MalformedDocument { .. })
    ));
}

#[test]
fn given_legacy_html_key_when_parsing_then_body_is_filled() {
    let tree = DocumentTree::from_value(json!({"name": "Root", "HTML": "<b>legacy</b>"})).unwrap();

    assert_eq!(tree.get(tree.root()).unwrap().body, "<b>legacy</b>");
}

#[test]
fn given_cloned_tree_when_original_is_edited_then_clone_is_unaffected() {
    // Arrange
    let mut original = sample();
    let copy = original.clone();

    // Act
    let root = original.root();
    original
        .append_child(root, DocumentNode::new("C", ""))
        .unwrap();

    // Assert
    assert_ne!(copy, original);
    assert_eq!(copy, sample());
}

// ============================================================
// Traversal
// ============================================================

#[test]
fn given_document_when_traversing_preorder_then_follows_child_order() {
    let tree = sample();

    assert_eq!(
        names(&tree, &tree.preorder()),
        ["Root", "A", "A1", "A2", "X", "B", "X"]
    );
}

#[test]
fn given_document_when_traversing_breadth_first_then_visits_level_by_level() {
    let tree = sample();

    assert_eq!(
        names(&tree, &tree.breadth_first()),
        ["Root", "A", "B", "A1", "A2", "X", "X"]
    );
}

#[test]
fn given_document_when_traversing_postorder_then_children_precede_parents() {
    let tree = sample();

    let order: Vec<NodeKey> = tree.iter_postorder().map(|(k, _)| k).collect();

    assert_eq!(
        names(&tree, &order),
        ["A1", "X", "A2", "A", "X", "B", "Root"]
    );
}

#[test]
fn given_duplicate_names_when_finding_then_first_in_preorder_wins() {
    let tree = sample();

    let first = tree.find_first_by_name("X").unwrap();
    let all = tree.find_all_by_name("X");

    assert_eq!(all.len(), 2);
    assert_eq!(all[0], first);
    assert_eq!(tree.get(first).unwrap().id.as_deref(), Some("x-1"));
    assert_eq!(tree.find_by_id("x-1"), Some(first));
}

#[test]
fn given_unknown_name_when_finding_then_absent_not_error() {
    let tree = sample();

    assert_eq!(tree.find_first_by_name("nope"), None);
    assert!(tree.find_all_by_name("nope").is_empty());
    assert_eq!(tree.find_by_id("nope"), None);
}

#[test]
fn given_document_when_listing_leaves_then_returns_childless_nodes_in_order() {
    let tree = sample();

    assert_eq!(names(&tree, &tree.leaf_nodes()), ["A1", "X", "X"]);
}

#[rstest]
#[case(0, &["Root"])]
#[case(1, &["A", "B"])]
#[case(2, &["A1", "A2", "X"])]
#[case(3, &["X"])]
#[case(4, &[])]
fn given_document_when_listing_nodes_at_depth_then_returns_that_level(
    #[case] depth: usize,
    #[case] expected: &[&str],
) {
    let tree = sample();

    assert_eq!(names(&tree, &tree.nodes_at_depth(depth)), expected);
}

#[test]
fn given_document_when_measuring_then_reports_depths_and_paths() {
    let tree = sample();
    let deep_x = tree.find_by_id("x-1").unwrap();

    assert_eq!(tree.max_depth(), 3);
    assert_eq!(DocumentTree::new("only", "").max_depth(), 0);
    assert_eq!(tree.depth_of(deep_x), Some(3));
    assert_eq!(
        names(&tree, &tree.path_to(deep_x).unwrap()),
        ["Root", "A", "A2", "X"]
    );
    assert_eq!(tree.node_count(), 7);
}

// ============================================================
// Mutation primitives
// ============================================================

#[test]
fn given_root_when_removing_then_refused_and_tree_unchanged() {
    let mut tree = sample();
    let root = tree.root();

    let result = tree.remove_subtree(root);

    assert!(matches!(result, Err(DomainError::RootNode)));
    assert_eq!(tree, sample());
}

#[test]
fn given_subtree_when_removed_then_returns_its_record_and_keys_go_stale() {
    // Arrange
    let mut tree = sample();
    let a = tree.find_first_by_name("A").unwrap();
    let a2 = tree.find_first_by_name("A2").unwrap();

    // Act
    let removed = tree.remove_subtree(a).unwrap();

    // Assert
    assert_eq!(removed.name, "A");
    assert_eq!(removed.children.len(), 2);
    assert!(!tree.contains(a));
    assert!(!tree.contains(a2));
    assert_eq!(names(&tree, &tree.preorder()), ["Root", "B", "X"]);
}

#[test]
fn given_node_when_moved_under_own_descendant_then_cycle_detected() {
    let mut tree = sample();
    let a = tree.find_first_by_name("A").unwrap();
    let a2 = tree.find_first_by_name("A2").unwrap();

    let result = tree.move_subtree(a, a2);

    assert!(matches!(result, Err(DomainError::CycleDetected { .. })));
    assert_eq!(tree, sample());
}

#[test]
fn given_subtree_when_moved_then_keys_survive_and_it_becomes_last_child() {
    // Arrange
    let mut tree = sample();
    let a2 = tree.find_first_by_name("A2").unwrap();
    let b = tree.find_first_by_name("B").unwrap();

    // Act
    tree.move_subtree(a2, b).unwrap();

    // Assert
    let b_node = tree.get(b).unwrap();
    assert_eq!(b_node.children().last(), Some(&a2));
    assert_eq!(tree.get(a2).unwrap().parent(), Some(b));
    assert_eq!(
        names(&tree, &tree.preorder()),
        ["Root", "A", "A1", "B", "X", "A2", "X"]
    );
}

#[test]
fn given_unsaved_nodes_when_assigning_ids_then_only_missing_ids_are_filled() {
    let mut tree = sample();
    let mut counter = 0;

    let assigned = tree.assign_missing_ids(|| {
        counter += 1;
        format!("gen-{counter}")
    });

    assert_eq!(assigned, 6);
    assert!(tree.find_by_id("x-1").is_some());
    assert!(tree.iter().all(|(_, n)| n.id.is_some()));
}

#[test]
fn given_record_builders_when_building_tree_then_matches_json_form() {
    let built = DocumentTree::from_record(
        &DocumentRecord::new("Root")
            .with_children(vec![DocumentRecord::new("A").with_body("<p>a</p>").with_id("a")]),
    );

    let parsed = DocumentTree::from_value(json!({
        "name": "Root",
        "children": [{"name": "A", "body": "<p>a</p>", "id": "a"}]
    }))
    .unwrap();

    assert_eq!(built, parsed);
}
