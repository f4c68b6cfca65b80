//! Tree primitives, legacy migration and persistence

mod common;

use proptest::prelude::*;
use std::io::Write;
use user_props::tree::{
    export_tree, flatten_tree_to_legacy_map, import_tree, migrate_flat_map_to_tree, LegacyFlatMap,
    LegacyProp,
};
use user_props::{ImportError, NodeType, PathError, PropNode, PropTree};

fn legacy_entry() -> impl Strategy<Value = LegacyProp> {
    prop_oneof![
        (-1_000_000_000i64..1_000_000_000).prop_map(|n| (NodeType::Number, serde_json::json!(n))),
        (-1.0e9f64..1.0e9)
            .prop_filter("whole values are written as integers", |n| n.fract() != 0.0)
            .prop_map(|n| (NodeType::Number, serde_json::json!(n))),
        "[a-zA-Z0-9 ]{0,12}".prop_map(|s| (NodeType::String, serde_json::json!(s))),
        any::<bool>().prop_map(|b| (NodeType::Boolean, serde_json::json!(b))),
    ]
    .prop_flat_map(|(kind, value)| {
        any::<bool>().prop_map(move |global| LegacyProp {
            kind,
            value: value.clone(),
            global,
        })
    })
}

fn legacy_map() -> impl Strategy<Value = LegacyFlatMap> {
    proptest::collection::vec(("[a-z]{1,6}", legacy_entry()), 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

fn array_tree(len: usize) -> PropTree {
    let mut tree = PropTree::new();
    tree.set("list", PropNode::array()).unwrap();
    for n in 0..len {
        tree.push_array_item("list", PropNode::number(n as f64)).unwrap();
    }
    tree
}

proptest! {
    #[test]
    fn test_legacy_round_trip(map in legacy_map()) {
        let tree = migrate_flat_map_to_tree(&map);
        let flat = flatten_tree_to_legacy_map(&tree);
        prop_assert_eq!(&flat, &map);

        let again = migrate_flat_map_to_tree(&flat);
        for (path, node) in tree.primitives() {
            prop_assert_eq!(again.value(&path), node.value());
        }
    }

    #[test]
    fn test_noop_reorder_keeps_storage(len in 1usize..10, pick in 0usize..10) {
        let index = pick % len;
        let mut tree = array_tree(len);
        let before = tree.get("list").unwrap().items().unwrap().as_ptr();
        let snapshot = tree.clone();

        tree.reorder_array_item("list", index, index).unwrap();

        let after = tree.get("list").unwrap().items().unwrap().as_ptr();
        prop_assert_eq!(before, after);
        prop_assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_reorder_matches_remove_insert(len in 1usize..10, a in 0usize..10, b in 0usize..10) {
        let (from, to) = (a % len, b % len);
        let mut tree = array_tree(len);
        tree.reorder_array_item("list", from, to).unwrap();

        let mut expected: Vec<f64> = (0..len).map(|n| n as f64).collect();
        let moved = expected.remove(from);
        expected.insert(to, moved);

        let actual: Vec<f64> = (0..len)
            .map(|i| common::number_at(&tree, &format!("list.{}", i)))
            .collect();
        prop_assert_eq!(actual, expected);
    }
}

#[test]
fn test_reorder_out_of_range() {
    let mut tree = array_tree(2);
    assert!(matches!(
        tree.reorder_array_item("list", 0, 2),
        Err(PathError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn test_export_import_through_file() {
    let mut tree = PropTree::new();
    tree.set("title", PropNode::string("Hello")).unwrap();
    tree.set(
        "size.width",
        PropNode::number(120.0).with_expression("get('size.height') * 2"),
    )
    .unwrap();
    tree.set("size.height", PropNode::number(60.0)).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", export_tree(&tree).unwrap()).unwrap();

    let content = std::fs::read_to_string(file.path()).unwrap();
    let imported = import_tree(&content).unwrap();
    assert_eq!(imported, tree);
}

#[test]
fn test_import_rejections() {
    assert!(matches!(import_tree("{not json"), Err(ImportError::Malformed(_))));
    assert!(matches!(
        import_tree(r#"{"tree": {"type": "object"}}"#),
        Err(ImportError::Unversioned)
    ));
    assert!(matches!(
        import_tree(r#"{"schemaVersion": 99, "tree": {"type": "object"}}"#),
        Err(ImportError::UnsupportedVersion(99))
    ));
}

#[test]
fn test_import_version_zero() {
    let doc = r#"{"schemaVersion": 0, "props": {
        "count": {"type": "number", "value": 3},
        "tags": {"type": "array", "value": "[\"a\",\"b\"]"}
    }}"#;
    let tree = import_tree(doc).unwrap();
    assert_eq!(tree.value("count"), Some(3.0.into()));
    assert_eq!(tree.value("tags.1"), Some("b".into()));
}
