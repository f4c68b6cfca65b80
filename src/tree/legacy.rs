//! Legacy flat-map storage.
//!
//! Older documents keep user properties as a single level of
//! `{ key: { type, value, global } }` entries. Containers are stored as
//! JSON text in `value`.

use super::path::is_valid_key;
use super::{NodeKind, PropNode, PropTree};
use crate::types::{NodeType, PropValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One entry of the legacy flat map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyProp {
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub global: bool,
}

/// Top-level property map, in insertion order
pub type LegacyFlatMap = IndexMap<String, LegacyProp>;

/// Build a tree from a legacy flat map.
///
/// Primitive values are coerced to the declared type. Container values are
/// parsed from JSON text; text that does not parse into the declared
/// container kind yields an empty container. Keys that no path can address
/// (empty, or containing `.`) are skipped.
pub fn migrate_flat_map_to_tree(map: &LegacyFlatMap) -> PropTree {
    let mut tree = PropTree::new();
    if let NodeKind::Object { children } = &mut tree.root.kind {
        for (key, prop) in map {
            if !is_valid_key(key) {
                warn!(key = %key, "Skipping legacy property with an unaddressable key");
                continue;
            }
            let mut node = migrate_entry(key, prop);
            node.meta.global = prop.global;
            children.insert(key.clone(), node);
        }
    }
    tree
}

fn migrate_entry(key: &str, prop: &LegacyProp) -> PropNode {
    match prop.kind {
        NodeType::Object | NodeType::Array => {
            let parsed = match &prop.value {
                serde_json::Value::String(text) => serde_json::from_str(text).ok(),
                serde_json::Value::Null => None,
                other => Some(other.clone()),
            };
            match parsed {
                Some(json) => {
                    let node = PropNode::from_json(&json);
                    if node.node_type() == prop.kind {
                        return node;
                    }
                    warn!(key, expected = %prop.kind, "Legacy container has wrong shape");
                }
                None => warn!(key, "Legacy container value is not valid JSON"),
            }
            PropNode::new(prop.kind)
        }
        NodeType::Number if prop.value.is_null() => PropNode::number(f64::NAN),
        primitive => PropValue::from_json(&prop.value)
            .and_then(|v| v.coerce_to(primitive))
            .map(PropNode::primitive)
            .unwrap_or_else(|| PropNode::new(primitive)),
    }
}

/// Flatten the top level of a tree into a legacy map.
///
/// Containers are written as JSON text; non-finite numbers become `null`.
pub fn flatten_tree_to_legacy_map(tree: &PropTree) -> LegacyFlatMap {
    let mut map = LegacyFlatMap::new();
    let Some(children) = tree.root().children() else {
        return map;
    };
    for (key, node) in children {
        let value = match node.value() {
            Some(value) => value.to_json(),
            None => serde_json::Value::String(node.to_json().to_string()),
        };
        map.insert(
            key.clone(),
            LegacyProp {
                kind: node.node_type(),
                value,
                global: node.meta.global,
            },
        );
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy(kind: NodeType, value: serde_json::Value) -> LegacyProp {
        LegacyProp {
            kind,
            value,
            global: false,
        }
    }

    #[test]
    fn test_migrate_primitives() {
        let mut map = LegacyFlatMap::new();
        map.insert("title".into(), legacy(NodeType::String, json!("Hi")));
        map.insert("count".into(), legacy(NodeType::Number, json!(3)));
        map.insert("on".into(), legacy(NodeType::Boolean, json!(true)));
        map.insert("coerced".into(), legacy(NodeType::Number, json!("12")));

        let tree = migrate_flat_map_to_tree(&map);
        assert_eq!(tree.value("title"), Some("Hi".into()));
        assert_eq!(tree.value("count"), Some(3.0.into()));
        assert_eq!(tree.value("on"), Some(true.into()));
        assert_eq!(tree.value("coerced"), Some(12.0.into()));
    }

    #[test]
    fn test_migrate_containers_from_json_text() {
        let mut map = LegacyFlatMap::new();
        map.insert("style".into(), legacy(NodeType::Object, json!(r#"{"color":"red"}"#)));
        map.insert("tags".into(), legacy(NodeType::Array, json!("[1,2]")));
        map.insert("broken".into(), legacy(NodeType::Object, json!("{not json")));
        map.insert("wrong".into(), legacy(NodeType::Array, json!(r#"{"a":1}"#)));

        let tree = migrate_flat_map_to_tree(&map);
        assert_eq!(tree.value("style.color"), Some("red".into()));
        assert_eq!(tree.value("tags.1"), Some(2.0.into()));
        assert!(tree.get("broken").unwrap().children().unwrap().is_empty());
        assert!(tree.get("wrong").unwrap().items().unwrap().is_empty());
    }

    #[test]
    fn test_global_flag_preserved() {
        let mut map = LegacyFlatMap::new();
        map.insert(
            "brand".into(),
            LegacyProp {
                kind: NodeType::String,
                value: json!("acme"),
                global: true,
            },
        );
        let tree = migrate_flat_map_to_tree(&map);
        assert!(tree.get("brand").unwrap().meta.global);
        assert_eq!(flatten_tree_to_legacy_map(&tree), map);
    }

    #[test]
    fn test_unaddressable_keys_are_skipped() {
        let mut map = LegacyFlatMap::new();
        map.insert("a.b".into(), legacy(NodeType::Number, json!(3)));
        map.insert("".into(), legacy(NodeType::String, json!("x")));
        map.insert("style".into(), legacy(NodeType::Object, json!(r#"{"x.y":1,"ok":2}"#)));
        map.insert("kept".into(), legacy(NodeType::Number, json!(1)));

        let tree = migrate_flat_map_to_tree(&map);
        assert!(tree.check_invariants().is_ok());
        assert_eq!(tree.root().children().unwrap().len(), 2);
        assert_eq!(tree.value("kept"), Some(1.0.into()));
        assert_eq!(tree.value("style.ok"), Some(2.0.into()));
        assert_eq!(tree.get("style").unwrap().children().unwrap().len(), 1);
    }

    #[test]
    fn test_integer_values_round_trip() {
        let mut map = LegacyFlatMap::new();
        map.insert("count".into(), legacy(NodeType::Number, json!(3)));
        map.insert("negative".into(), legacy(NodeType::Number, json!(-40)));
        map.insert("ratio".into(), legacy(NodeType::Number, json!(0.25)));

        let flat = flatten_tree_to_legacy_map(&migrate_flat_map_to_tree(&map));
        assert_eq!(flat, map);
        assert_eq!(serde_json::to_string(&flat["count"].value).unwrap(), "3");
    }

    #[test]
    fn test_flatten_then_migrate_primitives() {
        let mut map = LegacyFlatMap::new();
        map.insert("a".into(), legacy(NodeType::String, json!("x")));
        map.insert("b".into(), legacy(NodeType::Number, json!(2.5)));
        map.insert("c".into(), legacy(NodeType::Boolean, json!(false)));

        let flat = flatten_tree_to_legacy_map(&migrate_flat_map_to_tree(&map));
        assert_eq!(flat, map);
    }

    #[test]
    fn test_flatten_containers_and_nan() {
        let mut tree = PropTree::new();
        tree.set("nums", PropNode::array().with_item(PropNode::number(1.0)))
            .unwrap();
        tree.set("bad", PropNode::number(f64::NAN)).unwrap();

        let flat = flatten_tree_to_legacy_map(&tree);
        assert_eq!(flat["nums"].value, json!("[1]"));
        assert_eq!(flat["bad"].value, serde_json::Value::Null);

        let back = migrate_flat_map_to_tree(&flat);
        assert_eq!(back.value("nums.0"), Some(1.0.into()));
        assert!(back.value("bad").unwrap().as_number().unwrap().is_nan());
    }
}
