//! Hierarchical user-property tree.
//!
//! Each editable object owns one [`PropTree`]. The root is always an
//! `object` node; below it nodes are objects (keyed children), arrays
//! (ordered items) or primitives (string / number / boolean values).
//!
//! ```text
//! (root)                 object
//! +-- price              number   meta.validation = { min: 0 }
//! +-- qty                number
//! +-- total              number   meta.expression = "get('price') * get('qty')"
//! +-- tags               array
//!     +-- 0              string
//! ```
//!
//! Nodes are addressed by dot-separated paths (`"tags.0"`). All mutation
//! goes through the primitives on [`PropTree`]; the pipeline only ever
//! rewrites primitive values.
//!
//! ## Wire format
//!
//! ```json
//! { "type": "object", "children": {
//!     "total": { "type": "number", "value": 10,
//!                "meta": { "expression": "get('price') * get('qty')" } } } }
//! ```

pub mod binding;
pub mod legacy;
pub mod path;
pub mod persist;

pub use binding::{
    bind_user_prop_to_component_prop, sync_references, traverse_and_sync_references,
    unbind_user_prop, PropResolver,
};
pub use legacy::{flatten_tree_to_legacy_map, migrate_flat_map_to_tree, LegacyFlatMap, LegacyProp};
pub use persist::{ensure_tree, export_tree, import_tree, ExportedTree, PropsContainer, SCHEMA_VERSION};

use crate::error::PathError;
use crate::types::{NodeType, PropValue};
use indexmap::IndexMap;
use path::{is_valid_key, join_path, parse_index, split_path};
use serde::{Deserialize, Deserializer, Serialize};

// ==================== Meta ====================

/// Marks a node's value as driven by a component property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefBinding {
    pub source_id: String,
    pub prop_name: String,
}

/// Validation rule set. Rules are checked in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regular expression source, applied to string nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Snippet receiving `value`; `false` or a string signals failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
    /// Replaces the built-in message of the first four rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A side-effect script run when its node's value changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherSpec {
    pub script: String,
}

impl WatcherSpec {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

/// Behavioral metadata attached to a node. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
    /// Source of the computed value (primitive nodes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Last evaluation failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRules>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watchers: Vec<WatcherSpec>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub binding: Option<RefBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Owned by the global store; carried through untouched
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub global: bool,
    /// Alias key in the global store; carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_key: Option<String>,
}

impl NodeMeta {
    pub fn is_empty(&self) -> bool {
        *self == NodeMeta::default()
    }
}

// ==================== Node ====================

/// Storage of a node, tagged by its `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Object {
        #[serde(default)]
        children: IndexMap<String, PropNode>,
    },
    Array {
        #[serde(default)]
        items: Vec<PropNode>,
    },
    String {
        #[serde(default)]
        value: String,
    },
    Number {
        #[serde(default, deserialize_with = "deserialize_number")]
        value: f64,
    },
    Boolean {
        #[serde(default)]
        value: bool,
    },
}

/// Non-finite numbers are written as `null`; read them back as `NaN`.
fn deserialize_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl NodeKind {
    fn from_value(value: PropValue) -> Self {
        match value {
            PropValue::String(value) => NodeKind::String { value },
            PropValue::Number(value) => NodeKind::Number { value },
            PropValue::Boolean(value) => NodeKind::Boolean { value },
        }
    }
}

/// A single node of the property tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropNode {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "NodeMeta::is_empty")]
    pub meta: NodeMeta,
}

/// Options for [`create_node`]
#[derive(Debug, Clone, Default)]
pub struct NodeOptions {
    /// Initial value, coerced to the node type
    pub value: Option<PropValue>,
    pub meta: NodeMeta,
}

/// Build a node with the type's default value unless `opts.value` overrides it.
///
/// A value of another primitive type is coerced; if coercion fails the
/// default is kept. Values are ignored for containers.
pub fn create_node(node_type: NodeType, opts: NodeOptions) -> PropNode {
    let mut node = PropNode::new(node_type);
    if let Some(value) = opts.value.and_then(|v| v.coerce_to(node_type)) {
        node.kind = NodeKind::from_value(value);
    }
    node.meta = opts.meta;
    node
}

impl PropNode {
    /// A node of the given type holding its default value
    pub fn new(node_type: NodeType) -> Self {
        let kind = match node_type {
            NodeType::Object => NodeKind::Object {
                children: IndexMap::new(),
            },
            NodeType::Array => NodeKind::Array { items: Vec::new() },
            NodeType::String => NodeKind::String {
                value: String::new(),
            },
            NodeType::Number => NodeKind::Number { value: 0.0 },
            NodeType::Boolean => NodeKind::Boolean { value: false },
        };
        Self {
            kind,
            meta: NodeMeta::default(),
        }
    }

    pub fn object() -> Self {
        Self::new(NodeType::Object)
    }

    pub fn array() -> Self {
        Self::new(NodeType::Array)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::primitive(PropValue::String(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Self::primitive(PropValue::Number(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::primitive(PropValue::Boolean(value))
    }

    pub fn primitive(value: PropValue) -> Self {
        Self {
            kind: NodeKind::from_value(value),
            meta: NodeMeta::default(),
        }
    }

    /// Builder: attach an expression
    pub fn with_expression(mut self, source: impl Into<String>) -> Self {
        self.meta.expression = Some(source.into());
        self
    }

    /// Builder: attach validation rules
    pub fn with_validation(mut self, rules: ValidationRules) -> Self {
        self.meta.validation = Some(rules);
        self
    }

    /// Builder: append a watcher script
    pub fn with_watcher(mut self, script: impl Into<String>) -> Self {
        self.meta.watchers.push(WatcherSpec::new(script));
        self
    }

    /// Builder: insert a child (objects only; ignored otherwise)
    pub fn with_child(mut self, key: impl Into<String>, child: PropNode) -> Self {
        if let NodeKind::Object { children } = &mut self.kind {
            children.insert(key.into(), child);
        }
        self
    }

    /// Builder: append an item (arrays only; ignored otherwise)
    pub fn with_item(mut self, item: PropNode) -> Self {
        if let NodeKind::Array { items } = &mut self.kind {
            items.push(item);
        }
        self
    }

    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Object { .. } => NodeType::Object,
            NodeKind::Array { .. } => NodeType::Array,
            NodeKind::String { .. } => NodeType::String,
            NodeKind::Number { .. } => NodeType::Number,
            NodeKind::Boolean { .. } => NodeType::Boolean,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.node_type().is_primitive()
    }

    /// Primitive, or a container with nothing in it
    pub fn is_leaf(&self) -> bool {
        match &self.kind {
            NodeKind::Object { children } => children.is_empty(),
            NodeKind::Array { items } => items.is_empty(),
            _ => true,
        }
    }

    /// The value of a primitive node
    pub fn value(&self) -> Option<PropValue> {
        match &self.kind {
            NodeKind::String { value } => Some(PropValue::String(value.clone())),
            NodeKind::Number { value } => Some(PropValue::Number(*value)),
            NodeKind::Boolean { value } => Some(PropValue::Boolean(*value)),
            _ => None,
        }
    }

    /// Replace the value of a primitive node, keeping its meta.
    ///
    /// The node takes the type of `value`. Returns false (and changes nothing)
    /// on containers.
    pub fn set_value(&mut self, value: PropValue) -> bool {
        if !self.is_primitive() {
            return false;
        }
        self.kind = NodeKind::from_value(value);
        true
    }

    pub fn children(&self) -> Option<&IndexMap<String, PropNode>> {
        match &self.kind {
            NodeKind::Object { children } => Some(children),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[PropNode]> {
        match &self.kind {
            NodeKind::Array { items } => Some(items),
            _ => None,
        }
    }

    fn child_segment(&self, segment: &str) -> Option<&PropNode> {
        match &self.kind {
            NodeKind::Object { children } => children.get(segment),
            NodeKind::Array { items } => parse_index(segment).and_then(|i| items.get(i)),
            _ => None,
        }
    }

    fn child_segment_mut(&mut self, segment: &str) -> Option<&mut PropNode> {
        match &mut self.kind {
            NodeKind::Object { children } => children.get_mut(segment),
            NodeKind::Array { items } => parse_index(segment).and_then(|i| items.get_mut(i)),
            _ => None,
        }
    }

    /// Structural JSON of this node (values only, no meta)
    pub fn to_json(&self) -> serde_json::Value {
        match &self.kind {
            NodeKind::Object { children } => serde_json::Value::Object(
                children
                    .iter()
                    .map(|(k, child)| (k.clone(), child.to_json()))
                    .collect(),
            ),
            NodeKind::Array { items } => {
                serde_json::Value::Array(items.iter().map(PropNode::to_json).collect())
            }
            _ => self
                .value()
                .map(|v| v.to_json())
                .unwrap_or(serde_json::Value::Null),
        }
    }

    /// Build a node tree from plain JSON. `null` becomes an empty string.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => {
                let children = map
                    .iter()
                    .filter(|(k, _)| {
                        let valid = is_valid_key(k);
                        if !valid {
                            tracing::warn!(key = %k, "Skipping object key that no path can address");
                        }
                        valid
                    })
                    .map(|(k, v)| (k.clone(), PropNode::from_json(v)))
                    .collect();
                PropNode {
                    kind: NodeKind::Object { children },
                    meta: NodeMeta::default(),
                }
            }
            serde_json::Value::Array(values) => PropNode {
                kind: NodeKind::Array {
                    items: values.iter().map(PropNode::from_json).collect(),
                },
                meta: NodeMeta::default(),
            },
            other => PropNode::primitive(
                PropValue::from_json(other).unwrap_or(PropValue::String(String::new())),
            ),
        }
    }

    /// Check the invariants of this subtree, reporting the first violation.
    pub fn check_invariants(&self, path: &str) -> Result<(), PathError> {
        if !self.is_primitive() && self.meta.expression.is_some() {
            return Err(PathError::ExpressionOnContainer(path.to_string()));
        }
        match &self.kind {
            NodeKind::Object { children } => {
                for (key, child) in children {
                    let child_path = join_path(path, key);
                    if !is_valid_key(key) {
                        return Err(PathError::Malformed(child_path));
                    }
                    child.check_invariants(&child_path)?;
                }
            }
            NodeKind::Array { items } => {
                for (i, item) in items.iter().enumerate() {
                    item.check_invariants(&join_path(path, &i.to_string()))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

// ==================== Traversal ====================

/// Options for [`PropTree::list_paths`]
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    /// Only yield leaves (primitives and empty containers)
    pub leaves_only: bool,
    /// Yield non-empty containers as well
    pub include_containers: bool,
    /// Skip nodes flagged `global` and everything below them
    pub filter_global: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            leaves_only: false,
            include_containers: true,
            filter_global: false,
        }
    }
}

impl ListOptions {
    /// Every node
    pub fn all() -> Self {
        Self::default()
    }

    /// Primitives and empty containers
    pub fn leaves() -> Self {
        Self {
            leaves_only: true,
            ..Self::default()
        }
    }
}

/// One entry yielded by [`PropTree::list_paths`]
#[derive(Debug, Clone)]
pub struct PathEntry<'a> {
    pub path: String,
    pub node: &'a PropNode,
    pub node_type: NodeType,
    pub is_leaf: bool,
}

fn walk<'a>(node: &'a PropNode, path: &str, opts: ListOptions, out: &mut Vec<PathEntry<'a>>) {
    match &node.kind {
        NodeKind::Object { children } => {
            for (key, child) in children {
                visit(child, join_path(path, key), opts, out);
            }
        }
        NodeKind::Array { items } => {
            for (i, item) in items.iter().enumerate() {
                visit(item, join_path(path, &i.to_string()), opts, out);
            }
        }
        _ => {}
    }
}

fn visit<'a>(node: &'a PropNode, path: String, opts: ListOptions, out: &mut Vec<PathEntry<'a>>) {
    if opts.filter_global && node.meta.global {
        return;
    }
    let is_leaf = node.is_leaf();
    let include = if opts.leaves_only {
        is_leaf
    } else {
        is_leaf || opts.include_containers
    };
    if include {
        out.push(PathEntry {
            path: path.clone(),
            node,
            node_type: node.node_type(),
            is_leaf,
        });
    }
    walk(node, &path, opts, out);
}

// ==================== Tree ====================

/// A property tree. The root is always an `object` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PropNode", into = "PropNode")]
pub struct PropTree {
    root: PropNode,
}

impl Default for PropTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<PropNode> for PropTree {
    type Error = PathError;

    fn try_from(root: PropNode) -> Result<Self, Self::Error> {
        Self::from_root(root)
    }
}

impl From<PropTree> for PropNode {
    fn from(tree: PropTree) -> Self {
        tree.root
    }
}

impl PropTree {
    /// An empty tree
    pub fn new() -> Self {
        Self {
            root: PropNode::object(),
        }
    }

    /// Wrap an existing root node, checking the tree invariants
    pub fn from_root(root: PropNode) -> Result<Self, PathError> {
        let tree = Self { root };
        tree.check_invariants()?;
        Ok(tree)
    }

    pub fn root(&self) -> &PropNode {
        &self.root
    }

    /// Number of nodes below the root
    pub fn len(&self) -> usize {
        self.list_paths(ListOptions::all()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_leaf()
    }

    /// Report the first invariant violation in the tree
    pub fn check_invariants(&self) -> Result<(), PathError> {
        if !matches!(self.root.kind, NodeKind::Object { .. }) {
            return Err(PathError::RootMustBeObject);
        }
        self.root.check_invariants("")
    }

    /// Resolve a path. Missing or malformed paths yield `None`.
    pub fn get(&self, path: &str) -> Option<&PropNode> {
        let segments = split_path(path).ok()?;
        let mut current = &self.root;
        for segment in segments {
            current = current.child_segment(segment)?;
        }
        Some(current)
    }

    /// Resolve a path mutably. Missing or malformed paths yield `None`.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut PropNode> {
        let segments = split_path(path).ok()?;
        let mut current = &mut self.root;
        for segment in segments {
            current = current.child_segment_mut(segment)?;
        }
        Some(current)
    }

    /// Value of the primitive at `path`
    pub fn value(&self, path: &str) -> Option<PropValue> {
        self.get(path).and_then(PropNode::value)
    }

    /// Walk `segments` from the root, creating empty objects where missing.
    fn vivify(&mut self, segments: &[&str], full_path: &str) -> Result<&mut PropNode, PathError> {
        let mut current = &mut self.root;
        for segment in segments {
            current = match &mut current.kind {
                NodeKind::Object { children } => children
                    .entry(segment.to_string())
                    .or_insert_with(PropNode::object),
                NodeKind::Array { items } => {
                    let index = parse_index(segment).ok_or_else(|| PathError::InvalidIndex {
                        path: full_path.to_string(),
                        segment: segment.to_string(),
                    })?;
                    if index == items.len() {
                        items.push(PropNode::object());
                    }
                    let len = items.len();
                    items
                        .get_mut(index)
                        .ok_or_else(|| PathError::IndexOutOfBounds {
                            path: full_path.to_string(),
                            index,
                            len,
                        })?
                }
                _ => {
                    return Err(PathError::TraverseIntoPrimitive {
                        path: full_path.to_string(),
                        segment: segment.to_string(),
                    })
                }
            };
        }
        Ok(current)
    }

    /// Write `node` at `path`, creating intermediate objects.
    ///
    /// Under an array the last segment must be an existing index (replace)
    /// or the array length (append). The empty path replaces the root.
    pub fn set(&mut self, path: &str, node: PropNode) -> Result<(), PathError> {
        node.check_invariants(path)?;
        let segments = split_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            if !matches!(node.kind, NodeKind::Object { .. }) {
                return Err(PathError::RootMustBeObject);
            }
            self.root = node;
            return Ok(());
        };

        let parent = self.vivify(parents, path)?;
        match &mut parent.kind {
            NodeKind::Object { children } => {
                children.insert(last.to_string(), node);
                Ok(())
            }
            NodeKind::Array { items } => {
                let index = parse_index(last).ok_or_else(|| PathError::InvalidIndex {
                    path: path.to_string(),
                    segment: last.to_string(),
                })?;
                let len = items.len();
                if index < len {
                    items[index] = node;
                } else if index == len {
                    items.push(node);
                } else {
                    return Err(PathError::IndexOutOfBounds {
                        path: path.to_string(),
                        index,
                        len,
                    });
                }
                Ok(())
            }
            _ => Err(PathError::TraverseIntoPrimitive {
                path: path.to_string(),
                segment: last.to_string(),
            }),
        }
    }

    /// Remove the node at `path` with its descendants.
    ///
    /// Returns the removed node; missing, malformed and empty paths are a no-op.
    pub fn delete(&mut self, path: &str) -> Option<PropNode> {
        split_path(path).ok()?;
        let (parent_path, key) = path::parent_and_key(path)?;
        let parent = self.get_mut(parent_path)?;
        match &mut parent.kind {
            NodeKind::Object { children } => children.shift_remove(key),
            NodeKind::Array { items } => {
                let index = parse_index(key)?;
                (index < items.len()).then(|| items.remove(index))
            }
            _ => None,
        }
    }

    /// Create an empty object named `key` under `parent`. Fails if the key is taken.
    pub fn create_object_child(&mut self, parent: &str, key: &str) -> Result<&mut PropNode, PathError> {
        let path = join_path(parent, key);
        if key.is_empty() || key.contains('.') {
            return Err(PathError::Malformed(path));
        }
        if self.get(&path).is_some() {
            return Err(PathError::AlreadyExists(path));
        }
        self.set(&path, PropNode::object())?;
        self.get_mut(&path).ok_or(PathError::NotFound(path))
    }

    /// Append `node` to the array at `path`, returning its index
    pub fn push_array_item(&mut self, path: &str, node: PropNode) -> Result<usize, PathError> {
        let target = self
            .get_mut(path)
            .ok_or_else(|| PathError::NotFound(path.to_string()))?;
        let NodeKind::Array { items } = &mut target.kind else {
            return Err(PathError::NotAnArray(path.to_string()));
        };
        node.check_invariants(&join_path(path, &items.len().to_string()))?;
        items.push(node);
        Ok(items.len() - 1)
    }

    /// Set a primitive value, creating the node (and its parents) if missing.
    ///
    /// An existing primitive keeps its meta and takes the type of `value`.
    pub fn set_primitive(&mut self, path: &str, value: PropValue) -> Result<(), PathError> {
        if let Some(node) = self.get_mut(path) {
            if node.set_value(value) {
                return Ok(());
            }
            return Err(PathError::NotPrimitive(path.to_string()));
        }
        self.set(path, PropNode::primitive(value))
    }

    /// Depth-first listing of the tree (the root itself is not listed)
    pub fn list_paths(&self, opts: ListOptions) -> Vec<PathEntry<'_>> {
        let mut out = Vec::new();
        walk(&self.root, "", opts, &mut out);
        out
    }

    /// Every primitive node with its path, in traversal order
    pub fn primitives(&self) -> Vec<(String, &PropNode)> {
        self.list_paths(ListOptions::leaves())
            .into_iter()
            .filter(|e| e.node_type.is_primitive())
            .map(|e| (e.path, e.node))
            .collect()
    }

    /// Move one array element from `from` to `to`.
    ///
    /// `from == to` returns before touching the array, so the element
    /// storage and order are left exactly as they were.
    pub fn reorder_array_item(&mut self, path: &str, from: usize, to: usize) -> Result<(), PathError> {
        let node = self
            .get_mut(path)
            .ok_or_else(|| PathError::NotFound(path.to_string()))?;
        let NodeKind::Array { items } = &mut node.kind else {
            return Err(PathError::NotAnArray(path.to_string()));
        };
        let len = items.len();
        for index in [from, to] {
            if index >= len {
                return Err(PathError::IndexOutOfBounds {
                    path: path.to_string(),
                    index,
                    len,
                });
            }
        }
        if from == to {
            return Ok(());
        }
        let item = items.remove(from);
        items.insert(to, item);
        Ok(())
    }

    /// Attach an expression to the primitive at `path`, clearing any stale error.
    ///
    /// Does not evaluate it; the pipeline does.
    pub fn set_expression(&mut self, path: &str, source: impl Into<String>) -> Result<(), PathError> {
        let node = self.primitive_mut(path)?;
        node.meta.expression = Some(source.into());
        node.meta.expression_error = None;
        Ok(())
    }

    /// Remove the expression (and its error) from the primitive at `path`
    pub fn clear_expression(&mut self, path: &str) -> Result<(), PathError> {
        let node = self.primitive_mut(path)?;
        node.meta.expression = None;
        node.meta.expression_error = None;
        Ok(())
    }

    fn primitive_mut(&mut self, path: &str) -> Result<&mut PropNode, PathError> {
        let node = self
            .get_mut(path)
            .ok_or_else(|| PathError::NotFound(path.to_string()))?;
        if !node.is_primitive() {
            return Err(PathError::ExpressionOnContainer(path.to_string()));
        }
        Ok(node)
    }
}

/// Free-function form of [`PropTree::get`]
pub fn get_node_at_path<'a>(tree: &'a PropTree, path: &str) -> Option<&'a PropNode> {
    tree.get(path)
}

/// Free-function form of [`PropTree::set`]
pub fn set_node_at_path(tree: &mut PropTree, path: &str, node: PropNode) -> Result<(), PathError> {
    tree.set(path, node)
}

/// Free-function form of [`PropTree::delete`]
pub fn delete_at_path(tree: &mut PropTree, path: &str) -> Option<PropNode> {
    tree.delete(path)
}

/// Free-function form of [`PropTree::set_expression`]
pub fn set_expression_at_path(tree: &mut PropTree, path: &str, source: &str) -> Result<(), PathError> {
    tree.set_expression(path, source)
}

/// Free-function form of [`PropTree::clear_expression`]
pub fn clear_expression(tree: &mut PropTree, path: &str) -> Result<(), PathError> {
    tree.clear_expression(path)
}
