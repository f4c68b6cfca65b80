//! Component-property references.
//!
//! A node bound with [`bind_user_prop_to_component_prop`] mirrors a property
//! of another component. The host supplies a [`PropResolver`] and calls
//! [`traverse_and_sync_references`] to pull current values in.

use super::{PropNode, PropTree, RefBinding};
use crate::error::PathError;
use crate::types::PropValue;
use tracing::trace;

/// Looks up the current value of a component property
#[cfg_attr(test, mockall::automock)]
pub trait PropResolver {
    fn resolve(&mut self, source_id: &str, prop_name: &str) -> Option<PropValue>;
}

impl<F> PropResolver for F
where
    F: FnMut(&str, &str) -> Option<PropValue>,
{
    fn resolve(&mut self, source_id: &str, prop_name: &str) -> Option<PropValue> {
        self(source_id, prop_name)
    }
}

/// Mark the primitive at `path` as bound and seed it with `initial_value`.
///
/// A missing node is created with the type of `initial_value`; an existing
/// primitive keeps its type and the seed is coerced into it.
pub fn bind_user_prop_to_component_prop(
    tree: &mut PropTree,
    path: &str,
    source_id: &str,
    prop_name: &str,
    initial_value: PropValue,
) -> Result<(), PathError> {
    let binding = RefBinding {
        source_id: source_id.to_string(),
        prop_name: prop_name.to_string(),
    };
    match tree.get_mut(path) {
        Some(node) if !node.is_primitive() => Err(PathError::NotPrimitive(path.to_string())),
        Some(node) => {
            if let Some(value) = initial_value.coerce_to(node.node_type()) {
                node.set_value(value);
            }
            node.meta.binding = Some(binding);
            Ok(())
        }
        None => {
            let mut node = PropNode::primitive(initial_value);
            node.meta.binding = Some(binding);
            tree.set(path, node)
        }
    }
}

/// Drop the binding of the node at `path`. Returns true if one was removed.
pub fn unbind_user_prop(tree: &mut PropTree, path: &str) -> bool {
    tree.get_mut(path)
        .and_then(|node| node.meta.binding.take())
        .is_some()
}

/// Refresh every bound node from `resolver`, returning the changed paths.
///
/// Unresolvable bindings and values that cannot be coerced into the node
/// type are skipped.
pub fn sync_references<R: PropResolver + ?Sized>(tree: &mut PropTree, resolver: &mut R) -> Vec<String> {
    let bound: Vec<(String, RefBinding)> = tree
        .primitives()
        .into_iter()
        .filter_map(|(path, node)| node.meta.binding.clone().map(|b| (path, b)))
        .collect();

    let mut changed = Vec::new();
    for (path, binding) in bound {
        let Some(node) = tree.get_mut(&path) else {
            continue;
        };
        let Some(resolved) = resolver
            .resolve(&binding.source_id, &binding.prop_name)
            .and_then(|v| v.coerce_to(node.node_type()))
        else {
            continue;
        };
        let unchanged = node.value().is_some_and(|current| current.same_value(&resolved));
        if !unchanged {
            trace!(path = %path, source = %binding.source_id, "Reference updated");
            node.set_value(resolved);
            changed.push(path);
        }
    }
    changed
}

/// Refresh every bound node; true if any value changed
pub fn traverse_and_sync_references<R: PropResolver + ?Sized>(tree: &mut PropTree, resolver: &mut R) -> bool {
    !sync_references(tree, resolver).is_empty()
}
