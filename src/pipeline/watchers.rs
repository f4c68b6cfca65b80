//! Watcher engine.
//!
//! A watcher is a side-effect script attached to a primitive node. Watchers
//! run when their node's value differs from the previous snapshot, or when
//! there is no previous value to compare with. Every call captures a fresh
//! snapshot for the next one.

use crate::scripting::{ScriptBindings, ScriptEngine};
use crate::tree::PropTree;
use crate::types::PropValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat `path -> value` map of every primitive node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, PropValue>);

impl Snapshot {
    /// Capture the current value of every primitive node
    pub fn capture(tree: &PropTree) -> Self {
        Self(
            tree.primitives()
                .into_iter()
                .filter_map(|(path, node)| node.value().map(|v| (path, v)))
                .collect(),
        )
    }

    pub fn get(&self, path: &str) -> Option<&PropValue> {
        self.0.get(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropValue)> {
        self.0.iter()
    }
}

/// A watcher script that failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatcherFailure {
    pub path: String,
    /// Position of the watcher in the node's list
    pub index: usize,
    pub message: String,
}

/// Result of one watcher pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WatcherResult {
    /// Paths whose watchers ran, in traversal order
    pub triggered: Vec<String>,
    /// Snapshot to pass to the next call
    pub snapshot: Snapshot,
    /// Scripts executed
    pub runs: usize,
    pub failures: Vec<WatcherFailure>,
}

/// Run the watchers of every node whose value changed since `previous`.
pub fn run_watchers(engine: &ScriptEngine, tree: &PropTree, previous: Option<&Snapshot>) -> WatcherResult {
    let snapshot = Snapshot::capture(tree);
    let mut result = WatcherResult::default();
    engine.load_tree(tree);

    for (path, node) in tree.primitives() {
        if node.meta.watchers.is_empty() {
            continue;
        }
        let Some(value) = node.value() else {
            continue;
        };
        let before = previous.and_then(|p| p.get(&path));
        if before.is_some_and(|b| b.same_value(&value)) {
            continue;
        }

        tracing::trace!("Running {} watchers for '{}'", node.meta.watchers.len(), path);
        result.triggered.push(path.clone());

        let bindings = ScriptBindings::new()
            .with_value("value", Some(&value))
            .with_value("previous", before)
            .with_path(&path);

        for (index, watcher) in node.meta.watchers.iter().enumerate() {
            result.runs += 1;
            if let Err(e) = engine.eval(&watcher.script, &bindings) {
                tracing::warn!("Watcher {} at '{}' failed: {}", index, path, e);
                result.failures.push(WatcherFailure {
                    path: path.clone(),
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    engine.unload_tree();
    tracing::debug!(
        "Watchers: {} nodes triggered, {} runs, {} failures",
        result.triggered.len(),
        result.runs,
        result.failures.len()
    );

    result.snapshot = snapshot;
    result
}
