//! Expression evaluator.
//!
//! Every primitive node carrying `meta.expression` is recomputed from the
//! other nodes of the tree. Nodes run in dependency-level order and full
//! passes repeat until no value changes, which also settles dependencies the
//! lexical scan could not see (computed `get()` paths).
//!
//! Failures never escape: they are written to the node's `expressionError`
//! and the previous value is kept.

use crate::config::EvaluationSettings;
use crate::pipeline::error::ExpressionError;
use crate::pipeline::graph::build_expression_dependency_graph;
use crate::scripting::{dynamic_to_prop, ScriptBindings, ScriptEngine};
use crate::tree::PropTree;
use crate::types::{NodeType, PropValue};
use indexmap::IndexMap;
use serde::Serialize;

/// Result of one evaluator call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionReport {
    /// Nodes whose value differs from the start of the call, in traversal order
    pub changes: Vec<String>,
    /// Expression nodes visited across all passes. A circular node counts
    /// once as evaluated to its error, so any tree with an expression
    /// reports at least one evaluation.
    pub evaluations: usize,
    /// Nodes skipped as members of a cycle; included in `evaluations`
    pub circular: usize,
    /// Nodes left with an error, with the message stored on the node
    pub errors: IndexMap<String, String>,
    /// Full passes performed
    pub passes: usize,
    /// False when the pass ceiling was hit while values were still changing
    pub converged: bool,
}

/// An expression node scheduled for evaluation
struct Scheduled {
    path: String,
    source: String,
    target: NodeType,
    start: Option<PropValue>,
    level: usize,
    order: usize,
}

/// Evaluate every expression in `tree`, writing results in place.
pub fn evaluate_expressions(
    engine: &ScriptEngine,
    tree: &mut PropTree,
    settings: &EvaluationSettings,
) -> ExpressionReport {
    let graph = build_expression_dependency_graph(tree);

    let mut scheduled: Vec<Scheduled> = tree
        .primitives()
        .into_iter()
        .enumerate()
        .filter_map(|(order, (path, node))| {
            let source = node.meta.expression.clone()?;
            Some(Scheduled {
                level: graph.level_of(&path).unwrap_or(0),
                target: node.node_type(),
                start: node.value(),
                source,
                path,
                order,
            })
        })
        .collect();
    scheduled.sort_by_key(|s| (s.level, s.order));

    let mut report = ExpressionReport {
        converged: true,
        ..Default::default()
    };
    if scheduled.is_empty() {
        return report;
    }

    let mut outcome: IndexMap<String, Option<String>> = IndexMap::new();
    let (cyclic, runnable): (Vec<&Scheduled>, Vec<&Scheduled>) =
        scheduled.iter().partition(|s| graph.is_cyclic(&s.path));

    for node in &cyclic {
        let err = ExpressionError::CircularDependency {
            path: node.path.clone(),
        };
        tracing::warn!("Skipping expression at '{}': {}", node.path, err);
        set_error(tree, &node.path, Some(err.to_string()));
        outcome.insert(node.path.clone(), Some(err.to_string()));
        report.evaluations += 1;
        report.circular += 1;
    }

    engine.load_tree(tree);
    let mut converged = runnable.is_empty();

    while !runnable.is_empty() && report.passes < settings.max_passes {
        report.passes += 1;
        let mut changed = false;

        for node in &runnable {
            report.evaluations += 1;
            match evaluate_node(engine, &node.path, &node.source, node.target) {
                Ok(value) => {
                    tracing::trace!("Expression '{}' -> {}", node.path, value);
                    let current = tree.value(&node.path);
                    if !current.is_some_and(|c| c.same_value(&value)) {
                        if let Some(target) = tree.get_mut(&node.path) {
                            target.set_value(value.clone());
                        }
                        engine.update_value(&node.path, value);
                        changed = true;
                    }
                    set_error(tree, &node.path, None);
                    outcome.insert(node.path.clone(), None);
                }
                Err(err) => {
                    tracing::warn!("Expression at '{}' failed: {}", node.path, err);
                    set_error(tree, &node.path, Some(err.to_string()));
                    outcome.insert(node.path.clone(), Some(err.to_string()));
                }
            }
        }

        if !changed {
            converged = true;
            break;
        }
    }

    engine.unload_tree();

    if !converged {
        tracing::warn!(
            "Expressions did not settle after {} passes; values may be stale",
            report.passes
        );
    }
    report.converged = converged;

    // Report in traversal order regardless of level ordering
    scheduled.sort_by_key(|s| s.order);
    for node in &scheduled {
        let now = tree.value(&node.path);
        let same = match (&node.start, &now) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        };
        if !same {
            report.changes.push(node.path.clone());
        }
        if let Some(Some(message)) = outcome.get(&node.path) {
            report.errors.insert(node.path.clone(), message.clone());
        }
    }

    tracing::debug!(
        "Evaluated {} expressions in {} passes: {} changed, {} failed",
        scheduled.len(),
        report.passes,
        report.changes.len(),
        report.errors.len()
    );

    report
}

/// Run one expression and coerce its result into the node's type
fn evaluate_node(
    engine: &ScriptEngine,
    path: &str,
    source: &str,
    target: NodeType,
) -> Result<PropValue, ExpressionError> {
    let snippet = engine.compile(source)?;
    let result = engine.execute(&snippet, &ScriptBindings::new().with_path(path))?;
    let value = dynamic_to_prop(&result).ok_or(ExpressionError::NoValue)?;
    value.coerce_to(target).ok_or_else(|| ExpressionError::Coercion {
        value: value.to_string(),
        target,
    })
}

fn set_error(tree: &mut PropTree, path: &str, error: Option<String>) {
    if let Some(node) = tree.get_mut(path) {
        node.meta.expression_error = error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptLimits;
    use crate::tree::PropNode;

    fn settings() -> EvaluationSettings {
        EvaluationSettings::default()
    }

    fn sum_tree() -> PropTree {
        let mut tree = PropTree::new();
        tree.set("a", PropNode::number(2.0)).unwrap();
        tree.set("b", PropNode::number(3.0)).unwrap();
        tree.set(
            "sum",
            PropNode::number(0.0).with_expression("get('a') + get('b')"),
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_simple_sum() {
        let engine = ScriptEngine::new();
        let mut tree = sum_tree();

        let report = evaluate_expressions(&engine, &mut tree, &settings());
        assert_eq!(report.changes, vec!["sum"]);
        assert_eq!(tree.value("sum"), Some(PropValue::Number(5.0)));
        assert!(report.converged);
        assert!(report.errors.is_empty());

        let report = evaluate_expressions(&engine, &mut tree, &settings());
        assert!(report.changes.is_empty());
        assert_eq!(report.passes, 1);
    }

    #[test]
    fn test_chain_settles_in_one_call() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        // declared before their inputs so level ordering matters
        tree.set("c", PropNode::number(0.0).with_expression("get('b') * 2"))
            .unwrap();
        tree.set("b", PropNode::number(0.0).with_expression("get('a') + 1"))
            .unwrap();
        tree.set("a", PropNode::number(4.0)).unwrap();

        let report = evaluate_expressions(&engine, &mut tree, &settings());
        assert_eq!(tree.value("b"), Some(PropValue::Number(5.0)));
        assert_eq!(tree.value("c"), Some(PropValue::Number(10.0)));
        assert_eq!(report.changes, vec!["c", "b"]);
        assert_eq!(report.passes, 2);
    }

    #[test]
    fn test_dynamic_dependency_settles_by_passes() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        tree.set("x", PropNode::number(0.0).with_expression("get('y' + '') + 1"))
            .unwrap();
        tree.set("y", PropNode::number(0.0).with_expression("get('z') * 10"))
            .unwrap();
        tree.set("z", PropNode::number(3.0)).unwrap();

        let report = evaluate_expressions(&engine, &mut tree, &settings());
        assert!(report.converged);
        assert_eq!(tree.value("x"), Some(PropValue::Number(31.0)));
    }

    #[test]
    fn test_cycle_is_flagged_and_others_proceed() {
        let engine = ScriptEngine::new();
        let mut tree = sum_tree();
        tree.set("p", PropNode::number(1.0).with_expression("get('q') + 1"))
            .unwrap();
        tree.set("q", PropNode::number(1.0).with_expression("get('p') + 1"))
            .unwrap();

        let report = evaluate_expressions(&engine, &mut tree, &settings());
        assert_eq!(tree.value("sum"), Some(PropValue::Number(5.0)));
        assert_eq!(tree.value("p"), Some(PropValue::Number(1.0)));
        assert_eq!(
            tree.get("p").unwrap().meta.expression_error.as_deref(),
            Some("circular dependency involving 'p'")
        );
        assert!(tree.get("q").unwrap().meta.expression_error.is_some());
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.circular, 2);
        // p and q once each, plus sum for the working pass and the settling pass
        assert_eq!(report.evaluations, 4);
    }

    #[test]
    fn test_non_convergence_is_reported() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        tree.set("a", PropNode::number(0.0).with_expression("get('a' + '') + 1"))
            .unwrap();

        let report = evaluate_expressions(&engine, &mut tree, &EvaluationSettings { max_passes: 4 });
        assert!(!report.converged);
        assert_eq!(report.passes, 4);
        assert_eq!(tree.value("a"), Some(PropValue::Number(4.0)));
    }

    #[test]
    fn test_errors_keep_previous_value() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        tree.set("bad", PropNode::number(7.0).with_expression("get('a') +"))
            .unwrap();
        tree.set("unknown", PropNode::number(1.0).with_expression("frobnicate(1)"))
            .unwrap();
        tree.set("nothing", PropNode::string("keep").with_expression("let x = 1;"))
            .unwrap();

        let report = evaluate_expressions(&engine, &mut tree, &settings());
        assert_eq!(tree.value("bad"), Some(PropValue::Number(7.0)));
        assert_eq!(tree.value("unknown"), Some(PropValue::Number(1.0)));
        assert_eq!(tree.value("nothing"), Some("keep".into()));
        assert_eq!(
            tree.get("nothing").unwrap().meta.expression_error.as_deref(),
            Some("expression produced no value")
        );
        assert_eq!(report.errors.len(), 3);
        assert!(report.changes.is_empty());
    }

    #[test]
    fn test_success_clears_stale_error() {
        let engine = ScriptEngine::new();
        let mut tree = sum_tree();
        tree.get_mut("sum").unwrap().meta.expression_error = Some("old".into());

        evaluate_expressions(&engine, &mut tree, &settings());
        assert!(tree.get("sum").unwrap().meta.expression_error.is_none());
    }

    #[test]
    fn test_result_coercion() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        tree.set("label", PropNode::string("").with_expression("1 + 1"))
            .unwrap();
        tree.set("flag", PropNode::boolean(false).with_expression("'yes'"))
            .unwrap();
        tree.set("parsed", PropNode::number(0.0).with_expression("'42'"))
            .unwrap();
        tree.set("blank", PropNode::number(9.0).with_expression("''"))
            .unwrap();
        tree.set("bad", PropNode::number(9.0).with_expression("'abc'"))
            .unwrap();

        evaluate_expressions(&engine, &mut tree, &settings());
        assert_eq!(tree.value("label"), Some("2".into()));
        assert_eq!(tree.value("flag"), Some(PropValue::Boolean(true)));
        assert_eq!(tree.value("parsed"), Some(PropValue::Number(42.0)));
        assert_eq!(tree.value("blank"), Some(PropValue::Number(0.0)));
        assert_eq!(tree.value("bad"), Some(PropValue::Number(9.0)));
        assert_eq!(
            tree.get("bad").unwrap().meta.expression_error.as_deref(),
            Some("cannot convert 'abc' to number")
        );
    }

    #[test]
    fn test_integer_literals_divide_as_numbers() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        tree.set("half", PropNode::number(0.0).with_expression("7 / 2"))
            .unwrap();
        tree.set("count", PropNode::number(5.0)).unwrap();
        tree.set(
            "share",
            PropNode::number(0.0).with_expression("get('count') / 2"),
        )
        .unwrap();

        let report = evaluate_expressions(&engine, &mut tree, &settings());
        assert!(report.errors.is_empty());
        assert_eq!(tree.value("half"), Some(PropValue::Number(3.5)));
        assert_eq!(tree.value("share"), Some(PropValue::Number(2.5)));
    }

    #[test]
    fn test_runaway_expression_is_contained() {
        let engine = ScriptEngine::with_limits(ScriptLimits {
            max_operations: 5_000,
            ..ScriptLimits::default()
        });
        let mut tree = sum_tree();
        tree.set("spin", PropNode::number(0.0).with_expression("loop { }"))
            .unwrap();

        let report = evaluate_expressions(&engine, &mut tree, &settings());
        assert_eq!(tree.value("sum"), Some(PropValue::Number(5.0)));
        assert_eq!(
            report.errors.get("spin").map(String::as_str),
            Some("script exceeded 5000 operations")
        );
    }

    #[test]
    fn test_expression_reads_path_and_root() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        tree.set("items.first", PropNode::number(4.0)).unwrap();
        tree.set("me", PropNode::string("").with_expression("path"))
            .unwrap();
        tree.set(
            "via_root",
            PropNode::number(0.0).with_expression("root.items.first * 2"),
        )
        .unwrap();

        evaluate_expressions(&engine, &mut tree, &settings());
        assert_eq!(tree.value("me"), Some("me".into()));
        assert_eq!(tree.value("via_root"), Some(PropValue::Number(8.0)));
    }

    #[test]
    fn test_no_expressions() {
        let engine = ScriptEngine::new();
        let mut tree = PropTree::new();
        tree.set("a", PropNode::number(1.0)).unwrap();
        let report = evaluate_expressions(&engine, &mut tree, &settings());
        assert_eq!(report.passes, 0);
        assert_eq!(report.evaluations, 0);
        assert!(report.converged);
    }
}
