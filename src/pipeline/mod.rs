//! Evaluation pipeline over a property tree.
//!
//! Every edit to a tree is followed by one pipeline run:
//!
//! ```text
//! [expressions] ──► [validation] ──► [watchers] ──► telemetry + event
//!       ▲
//!  dependency graph
//! ```
//!
//! # Design
//!
//! - **Transient graph**: dependencies are extracted from expression source
//!   on every run and never stored in the tree.
//! - **Fixpoint passes**: expressions run in level order and repeat until no
//!   value changes, bounded by `evaluation.max_passes`.
//! - **Contained failures**: script errors, cycles and runaway snippets end
//!   up on the node or in the result, never as a panic or an `Err`.

pub mod error;
pub mod executor;
pub mod expressions;
pub mod graph;
pub mod validation;
pub mod watchers;

pub use error::ExpressionError;
pub use executor::{evaluate_pipeline, PipelineMetrics, PipelineOutcome, PropsPipeline};
pub use expressions::{evaluate_expressions, ExpressionReport};
pub use graph::{
    build_expression_dependency_graph, extract_dependencies, DependencyGraph, GraphEdge, GraphNode,
};
pub use validation::{validate_tree, ValidationErrors, Validator};
pub use watchers::{run_watchers, Snapshot, WatcherFailure, WatcherResult};
