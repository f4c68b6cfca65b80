//! # user-props: Reactive Property Trees
//!
//! A typed, hierarchical property tree per editable object, with computed
//! expressions, validation rules and change-triggered watcher scripts. Every
//! edit is followed by one pipeline run that brings the tree back to a
//! consistent state.
//!
//! ## Architecture
//!
//! - **Tree**: node model, path primitives, legacy migration, reference
//!   binding and versioned import/export
//! - **Scripting**: sandboxed Rhai engine shared by expressions, custom rules
//!   and watchers, with an operation budget and a wall-clock deadline
//! - **Pipeline**: dependency graph, expression evaluator, validation and
//!   watchers, sequenced by [`PropsPipeline`]
//! - **Runtime**: process-wide telemetry counters and event bus
//!
//! ## Configuration
//!
//! Engine limits are read from a TOML file (see [`config::PropsConfig`]);
//! every field has a default.
//!
//! ## Example
//!
//! ```ignore
//! use user_props::{PropNode, PropTree, PropsConfig, PropsPipeline};
//!
//! let mut tree = PropTree::new();
//! tree.set("a", PropNode::number(2.0))?;
//! tree.set("b", PropNode::number(3.0))?;
//! tree.set("sum", PropNode::number(0.0).with_expression("get('a') + get('b')"))?;
//!
//! let mut pipeline = PropsPipeline::new(PropsConfig::default());
//! let outcome = pipeline.evaluate_pipeline(&mut tree, None);
//! assert_eq!(outcome.expr_changes, vec!["sum"]);
//!
//! // Feed the snapshot back so watchers only fire on changes
//! let next = pipeline.evaluate_pipeline(&mut tree, Some(outcome.snapshot()));
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod runtime;
pub mod scripting;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use config::PropsConfig;
pub use error::{ImportError, PathError, PropsError, Result};
pub use pipeline::{
    build_expression_dependency_graph, evaluate_pipeline, PipelineOutcome, PropsPipeline, Snapshot,
};
pub use runtime::{
    on_user_props_event, reset_user_props_telemetry, user_props_telemetry, PropsRuntime,
    TelemetrySnapshot, UserPropsEvent,
};
pub use scripting::ScriptEngine;
pub use tree::{create_node, NodeMeta, NodeOptions, PropNode, PropTree};
pub use types::{NodeType, PropValue};
