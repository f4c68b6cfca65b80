//! Pipeline-specific error types.
//!
//! None of these escape the pipeline. An [`ExpressionError`] is stored on
//! its node as `meta.expressionError` and counted; the previous value stays.

use crate::scripting::ScriptError;
use crate::types::NodeType;
use thiserror::Error;

/// Why a single expression node could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("circular dependency involving '{path}'")]
    CircularDependency { path: String },

    #[error("expression produced no value")]
    NoValue,

    #[error("cannot convert '{value}' to {target}")]
    Coercion { value: String, target: NodeType },
}
