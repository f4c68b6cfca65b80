//! Error handling for the user-props engine
//!
//! This module defines the crate-wide error type, the error types raised by
//! tree primitives and by tree import, and a Result alias for use throughout
//! the crate.
//!
//! Pipeline-phase failures (expressions, validation, watchers) are never
//! raised through these types: they are recorded on the tree or in the
//! pipeline outcome instead. See [`crate::pipeline::ExpressionError`].

use thiserror::Error;

/// Errors raised synchronously by tree mutation primitives
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    /// The path contains an empty segment (`"a..b"`, `".a"`, `"a."`)
    #[error("Malformed path '{0}'")]
    Malformed(String),

    /// A write tried to walk through a primitive node
    #[error("Cannot traverse into primitive at '{path}' (segment '{segment}')")]
    TraverseIntoPrimitive { path: String, segment: String },

    /// A non-numeric segment was used to address an array
    #[error("Invalid array index '{segment}' in '{path}'")]
    InvalidIndex { path: String, segment: String },

    /// An array index past the end of the array
    #[error("Index {index} out of bounds (len {len}) in '{path}'")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// No node exists at the path
    #[error("No node at '{0}'")]
    NotFound(String),

    /// The node at the path is not an array
    #[error("Node at '{0}' is not an array")]
    NotAnArray(String),

    /// The node at the path is a container where a primitive is required
    #[error("Node at '{0}' is not a primitive")]
    NotPrimitive(String),

    /// A child with this key already exists
    #[error("Node at '{0}' already exists")]
    AlreadyExists(String),

    /// The root of a tree must be an object node
    #[error("Root node must be an object")]
    RootMustBeObject,

    /// Expressions may only be attached to primitive nodes
    #[error("Container at '{0}' cannot carry an expression")]
    ExpressionOnContainer(String),
}

/// Errors raised when importing a serialized tree
#[derive(Error, Debug)]
pub enum ImportError {
    /// The document is not valid JSON or does not match the tree shape
    #[error("Malformed tree document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document carries no schema version
    #[error("Tree document has no schemaVersion")]
    Unversioned,

    /// The document carries a version this build cannot read
    #[error("Unsupported tree schema version {0}")]
    UnsupportedVersion(u64),

    /// The document parsed but violates a tree invariant
    #[error("Invalid tree: {0}")]
    Invalid(#[from] PathError),
}

/// Main error type for user-props operations
#[derive(Error, Debug)]
pub enum PropsError {
    /// Errors raised by tree primitives
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// Errors raised while importing a tree document
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Snippet checked outside the pipeline failed to compile
    #[error("Script error: {0}")]
    Script(#[from] crate::scripting::ScriptError),

    /// Errors related to configuration loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PropsError>,
    },
}

impl PropsError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PropsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for PropsError {
    fn from(err: serde_json::Error) -> Self {
        PropsError::Serialization(err.to_string())
    }
}

/// Result type alias for user-props operations
pub type Result<T> = std::result::Result<T, PropsError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PropsError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
