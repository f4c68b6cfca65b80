//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use std::sync::Arc;
use std::time::Duration;
use user_props::{PropTree, PropValue, PropsConfig, PropsPipeline, PropsRuntime};

/// Upper bound for pipeline runs that must not hang
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Pipeline with its own runtime so tests do not share counters
pub fn isolated_pipeline() -> (PropsPipeline, Arc<PropsRuntime>) {
    let runtime = Arc::new(PropsRuntime::new());
    let pipeline = PropsPipeline::with_runtime(PropsConfig::default(), runtime.clone());
    (pipeline, runtime)
}

/// Numeric value at `path`, panicking when it is missing or not a number
pub fn number_at(tree: &PropTree, path: &str) -> f64 {
    match tree.value(path) {
        Some(PropValue::Number(n)) => n,
        other => panic!("expected a number at '{}', got {:?}", path, other),
    }
}

/// The `expressionError` stored at `path`
pub fn error_at<'a>(tree: &'a PropTree, path: &str) -> Option<&'a str> {
    tree.get(path)
        .and_then(|node| node.meta.expression_error.as_deref())
}
