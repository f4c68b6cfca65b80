//! Process-wide telemetry and event delivery.
//!
//! These tests share the global runtime, so they run serially.

mod common;

use common::builders::sum_tree;
use serial_test::serial;
use std::time::Duration;
use user_props::{
    evaluate_pipeline, on_user_props_event, reset_user_props_telemetry, user_props_telemetry,
    PropsConfig, PropsPipeline, UserPropsEvent,
};

#[test]
#[serial]
fn test_reset_then_one_run() {
    reset_user_props_telemetry();

    let mut tree = sum_tree();
    evaluate_pipeline(&mut tree, None);

    let snap = user_props_telemetry();
    assert_eq!(snap.pipelines, 1);
    assert!(snap.expressions_evaluated >= 1);
    assert!(snap.last_run_at.is_some());

    reset_user_props_telemetry();
    let snap = user_props_telemetry();
    assert_eq!(snap.pipelines, 0);
    assert_eq!(snap.expressions_evaluated, 0);
}

#[test]
#[serial]
fn test_counters_accumulate() {
    reset_user_props_telemetry();
    let mut pipeline = PropsPipeline::new(PropsConfig::default());
    let mut tree = sum_tree();

    let first = pipeline.evaluate_pipeline(&mut tree, None);
    let second = pipeline.evaluate_pipeline(&mut tree, Some(first.snapshot()));

    let snap = user_props_telemetry();
    assert_eq!(snap.pipelines, 2);
    assert_eq!(
        snap.expressions_evaluated,
        (first.metrics.expression_evaluations + second.metrics.expression_evaluations) as u64
    );
    assert_eq!(snap.expression_errors, 0);
}

#[test]
#[serial]
fn test_events_in_emission_order() {
    let subscription = on_user_props_event();
    let mut pipeline = PropsPipeline::new(PropsConfig::default());
    let mut tree = sum_tree();

    let first = pipeline.evaluate_pipeline(&mut tree, None);
    pipeline.evaluate_pipeline(&mut tree, Some(first.snapshot()));

    let changes: Vec<Vec<String>> = subscription
        .drain()
        .into_iter()
        .map(|event| match event {
            UserPropsEvent::PipelineComplete { expr_changes, .. } => expr_changes,
        })
        .collect();
    assert_eq!(changes, vec![vec!["sum".to_string()], Vec::new()]);

    subscription.unsubscribe();
    pipeline.evaluate_pipeline(&mut tree, None);
}

#[test]
#[serial]
fn test_subscription_receives_across_threads() {
    let subscription = on_user_props_event();

    let handle = std::thread::spawn(|| {
        let mut tree = sum_tree();
        evaluate_pipeline(&mut tree, None);
    });
    handle.join().unwrap();

    let event = subscription.recv_timeout(Duration::from_secs(1));
    assert!(matches!(
        event,
        Some(UserPropsEvent::PipelineComplete { validation_error_count: 0, .. })
    ));
}
