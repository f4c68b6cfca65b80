//! Pipeline orchestrator.
//!
//! Each call runs the three phases in a fixed order on the caller's thread:
//! 1. Re-evaluate expressions until values settle.
//! 2. Validate every node that carries rules.
//! 3. Run watchers of nodes whose value changed since the previous snapshot.
//!
//! The run is then counted in the runtime's telemetry and announced on its
//! event bus.

use crate::config::PropsConfig;
use crate::error::{Result, ResultExt};
use crate::pipeline::expressions::evaluate_expressions;
use crate::pipeline::validation::{ValidationErrors, Validator};
use crate::pipeline::watchers::{run_watchers, Snapshot, WatcherResult};
use crate::runtime::{PipelineSample, PropsRuntime, UserPropsEvent};
use crate::scripting::ScriptEngine;
use crate::tree::PropTree;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Counters of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    pub took_ms: f64,
    /// Expression nodes evaluated across all passes. Nodes skipped as part
    /// of a cycle count once, evaluated to their circular-dependency error.
    pub expression_evaluations: usize,
    pub expression_errors: usize,
    pub expression_passes: usize,
    pub validation_errors: usize,
    pub watchers_run: usize,
    pub watcher_errors: usize,
}

/// Everything a pipeline run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    /// Expression nodes whose value changed
    pub expr_changes: Vec<String>,
    /// Expression nodes left with an error
    pub expression_errors: IndexMap<String, String>,
    pub validation_errors: ValidationErrors,
    pub watcher_result: WatcherResult,
    pub metrics: PipelineMetrics,
    /// False when expressions were still changing at the pass ceiling
    pub converged: bool,
}

impl PipelineOutcome {
    /// Snapshot to hand to the next run
    pub fn snapshot(&self) -> &Snapshot {
        &self.watcher_result.snapshot
    }
}

/// Runs expressions, validation and watchers over a tree
#[derive(Debug)]
pub struct PropsPipeline {
    engine: ScriptEngine,
    config: PropsConfig,
    runtime: Arc<PropsRuntime>,
    validator: Validator,
}

impl PropsPipeline {
    /// Pipeline reporting to the process-wide runtime
    pub fn new(config: PropsConfig) -> Self {
        Self::with_runtime(config, PropsRuntime::global())
    }

    /// Pipeline reporting to `runtime`
    pub fn with_runtime(config: PropsConfig, runtime: Arc<PropsRuntime>) -> Self {
        Self {
            engine: ScriptEngine::with_limits(config.scripting.clone()),
            config,
            runtime,
            validator: Validator::new(),
        }
    }

    pub fn engine(&self) -> &ScriptEngine {
        &self.engine
    }

    /// Mutable engine access, e.g. to register host functions for watchers
    pub fn engine_mut(&mut self) -> &mut ScriptEngine {
        &mut self.engine
    }

    pub fn config(&self) -> &PropsConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Arc<PropsRuntime> {
        &self.runtime
    }

    /// Compile every snippet of `tree` without running it.
    ///
    /// Returns the number of snippets checked, or the first one that does
    /// not compile.
    pub fn check_snippets(&self, tree: &PropTree) -> Result<usize> {
        let mut checked = 0;
        for (path, node) in tree.primitives() {
            let custom = node.meta.validation.as_ref().and_then(|v| v.custom.as_ref());
            let snippets = node
                .meta
                .expression
                .iter()
                .map(|s| ("expression", s))
                .chain(custom.map(|s| ("custom rule", s)))
                .chain(node.meta.watchers.iter().map(|w| ("watcher", &w.script)));

            for (kind, source) in snippets {
                self.engine
                    .validate(source)
                    .with_context(|| format!("{} at '{}'", kind, path))?;
                checked += 1;
            }
        }
        Ok(checked)
    }

    /// Run all three phases over `tree`.
    ///
    /// `previous` is the snapshot returned by the last run; `None` makes
    /// every watcher fire.
    pub fn evaluate_pipeline(&mut self, tree: &mut PropTree, previous: Option<&Snapshot>) -> PipelineOutcome {
        let span = tracing::debug_span!("evaluate_pipeline");
        let _enter = span.enter();
        let start = Instant::now();

        let report = evaluate_expressions(&self.engine, tree, &self.config.evaluation);
        let validation_errors = self.validator.validate_tree(&self.engine, tree);
        let watcher_result = run_watchers(&self.engine, tree, previous);

        let took_ms = start.elapsed().as_secs_f64() * 1000.0;
        let metrics = PipelineMetrics {
            took_ms,
            expression_evaluations: report.evaluations,
            expression_errors: report.errors.len(),
            expression_passes: report.passes,
            validation_errors: validation_errors.len(),
            watchers_run: watcher_result.runs,
            watcher_errors: watcher_result.failures.len(),
        };

        let completed_at = Utc::now();
        self.runtime.record_pipeline(
            PipelineSample {
                expressions_evaluated: metrics.expression_evaluations,
                expression_errors: metrics.expression_errors,
                watchers_run: metrics.watchers_run,
                watcher_errors: metrics.watcher_errors,
                took_ms,
            },
            UserPropsEvent::PipelineComplete {
                duration_ms: took_ms,
                expr_changes: report.changes.clone(),
                watchers_triggered: watcher_result.triggered.clone(),
                validation_error_count: validation_errors.len(),
                completed_at,
            },
            completed_at,
        );

        tracing::debug!(
            "Pipeline finished in {:.3} ms: {} changes, {} validation errors, {} watchers",
            took_ms,
            report.changes.len(),
            validation_errors.len(),
            watcher_result.runs
        );

        PipelineOutcome {
            expr_changes: report.changes,
            expression_errors: report.errors,
            validation_errors,
            watcher_result,
            metrics,
            converged: report.converged,
        }
    }
}

impl Default for PropsPipeline {
    fn default() -> Self {
        Self::new(PropsConfig::default())
    }
}

/// Run the pipeline once with the default configuration
pub fn evaluate_pipeline(tree: &mut PropTree, previous: Option<&Snapshot>) -> PipelineOutcome {
    PropsPipeline::default().evaluate_pipeline(tree, previous)
}
