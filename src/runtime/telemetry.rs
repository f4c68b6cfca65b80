//! Process-wide pipeline counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Counters accumulated across pipeline runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub pipelines: u64,
    pub expressions_evaluated: u64,
    pub expression_errors: u64,
    pub watchers_run: u64,
    pub watcher_errors: u64,
    /// Total wall-clock time spent in pipelines
    pub total_ms: f64,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl TelemetrySnapshot {
    /// Mean pipeline duration, zero before the first run
    pub fn average_ms(&self) -> f64 {
        if self.pipelines == 0 {
            0.0
        } else {
            self.total_ms / self.pipelines as f64
        }
    }
}

/// One pipeline run, as recorded by the orchestrator
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PipelineSample {
    pub expressions_evaluated: usize,
    pub expression_errors: usize,
    pub watchers_run: usize,
    pub watcher_errors: usize,
    pub took_ms: f64,
}

/// Telemetry store. Only the pipeline orchestrator records into it.
#[derive(Debug, Default)]
pub struct Telemetry {
    inner: Mutex<TelemetrySnapshot>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the counters half-written,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, TelemetrySnapshot> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.lock().clone()
    }

    /// Zero every counter
    pub fn reset(&self) {
        *self.lock() = TelemetrySnapshot::default();
    }

    pub(crate) fn record(&self, sample: PipelineSample, at: DateTime<Utc>) {
        let mut counters = self.lock();
        counters.pipelines += 1;
        counters.expressions_evaluated += sample.expressions_evaluated as u64;
        counters.expression_errors += sample.expression_errors as u64;
        counters.watchers_run += sample.watchers_run as u64;
        counters.watcher_errors += sample.watcher_errors as u64;
        counters.total_ms += sample.took_ms;
        counters.last_run_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_reset() {
        let telemetry = Telemetry::new();
        let sample = PipelineSample {
            expressions_evaluated: 3,
            expression_errors: 1,
            watchers_run: 2,
            watcher_errors: 0,
            took_ms: 1.5,
        };
        telemetry.record(sample, Utc::now());
        telemetry.record(sample, Utc::now());

        let snap = telemetry.snapshot();
        assert_eq!(snap.pipelines, 2);
        assert_eq!(snap.expressions_evaluated, 6);
        assert_eq!(snap.expression_errors, 2);
        assert_eq!(snap.watchers_run, 4);
        assert!((snap.average_ms() - 1.5).abs() < 1e-9);
        assert!(snap.last_run_at.is_some());

        telemetry.reset();
        assert_eq!(telemetry.snapshot(), TelemetrySnapshot::default());
        assert_eq!(telemetry.snapshot().average_ms(), 0.0);
    }

    #[test]
    fn test_snapshot_wire_names() {
        let json = serde_json::to_value(TelemetrySnapshot::default()).unwrap();
        assert_eq!(json["expressionsEvaluated"], 0);
        assert_eq!(json["totalMs"], 0.0);
        assert!(json["lastRunAt"].is_null());
    }
}
