//! Process-wide runtime state: telemetry counters and the event bus.
//!
//! Both live in one [`PropsRuntime`]. [`PropsRuntime::global`] is the shared
//! instance used by default; tests and embedding hosts can create their own
//! and hand it to a pipeline with
//! [`PropsPipeline::with_runtime`](crate::pipeline::PropsPipeline::with_runtime).
//!
//! Counters are only written by the pipeline orchestrator. Readers take
//! snapshots; [`reset_user_props_telemetry`] zeroes them.

mod events;
mod telemetry;

pub use events::{EventBus, Subscription, UserPropsEvent};
pub use telemetry::{Telemetry, TelemetrySnapshot};

pub(crate) use telemetry::PipelineSample;

use chrono::{DateTime, Utc};
use std::sync::{Arc, OnceLock};

/// Telemetry and event bus shared by pipelines
#[derive(Debug, Default)]
pub struct PropsRuntime {
    telemetry: Telemetry,
    events: Arc<EventBus>,
}

impl PropsRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<PropsRuntime>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(PropsRuntime::new())).clone()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn reset_telemetry(&self) {
        self.telemetry.reset();
        tracing::debug!("Telemetry reset");
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Count a finished pipeline and announce it
    pub(crate) fn record_pipeline(&self, sample: PipelineSample, event: UserPropsEvent, at: DateTime<Utc>) {
        self.telemetry.record(sample, at);
        self.events.publish(event);
    }
}

/// Counters of the process-wide runtime
pub fn user_props_telemetry() -> TelemetrySnapshot {
    PropsRuntime::global().telemetry()
}

/// Zero the counters of the process-wide runtime
pub fn reset_user_props_telemetry() {
    PropsRuntime::global().reset_telemetry();
}

/// Subscribe to events of the process-wide runtime
pub fn on_user_props_event() -> Subscription {
    PropsRuntime::global().subscribe()
}
