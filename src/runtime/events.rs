//! Event bus for pipeline notifications.
//!
//! Every subscriber owns a crossbeam channel; `publish` sends to each of them
//! in turn, so a subscriber sees events in emission order.
//! A [`Subscription`] removes itself from the bus when dropped.
//!
//! [`EventBus::subscribe`] queues without limit, so a subscription that is
//! kept alive but never read grows with every pipeline run.
//! [`EventBus::subscribe_bounded`] caps the queue and drops new events for
//! that subscriber while it is full.

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError, TryRecvError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Events published by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UserPropsEvent {
    #[serde(rename_all = "camelCase")]
    PipelineComplete {
        duration_ms: f64,
        expr_changes: Vec<String>,
        watchers_triggered: Vec<String>,
        validation_error_count: usize,
        completed_at: DateTime<Utc>,
    },
}

type SubscriberList = Vec<(u64, Sender<UserPropsEvent>)>;

/// Multi-subscriber broadcast of [`UserPropsEvent`]s
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<SubscriberList>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SubscriberList> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new subscriber with an unbounded queue
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        self.register(unbounded())
    }

    /// Register a subscriber holding at most `capacity` unread events.
    ///
    /// Events published while the queue is full are dropped for this
    /// subscriber only.
    pub fn subscribe_bounded(self: &Arc<Self>, capacity: usize) -> Subscription {
        self.register(bounded(capacity.max(1)))
    }

    fn register(
        self: &Arc<Self>,
        (tx, rx): (Sender<UserPropsEvent>, Receiver<UserPropsEvent>),
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, tx));
        tracing::trace!("Event subscriber {} registered", id);

        Subscription {
            id,
            receiver: rx,
            bus: Arc::downgrade(self),
        }
    }

    /// Deliver `event` to every live subscriber
    pub fn publish(&self, event: UserPropsEvent) {
        let mut subscribers = self.lock();
        subscribers.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Event subscriber {} is full, event dropped", id);
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Dropping disconnected event subscriber {}", id);
                false
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|(sub_id, _)| *sub_id != id);
    }
}

/// Receiving end of a bus subscription.
///
/// Events queue until read. Drop or [`unsubscribe`](Self::unsubscribe) a
/// subscription that is no longer read, or create it with
/// [`EventBus::subscribe_bounded`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<UserPropsEvent>,
    bus: Weak<EventBus>,
}

impl Subscription {
    /// Next pending event, if any
    pub fn try_recv(&self) -> Option<UserPropsEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<UserPropsEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every pending event
    pub fn drain(&self) -> Vec<UserPropsEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn receiver(&self) -> &Receiver<UserPropsEvent> {
        &self.receiver
    }

    /// Stop receiving events
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}
