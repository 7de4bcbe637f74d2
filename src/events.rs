//! Real-time event channel.
//!
//! Fans named, JSON-serializable events out to every currently
//! connected dashboard client. Delivery is best-effort: no replay for
//! late subscribers, no acknowledgment, no retry. Ordering is only
//! guaranteed among events sent by the same publisher.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::store::{CronJob, LogEntry, Task};

/// Capacity of the broadcast ring buffer. Slow clients that fall more
/// than this far behind skip the missed events.
const CHANNEL_CAPACITY: usize = 256;

/// Every event the dashboard can push, with its payload shape.
///
/// Serializes to `{"event": <name>, "data": <payload>}` frames, which
/// keeps the wire contract a closed set instead of ad-hoc strings.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// Greeting sent once per client on connect.
    Connected { message: String },
    /// A log entry was appended.
    NewLog(LogEntry),
    /// Kanban task lifecycle.
    TaskCreated(Task),
    TaskUpdated(Task),
    TaskDeleted { id: i64 },
    /// A simulated job execution finished.
    JobCompleted { job_id: i64, status: String },
    /// The simulated gateway restart finished.
    GatewayRestarted { timestamp: DateTime<Utc> },
}

impl DashboardEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::NewLog(_) => "new_log",
            Self::TaskCreated(_) => "task_created",
            Self::TaskUpdated(_) => "task_updated",
            Self::TaskDeleted { .. } => "task_deleted",
            Self::JobCompleted { .. } => "job_completed",
            Self::GatewayRestarted { .. } => "gateway_restarted",
        }
    }

    pub fn job_completed(job: &CronJob) -> Self {
        Self::JobCompleted {
            job_id: job.id,
            status: "success".to_string(),
        }
    }
}

/// Publish/subscribe transport for [`DashboardEvent`]s.
///
/// Cloning is cheap; all clones share one subscriber set. Dropping a
/// receiver is the (idempotent) unsubscribe.
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<DashboardEvent>,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Deliver `event` to every subscriber connected right now.
    /// Fire-and-forget: having no subscribers is not an error.
    pub fn publish(&self, event: DashboardEvent) {
        tracing::debug!(event = event.name(), "publishing dashboard event");
        let _ = self.tx.send(event);
    }

    /// Register a new subscriber. The receiver sees only events
    /// published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    /// Number of currently connected subscribers (diagnostics only).
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
