//! Status event broadcasting for real-time job observation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::record::{Job, JobFailure, JobStatus};

/// Snapshot of a status write, delivered to subscribers. Polling via the
/// status query interface is the primary channel; this stream is a
/// convenience for live UIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub job_id: String,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn from_job(job: &Job, message: &str) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: job.status,
            progress_percent: job.progress_percent,
            message: message.to_string(),
            error: job.error.clone(),
            timestamp: job.updated_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Broadcasts status events for streaming.
#[derive(Clone)]
pub struct StatusBroadcaster {
    sender: Arc<broadcast::Sender<StatusEvent>>,
}

impl StatusBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers. No active receivers is fine.
    pub fn send(&self, event: StatusEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
