//! Job lifecycle broadcaster for observing the worker pool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::analysis::kind::AnalysisKind;

/// Lifecycle phase of one delivery attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    Active,
    Completed,
    Failed,
}

impl std::fmt::Display for JobEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobEventKind::Active => write!(f, "Active"),
            JobEventKind::Completed => write!(f, "Completed"),
            JobEventKind::Failed => write!(f, "Failed"),
        }
    }
}

/// Emitted by a worker for every attempt it makes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: String,
    pub kind: JobEventKind,
    /// 1-based delivery attempt.
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<AnalysisKind>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the queue will deliver the job again (set on failure).
    #[serde(default)]
    pub will_retry: bool,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    fn new(job_id: &str, kind: JobEventKind, attempt: u32) -> Self {
        Self {
            job_id: job_id.to_string(),
            kind,
            attempt,
            journal_entry_id: None,
            analysis_type: None,
            error: None,
            will_retry: false,
            timestamp: Utc::now(),
        }
    }

    pub fn active(job_id: &str, attempt: u32) -> Self {
        Self::new(job_id, JobEventKind::Active, attempt)
    }

    pub fn completed(job_id: &str, attempt: u32) -> Self {
        Self::new(job_id, JobEventKind::Completed, attempt)
    }

    pub fn failed(job_id: &str, attempt: u32, error: &str, will_retry: bool) -> Self {
        Self {
            error: Some(error.to_string()),
            will_retry,
            ..Self::new(job_id, JobEventKind::Failed, attempt)
        }
    }

    /// Attaches the entry and kind the job was about.
    pub fn for_target(mut self, journal_entry_id: &str, analysis_type: AnalysisKind) -> Self {
        self.journal_entry_id = Some(journal_entry_id.to_string());
        self.analysis_type = Some(analysis_type);
        self
    }
}

/// Broadcasts job events to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventBroadcaster {
    /// Creates a broadcaster with the given channel capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobEvent) {
        // No active receivers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
