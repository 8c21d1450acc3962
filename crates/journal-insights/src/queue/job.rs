//! Queue job types: the message payload, per-job options and the stored job.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::kind::AnalysisKind;
use crate::config::QueueConfig;

/// Name every analysis job is stored under.
pub const PROCESS_ENTRY_JOB: &str = "process-journal-entry";

/// Snapshot of what to analyze, taken when the job is enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueJobData {
    pub journal_entry_id: String,
    pub analysis_type: AnalysisKind,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Delivery options for a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    /// Higher values are claimed first.
    pub priority: i64,
    pub delay_ms: u64,
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl JobOptions {
    /// Defaults for a job of `kind`: trigger analysis outranks the rest.
    pub fn for_kind(kind: AnalysisKind, settings: &QueueConfig) -> Self {
        Self {
            priority: kind.queue_priority(),
            delay_ms: settings.delay_ms,
            attempts: settings.attempts.max(1),
            backoff_ms: settings.backoff_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueJobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl QueueJobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueJobState::Waiting => "waiting",
            QueueJobState::Active => "active",
            QueueJobState::Completed => "completed",
            QueueJobState::Failed => "failed",
        }
    }
}

impl fmt::Display for QueueJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueJobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(QueueJobState::Waiting),
            "active" => Ok(QueueJobState::Active),
            "completed" => Ok(QueueJobState::Completed),
            "failed" => Ok(QueueJobState::Failed),
            other => Err(other.to_string()),
        }
    }
}

/// A job as stored in the queue. Times are Unix milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub id: String,
    pub name: String,
    /// Raw JSON payload; see [`QueuedJob::data`].
    pub data: String,
    pub priority: i64,
    pub state: QueueJobState,
    /// Deliveries so far. While active this is the current 1-based attempt.
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub ready_at: i64,
    pub created_at: i64,
    pub processed_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub failed_reason: Option<String>,
}

impl QueuedJob {
    pub fn data(&self) -> Result<QueueJobData, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

/// Jobs per state. Delayed and backing-off jobs count as waiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

impl JobCounts {
    pub fn total(&self) -> u64 {
        self.waiting + self.active + self.completed + self.failed
    }
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Scheduled for another attempt after `delay`.
    Retrying { next_attempt: u32, delay: Duration },
    /// No attempts left, or the failure was not retryable.
    Failed,
    /// The job was not active (already settled or removed).
    NotActive,
}

impl FailOutcome {
    pub fn will_retry(&self) -> bool {
        matches!(self, FailOutcome::Retrying { .. })
    }
}

/// Wait before retrying after `attempt` failed: `backoff_ms * 2^(attempt-1)`.
pub fn backoff_delay(backoff_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    Duration::from_millis(backoff_ms.saturating_mul(1u64 << exponent))
}
