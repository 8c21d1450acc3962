use async_trait::async_trait;
use thiserror::Error;

use crate::queue::QueueJobData;

/// Outcome of a failed handler call, as seen by the queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct JobError {
    pub message: String,
    /// Whether another delivery could succeed.
    pub retryable: bool,
}

impl JobError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Processes one delivered job. `attempt` is 1-based and counts every
/// delivery of the same queue job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &QueueJobData, attempt: u32) -> Result<(), JobError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let err = JobError::retryable("rate limited");
        assert!(err.retryable);
        assert_eq!(err.to_string(), "rate limited");

        let err = JobError::fatal("Journal entry e1 not found");
        assert!(!err.retryable);
    }
}
