use thiserror::Error;

use super::entry::EntryStoreError;
use super::executor::ModelError;
use super::transcription::TranscriptionError;
use crate::db::DatabaseError;
use crate::error::QueueError;
use crate::worker::JobError;

/// Errors raised by the analysis orchestrator.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Journal entry {0} not found")]
    EntryNotFound(String),

    #[error("Analysis record {0} not found")]
    RecordNotFound(String),

    #[error("Audio transcription failed for {audio_url}: {source}")]
    Transcription {
        audio_url: String,
        #[source]
        source: TranscriptionError,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Entry store error: {0}")]
    EntryStore(#[from] EntryStoreError),

    #[error("Record store error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl AnalysisError {
    /// Whether a later delivery of the same job could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AnalysisError::EntryNotFound(_) | AnalysisError::RecordNotFound(_)
        )
    }
}

impl From<AnalysisError> for JobError {
    fn from(err: AnalysisError) -> Self {
        JobError {
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_not_retryable() {
        let err = AnalysisError::EntryNotFound("e1".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Journal entry e1 not found");

        let job_err = JobError::from(err);
        assert!(!job_err.retryable);
    }

    #[test]
    fn test_model_and_transcription_errors_are_retryable() {
        assert!(AnalysisError::Model(ModelError::Malformed("bad".to_string())).is_retryable());

        let err = AnalysisError::Transcription {
            audio_url: "http://host/a.wav".to_string(),
            source: TranscriptionError::Service("timeout".to_string()),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("http://host/a.wav"));
    }

    #[test]
    fn test_model_error_message_is_preserved() {
        let err = AnalysisError::from(ModelError::Request("quota exceeded".to_string()));
        assert_eq!(err.to_string(), "Model request failed: quota exceeded");
    }
}
