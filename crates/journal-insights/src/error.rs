use std::path::PathBuf;
use thiserror::Error;

use crate::analysis::error::AnalysisError;
use crate::analysis::executor::ModelError;
use crate::analysis::kind::UnknownKind;
use crate::analysis::transcription::TranscriptionError;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Transcription error: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Database path could not be determined; set database.path")]
    NoDatabasePath,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue storage error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Failed to encode job payload: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InsightsError>;
