//! Speech-to-text for audio entries.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::sanitize::redact_audio_url;

/// Audio handed to a [`Transcriber`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: Option<String>,
}

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Invalid audio URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to read audio file '{path}': {source}")]
    ReadAudio {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcription service failed: {0}")]
    Service(String),
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, TranscriptionError>;
}

/// The last path segment of an audio URL, with any query or fragment removed.
pub fn audio_filename(audio_url: &str) -> Option<&str> {
    let without_suffix = audio_url
        .split(['?', '#'])
        .next()
        .unwrap_or(audio_url);
    without_suffix
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// Where the recording behind `audio_url` is stored.
pub fn audio_path(audio_dir: &Path, audio_url: &str) -> Result<PathBuf, TranscriptionError> {
    audio_filename(audio_url)
        .map(|name| audio_dir.join(name))
        .ok_or_else(|| TranscriptionError::InvalidUrl(audio_url.to_string()))
}

/// Reads the recording for `audio_url` from `audio_dir` and transcribes it.
pub async fn transcribe_url(
    transcriber: &dyn Transcriber,
    audio_dir: &Path,
    audio_url: &str,
) -> Result<String, TranscriptionError> {
    let path = audio_path(audio_dir, audio_url)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| TranscriptionError::ReadAudio {
            path: path.clone(),
            source: e,
        })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mime_type = mime_guess::from_path(&path).first().map(|m| m.to_string());

    info!(
        audio = %redact_audio_url(audio_url),
        bytes = bytes.len(),
        "Starting audio transcription"
    );

    let text = transcriber
        .transcribe(AudioClip {
            bytes,
            filename,
            mime_type,
        })
        .await?;

    info!(
        audio = %redact_audio_url(audio_url),
        chars = text.len(),
        "Audio transcription completed"
    );
    Ok(text)
}
