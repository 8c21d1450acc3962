//! Journal entries as seen by the analysis pipeline.
//!
//! Entries are owned by the entry-management component. The pipeline only
//! reads them and writes back transcribed content for audio entries.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    #[default]
    Text,
    Audio,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Text => "text",
            EntryType::Audio => "audio",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(EntryType::Text),
            "audio" => Ok(EntryType::Audio),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub is_draft: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Creates a published text entry.
    pub fn text(content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            entry_type: EntryType::Text,
            audio_url: None,
            is_draft: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a published audio entry whose text is not yet transcribed.
    pub fn audio(audio_url: impl Into<String>) -> Self {
        Self {
            entry_type: EntryType::Audio,
            audio_url: Some(audio_url.into()),
            ..Self::text("")
        }
    }

    /// True when the entry still needs transcription before it can be analyzed.
    pub fn needs_transcription(&self) -> bool {
        self.entry_type == EntryType::Audio
            && self.content.trim().is_empty()
            && self.audio_url.is_some()
    }

    /// Published entries take part in corpus-wide reprocessing.
    pub fn is_published(&self) -> bool {
        !self.is_draft && !self.is_deleted
    }
}

#[derive(Error, Debug)]
pub enum EntryStoreError {
    #[error("Entry store database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Entry store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to journal entries, plus the content write-back used after
/// transcription.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<JournalEntry>, EntryStoreError>;

    async fn update_content(&self, id: &str, content: &str) -> Result<(), EntryStoreError>;

    /// All entries that are neither drafts nor soft-deleted.
    async fn find_published(&self) -> Result<Vec<JournalEntry>, EntryStoreError>;
}
