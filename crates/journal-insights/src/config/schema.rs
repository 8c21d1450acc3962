use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: DatabaseConfig::default(),
            queue: QueueConfig::default(),
            workers: WorkersConfig::default(),
            audio: AudioConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Falls back to `~/.journal-insights/data/journal-insights.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path
            .clone()
            .or_else(crate::db::default_database_path)
    }
}

/// Delivery and retention settings for the analysis queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueConfig {
    /// Total delivery attempts per job, first one included.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Base of the exponential backoff between attempts.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Delay before a freshly enqueued job becomes claimable.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_remove_on_complete")]
    pub remove_on_complete: u32,
    #[serde(default = "default_remove_on_fail")]
    pub remove_on_fail: u32,
    /// How often idle workers look for ready jobs without a wake-up.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_clean_grace_ms")]
    pub clean_grace_ms: u64,
    /// Per-state cap for `clean_default`; 0 removes every eligible job.
    #[serde(default = "default_clean_limit")]
    pub clean_limit: u32,
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_remove_on_complete() -> u32 {
    100
}

fn default_remove_on_fail() -> u32 {
    50
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_clean_grace_ms() -> u64 {
    24 * 60 * 60 * 1000
}

fn default_clean_limit() -> u32 {
    100
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn clean_grace(&self) -> Duration {
        Duration::from_millis(self.clean_grace_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
            delay_ms: default_delay_ms(),
            remove_on_complete: default_remove_on_complete(),
            remove_on_fail: default_remove_on_fail(),
            poll_interval_ms: default_poll_interval_ms(),
            clean_grace_ms: default_clean_grace_ms(),
            clean_limit: default_clean_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkersConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    5
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    /// Where uploaded recordings live. Audio URLs are resolved by file name
    /// against this directory.
    #[serde(default = "default_audio_directory")]
    pub directory: PathBuf,
}

fn default_audio_directory() -> PathBuf {
    PathBuf::from("uploads").join("audio")
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            directory: default_audio_directory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsConfig {
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    100
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.queue, QueueConfig::default());
        assert_eq!(config.queue.attempts, 3);
        assert_eq!(config.queue.backoff_ms, 2000);
        assert_eq!(config.queue.delay_ms, 1000);
        assert_eq!(config.queue.remove_on_complete, 100);
        assert_eq!(config.queue.remove_on_fail, 50);
        assert_eq!(config.workers.concurrency, 5);
        assert_eq!(config.events.capacity, 100);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_camel_case_fields() {
        let config: Config = serde_json::from_str(
            r#"{"queue": {"backoffMs": 10, "cleanLimit": 0}, "audio": {"directory": "/srv/audio"}}"#,
        )
        .unwrap();
        assert_eq!(config.queue.backoff_ms, 10);
        assert_eq!(config.queue.clean_limit, 0);
        assert_eq!(config.queue.attempts, 3);
        assert_eq!(config.audio.directory, PathBuf::from("/srv/audio"));
    }

    #[test]
    fn test_clean_grace_is_one_day() {
        assert_eq!(
            QueueConfig::default().clean_grace(),
            Duration::from_secs(86_400)
        );
    }

    #[test]
    fn test_database_path_override() {
        let config = DatabaseConfig {
            path: Some(PathBuf::from("/tmp/x.db")),
        };
        assert_eq!(config.resolved_path(), Some(PathBuf::from("/tmp/x.db")));
        assert!(DatabaseConfig::default().resolved_path().is_some());
    }
}
