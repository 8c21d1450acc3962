//! Builder patterns for creating test configurations programmatically.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use journal_insights::config::{Config, QueueConfig};

/// Builder for creating `Config` instances tuned for fast tests.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// No enqueue delay, millisecond backoff and polling, two workers.
    pub fn new() -> Self {
        let mut config = Config::default();
        config.queue = QueueConfig {
            delay_ms: 0,
            backoff_ms: 10,
            poll_interval_ms: 10,
            ..QueueConfig::default()
        };
        config.workers.concurrency = 2;
        Self { config }
    }

    pub fn database_path(mut self, path: &Path) -> Self {
        self.config.database.path = Some(path.to_path_buf());
        self
    }

    pub fn audio_directory(mut self, path: PathBuf) -> Self {
        self.config.audio.directory = path;
        self
    }

    pub fn concurrency(mut self, workers: usize) -> Self {
        self.config.workers.concurrency = workers;
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.config.queue.attempts = attempts;
        self
    }

    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.queue.delay_ms = delay_ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
