use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SUPPORTED_VERSION: &str = "1.0";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let queue = &config.queue;
    if queue.attempts == 0 {
        return Err(ConfigError::Validation {
            message: "queue.attempts must be at least 1".to_string(),
        });
    }
    if queue.poll_interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "queue.pollIntervalMs must be greater than 0".to_string(),
        });
    }

    if config.workers.concurrency == 0 {
        return Err(ConfigError::Validation {
            message: "workers.concurrency must be at least 1".to_string(),
        });
    }

    // tokio::sync::broadcast panics on a zero-capacity channel.
    if config.events.capacity == 0 {
        return Err(ConfigError::Validation {
            message: "events.capacity must be at least 1".to_string(),
        });
    }

    Ok(())
}
