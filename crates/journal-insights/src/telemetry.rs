//! Subscriber setup for embedders that do not install their own.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Installs a global subscriber filtered by `RUST_LOG` (falling back to
/// `default_filter`) and routes `log` records from the persistence layer into
/// it. Returns false if a subscriber or logger was already installed.
pub fn init_logging(format: LogFormat, default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Compact => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(false).compact()),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        ),
    };
    if installed.is_err() {
        return false;
    }

    tracing_log::LogTracer::init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let _ = init_logging(LogFormat::Compact, "warn");
        assert!(!init_logging(LogFormat::Json, "info"));
    }
}
