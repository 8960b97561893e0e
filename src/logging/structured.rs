//! Structured logging setup using tracing
//!
//! Console output goes to stderr so command output on stdout stays clean. When
//! `logging.local_enabled` is set, a second layer writes JSON lines to a rolling
//! `replica.log` under `logging.local_path`.

use crate::config::LoggingConfig;
use crate::domain::{ReplicaError, Result};
use std::str::FromStr;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "replica.log";

/// Keeps the background file writer alive; drop it last so buffered lines are flushed
pub struct LoggingGuard {
    _file_writer: Option<WorkerGuard>,
}

/// Installs the global subscriber
///
/// `RUST_LOG` takes precedence over `level` when it is set.
///
/// # Errors
///
/// Returns a configuration error for an unknown level or rotation, when the
/// log directory cannot be created, or when a subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use replica::config::LoggingConfig;
/// use replica::logging::init_logging;
///
/// let _guard = init_logging("debug", &LoggingConfig::default()).unwrap();
/// tracing::debug!(subsystem = "billing", "ready");
/// ```
pub fn init_logging(level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = crate_filter(parse_log_level(level)?);

    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter.clone())
        .boxed();

    let (file, file_writer) = if config.local_enabled {
        let (layer, guard) = json_file_layer(config, filter)?;
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| ReplicaError::Configuration(format!("Failed to install logger: {e}")))?;

    tracing::debug!(
        file_logging = config.local_enabled,
        path = %config.local_path,
        rotation = %config.local_rotation,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_writer: file_writer,
    })
}

fn crate_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("replica={}", level.as_str().to_lowercase())))
}

fn json_file_layer<S>(
    config: &LoggingConfig,
    filter: EnvFilter,
) -> Result<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        ReplicaError::Configuration(format!(
            "Failed to create log directory {}: {e}",
            config.local_path
        ))
    })?;

    let appender = RollingFileAppender::new(
        parse_rotation(&config.local_rotation)?,
        &config.local_path,
        LOG_FILE_PREFIX,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(writer)
        .with_filter(filter)
        .boxed();

    Ok((layer, guard))
}

fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| {
        ReplicaError::Configuration(format!(
            "Unknown log level '{level}' (expected trace, debug, info, warn or error)"
        ))
    })
}

fn parse_rotation(rotation: &str) -> Result<Rotation> {
    match rotation {
        "daily" => Ok(Rotation::DAILY),
        "hourly" => Ok(Rotation::HOURLY),
        "never" => Ok(Rotation::NEVER),
        other => Err(ReplicaError::Configuration(format!(
            "Unknown log rotation '{other}' (expected daily, hourly or never)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("trace", Level::TRACE)]
    #[test_case("DEBUG", Level::DEBUG)]
    #[test_case(" info ", Level::INFO)]
    #[test_case("Warn", Level::WARN)]
    #[test_case("error", Level::ERROR)]
    fn test_known_levels(input: &str, expected: Level) {
        assert_eq!(parse_log_level(input).unwrap(), expected);
    }

    #[test]
    fn test_unknown_level_names_the_input() {
        let err = parse_log_level("verbose").unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_rotation_names() {
        assert_eq!(parse_rotation("hourly").unwrap(), Rotation::HOURLY);
        assert!(parse_rotation("weekly").is_err());
    }

    #[test]
    fn test_file_layer_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            local_enabled: true,
            local_path: dir.path().join("logs").display().to_string(),
            local_rotation: "never".to_string(),
        };

        let result = json_file_layer::<tracing_subscriber::Registry>(&config, EnvFilter::new("replica=info"));

        assert!(result.is_ok());
        assert!(dir.path().join("logs").is_dir());
    }
}
