//! ログ初期化

use crate::config::LogConfig;
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the file writer alive; dropping it flushes buffered log lines.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Directory for log files: configured or the XDG data directory
pub fn log_directory(config: &LogConfig) -> PathBuf {
    if let Some(dir) = &config.log_dir {
        return dir.clone();
    }
    ProjectDirs::from("dev", "salesboard", "salesboard")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// ログ初期化
///
/// `RUST_LOG` wins over the configured level. With file logging on, a JSON
/// copy of every event goes to a daily-rolling file.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .or_else(|_| EnvFilter::try_new("info"))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact();

    let (file_layer, file_guard) = if config.enable_file_logging {
        let dir = log_directory(config);
        std::fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::daily(&dir, "salesboard.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer().json().with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(
        level = %config.log_level,
        file_logging = config.enable_file_logging,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_log_directory_wins() {
        let config = LogConfig {
            log_dir: Some(PathBuf::from("/var/log/salesboard")),
            ..LogConfig::default()
        };
        assert_eq!(log_directory(&config), PathBuf::from("/var/log/salesboard"));
    }

    #[test]
    fn test_default_log_directory_ends_with_logs() {
        assert!(log_directory(&LogConfig::default()).ends_with("logs"));
    }
}
