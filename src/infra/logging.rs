use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::infra::{config::LogConfig, error::AppError};

const LOG_FILE_NAME: &str = "huddle.log";

/// Installs the global subscriber writing to the log file.
///
/// The terminal belongs to the TUI, so nothing is written to stdout/stderr.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard, AppError> {
    let dir = resolve_log_dir(config);
    std::fs::create_dir_all(&dir).map_err(|source| AppError::LogDir {
        path: dir.clone(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        )
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(AppError::LoggingInit)?;

    tracing::info!(log_file = %dir.join(LOG_FILE_NAME).display(), "logging initialized");
    Ok(guard)
}

pub fn resolve_log_dir(config: &LogConfig) -> PathBuf {
    if let Some(dir) = &config.dir {
        return dir.clone();
    }

    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("huddle")
        .join(Path::new("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_dir_wins() {
        let config = LogConfig {
            level: "info".to_owned(),
            dir: Some(PathBuf::from("/var/log/huddle")),
        };

        assert_eq!(resolve_log_dir(&config), PathBuf::from("/var/log/huddle"));
    }

    #[test]
    fn default_dir_is_namespaced() {
        let dir = resolve_log_dir(&LogConfig::default());

        assert!(dir.ends_with("huddle/logs"));
    }
}
