use std::fs;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

fn env_filter(directive: &str) -> EnvFilter {
    match directive.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    }
}

/// Installs the global subscriber: human-readable lines on stderr (stdout is
/// reserved for `extract`'s JSON) plus, when `log.dir` is set, a JSON file
/// rotated daily.
///
/// Hold the returned guard until exit; dropping it flushes the file writer.
pub fn init_logging(log: &LogConfig) -> Option<WorkerGuard> {
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &log.dir {
        Some(dir) => match fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, &log.file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (Some(fmt::layer().json().with_writer(writer)), Some(guard))
            }
            Err(e) => {
                eprintln!("Log directory {} unavailable: {}", dir.display(), e);
                (None, None)
            }
        },
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter(&log.directive))
        .with(file_layer)
        .with(console_layer)
        .try_init();
    if installed.is_err() {
        warn!("A global subscriber was already installed; keeping it");
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_logging_creates_directory() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        let config = LogConfig {
            dir: Some(logs.clone()),
            ..LogConfig::default()
        };

        let guard = init_logging(&config);
        assert!(guard.is_some());
        assert!(logs.is_dir());
    }

    #[test]
    fn test_console_only_when_no_dir() {
        let config = LogConfig {
            dir: None,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_none());
    }
}
