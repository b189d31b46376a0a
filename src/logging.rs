use crate::config::{Config, DEFAULT_LOG_LEVEL};
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. The terminal UI owns stdout/stderr, so
/// nothing is installed unless logging is enabled; keep the returned guard
/// alive for the whole run to flush the writer.
pub fn init(config: &Config) -> Option<WorkerGuard> {
    if !config.log_enabled {
        return None;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(&config.log_level));
    let (writer, guard) = open_writer(config.log_file.trim());

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
    tracing::info!("logging to {}", display_target(config.log_file.trim()));
    Some(guard)
}

/// Filter for the configured level, falling back to `info` when the value
/// is blank or not a valid directive.
fn level_filter(level: &str) -> EnvFilter {
    let level = level.trim();
    let level = if level.is_empty() { DEFAULT_LOG_LEVEL } else { level };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

fn open_writer(log_file: &str) -> (NonBlocking, WorkerGuard) {
    if log_file.is_empty() {
        return tracing_appender::non_blocking(std::io::stderr());
    }
    let path = Path::new(log_file);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = fs::create_dir_all(parent);
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => tracing_appender::non_blocking(file),
        Err(_) => tracing_appender::non_blocking(std::io::stderr()),
    }
}

fn display_target(log_file: &str) -> &str {
    if log_file.is_empty() {
        "stderr"
    } else {
        log_file
    }
}
