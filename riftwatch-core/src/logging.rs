//! File logging for riftwatch
//!
//! The terminal belongs to the UI, so tracing output goes to daily files
//! `riftwatch.YYYY-MM-DD.log` under `$XDG_STATE_HOME/riftwatch/`, with the
//! last week kept. `RUST_LOG` directives take precedence over
//! `[logging] level`.

use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::Config;
use crate::error::{Error, Result};

const LOG_PREFIX: &str = "riftwatch";
const LOG_SUFFIX: &str = "log";
/// Rotated files kept on disk
const MAX_LOG_FILES: usize = 7;

/// Keeps the background log writer alive; flushes on drop.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber and record where the session points.
pub fn init(config: &Config) -> Result<LoggingGuard> {
    let level = level_filter(&config.logging.level)?;
    let log_dir = Config::state_dir();
    let (writer, guard) = file_writer(&log_dir)?;

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install log subscriber: {}", e)))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %level,
        backend = %config.backend.base_url,
        push = config.push.url.as_deref().unwrap_or("derived from backend"),
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Parse `[logging] level`.
pub fn level_filter(level: &str) -> Result<LevelFilter> {
    level.trim().parse().map_err(|_| {
        Error::Config(format!(
            "logging.level must be trace, debug, info, warn, error or off, got {:?}",
            level
        ))
    })
}

fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix(LOG_SUFFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .map_err(|e| Error::Config(format!("cannot open log in {}: {}", dir.display(), e)))?;

    Ok(tracing_appender::non_blocking(appender))
}
