//! Tracing setup
//!
//! Always logs to stdout. With a log directory configured, also writes two
//! daily-rolling files there: `data_service.*.log` with every event and
//! `data_service_errors.*.log` with warnings and errors only. Each keeps at
//! most `max_files` rolled files.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::LogConfig;

const DEFAULT_FILTER: &str = "dedup_file_server=debug,tower_http=debug";

/// Install the global subscriber.
///
/// The returned guards flush the file writers on drop; keep them alive for
/// the life of the process.
pub fn init(config: &LogConfig) -> anyhow::Result<Vec<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let mut guards = Vec::new();
    let (file_layer, errors_layer) = match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;

            let all = rolling_appender(dir, "data_service", config.max_files)?;
            let (all, guard) = tracing_appender::non_blocking(all);
            guards.push(guard);

            let errors = rolling_appender(dir, "data_service_errors", config.max_files)?;
            let (errors, guard) = tracing_appender::non_blocking(errors);
            guards.push(guard);

            (
                Some(fmt::layer().with_writer(all).with_ansi(false)),
                Some(
                    fmt::layer()
                        .with_writer(errors)
                        .with_ansi(false)
                        .with_filter(LevelFilter::WARN),
                ),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .with(errors_layer)
        .try_init()?;

    Ok(guards)
}

fn rolling_appender(
    dir: &Path,
    prefix: &str,
    max_files: usize,
) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(max_files.max(1))
        .build(dir)
}
