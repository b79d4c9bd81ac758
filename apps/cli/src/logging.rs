//! Logging setup for the `ms-find` binary
//!
//! Warnings go to the console. Everything the filter lets through (`RUST_LOG`, or info for the
//! ms-find crates) is written to `<rootdir>/logs/ms-find-<timestamp>.log`, as JSON lines when
//! requested.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "msfind_cli=info,msfind_core=info,msfind_package=info,msfind_models=info";

/// Keeps the file writer flushing until the end of the run
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

/// Install the global subscriber. The returned guard must live until the program exits.
pub fn init_logging(logs_dir: &Path, json: bool) -> anyhow::Result<LogGuard> {
    fs::create_dir_all(logs_dir)?;
    let (writer, file_guard, log_file) = create_file_writer(logs_dir);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter())
        .with(console_layer);

    if json {
        let file_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer);
        subscriber.with(file_layer).try_init()?;
    } else {
        let file_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer);
        subscriber.with(file_layer).try_init()?;
    }

    tracing::info!(log_file = %log_file.display(), json, "Logging initialized");

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file,
    })
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// One file per run, named after the start time
fn create_file_writer(logs_dir: &Path) -> (NonBlocking, WorkerGuard, PathBuf) {
    let file_name = log_file_name(Local::now());
    let appender = tracing_appender::rolling::never(logs_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    (non_blocking, guard, logs_dir.join(file_name))
}

fn log_file_name<Tz: chrono::TimeZone>(started: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("ms-find-{}.log", started.format("%Y%m%d-%H%M%S"))
}
