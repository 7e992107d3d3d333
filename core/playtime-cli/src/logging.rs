//! Logging setup: human-readable stderr plus a daily rolling file.
//!
//! `PLAYTIME_DEBUG_LOG=1` turns on debug output; otherwise `RUST_LOG` is
//! honoured, falling back to `info`. Stderr only carries warnings so prompts
//! stay readable.

use std::env;

use playtime_core::StorageConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const DEBUG_ENV: &str = "PLAYTIME_DEBUG_LOG";

fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn file_filter() -> EnvFilter {
    if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber. Keep the returned guard alive for the
/// whole run; dropping it flushes the file writer.
///
/// Creates the data directory layout first. If that fails, logs go to
/// stderr only.
pub fn init(storage: &StorageConfig) -> Option<WorkerGuard> {
    let stderr_filter = if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(stderr_filter);

    if let Err(err) = storage.ensure_dirs() {
        tracing_subscriber::registry().with(stderr_layer).init();
        tracing::warn!(error = %err, "Could not create log directory, file logging disabled");
        return None;
    }

    let appender = tracing_appender::rolling::daily(storage.logs_dir(), "playtime.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_filter(file_filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Some(guard)
}
