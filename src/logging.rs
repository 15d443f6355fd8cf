//! Tracing setup for the command-line client.
//!
//! Two sinks: stderr, filtered by `RUST_LOG` (default `warn`), and a per-run
//! `log-<unix>.log` file in `dir` at `info`.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const STDERR_DEFAULT_FILTER: &str = "warn";
const FILE_FILTER: &str = "info";

#[must_use]
pub fn log_file_path(dir: &Path, unix_timestamp: i64) -> PathBuf {
    dir.join(format!("log-{unix_timestamp}.log"))
}

/// Install the global subscriber. Returns the log file path.
pub fn init(dir: &Path, unix_timestamp: i64) -> io::Result<PathBuf> {
    let path = log_file_path(dir, unix_timestamp);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(STDERR_DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(stderr_filter),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(EnvFilter::new(FILE_FILTER)),
        )
        .try_init()
        .map_err(io::Error::other)?;

    Ok(path)
}
