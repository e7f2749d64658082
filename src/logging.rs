//! Tracing subscriber setup.
//!
//! Log lines always go to stdout in the compact format, filtered through
//! `RUST_LOG` (level `info` when unset). A second non-ANSI layer appends to
//! the log file named in [`crate::config::Config::log_file`]; when that file
//! cannot be opened the process still runs with stdout logging alone.

use std::fs::{File, OpenOptions, create_dir_all};
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// Keeps the non-blocking writer flushing for the process lifetime.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber, appending to `log_file` when possible.
pub fn init_tracing(log_file: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry().with(filter).with(stdout_layer);

    match open_log_file(log_file) {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = FILE_GUARD.set(guard);
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false).compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

/// Open the log file for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
        && let Err(err) = create_dir_all(parent)
    {
        eprintln!("Could not create log directory {}: {err}", parent.display());
        return None;
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("Could not open log file {}: {err}", path.display());
            None
        }
    }
}
