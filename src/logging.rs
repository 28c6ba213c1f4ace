//! Tracing setup for the CLI

use crate::fs::ensure_directory;
use fs_err as fs;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Takes precedence over `--debug` and `--verbose`
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Filter directive for the given flags
pub fn log_level(verbose: bool, debug: bool) -> String {
    if let Some(level) = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .filter(|l| !l.trim().is_empty())
    {
        return level;
    }

    if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    }
    .to_string()
}

/// Log to stderr, and to `log_file` when it can be opened
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(verbose: bool, debug: bool, log_file: Option<&Path>) {
    let level = log_level(verbose, debug);
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = log_file.and_then(open_log_file).map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    // Use try_init to avoid panicking if logger is already initialized (e.g., in tests)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init();
}

fn open_log_file(path: &Path) -> Option<fs::File> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent, crate::config::DEFAULT_DIR_PERMISSION).ok()?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .ok()
}
