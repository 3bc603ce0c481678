//! Tracing initialization for the headless and terminal modes.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log to stderr. `RUST_LOG` takes precedence over `default_level`.
pub(crate) fn init_stderr(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Append logs to a file, keeping the terminal free for the dashboard.
pub(crate) fn init_file(default_level: &str, path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
