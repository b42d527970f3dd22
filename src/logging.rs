//! File-based tracing setup. The terminal belongs to the UI, so log output
//! goes to `library-manager.log` instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_NAME: &str = "library-manager.log";

/// Install the global subscriber, appending to the log file inside
/// `log_dir`. `RUST_LOG` overrides `default_level`.
pub fn init(log_dir: &Path, default_level: &str) -> Result<PathBuf> {
    fs::create_dir_all(log_dir).context("failed to create log directory")?;

    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("library_manager={default_level}")))
        .context("invalid log level")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(path)
}
