//! Run log: console plus durable file
//!
//! Both sinks receive the same events. The file sink appends to a single
//! never-rotated log; the guard returned by [`init`] must stay alive until the
//! process exits or buffered lines are lost.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::{InstallerError, Result};

/// Keeps the file writer flushing; drop it last
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "asl_extras=debug"
        } else {
            "asl_extras=info"
        })
    })
}

fn file_appender(path: &Path) -> std::result::Result<RollingFileAppender, String> {
    let dir = path
        .parent()
        .ok_or_else(|| format!("{} has no parent directory", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("{} has no file name", path.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| e.to_string())
}

/// Install the global subscriber
pub fn init(log_file: &Path, verbose: bool) -> Result<LogGuard> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(filter(verbose));

    let (file_layer, guard, open_error) = match file_appender(log_file) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(filter(verbose));
            (Some(layer), Some(guard), None)
        }
        Err(reason) => (None, None, Some(reason)),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| InstallerError::LogInitFailed {
            message: e.to_string(),
        })?;

    if let Some(reason) = open_error {
        tracing::warn!(
            "could not open {} ({reason}); logging to console only",
            log_file.display()
        );
    }

    Ok(LogGuard { _file: guard })
}
