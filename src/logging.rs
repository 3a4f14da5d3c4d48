//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! stdout carries the plugin protocol response, so log lines go to a file
//! (`CFY_MOUNT_LOG`, default `/var/log/cfy-mount.log`). When that file
//! cannot be opened the subscriber writes to stderr instead and the open
//! error is returned so the caller can log it.
//!
//! The filter comes from `CFY_MOUNT_LOG_LEVEL` (an `EnvFilter` directive
//! such as `debug` or `cfy_mount=trace`), defaulting to `info`.

use std::fs::File;
use std::io;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::OpenOptions;
use cap_std::fs_utf8::Dir;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Environment variable naming the log file.
pub const LOG_FILE_ENV: &str = "CFY_MOUNT_LOG";
/// Log file used when [`LOG_FILE_ENV`] is unset.
pub const DEFAULT_LOG_FILE: &str = "/var/log/cfy-mount.log";
/// Environment variable holding the filter directive.
pub const LOG_LEVEL_ENV: &str = "CFY_MOUNT_LOG_LEVEL";

/// Where log lines ended up after [`init_logging`].
#[derive(Debug)]
pub enum LogSink {
    /// Appending to the named file.
    File(Utf8PathBuf),
    /// Writing to stderr because the file could not be opened.
    Stderr {
        /// File that was attempted.
        path: Utf8PathBuf,
        /// Reason the file could not be used.
        error: io::Error,
    },
}

/// Returns the log file path, honouring [`LOG_FILE_ENV`].
#[must_use]
pub fn log_file_path() -> Utf8PathBuf {
    std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map_or_else(|| Utf8PathBuf::from(DEFAULT_LOG_FILE), Utf8PathBuf::from)
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(path: &Utf8Path) -> io::Result<File> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "log path does not name a file")
    })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    let file = dir.open_with(file_name, OpenOptions::new().create(true).append(true))?;
    Ok(file.into_std())
}

/// Initialise the global logging subscriber.
///
/// Later calls leave the first subscriber in place and report the rejected
/// initialisation through it at `debug` level.
pub fn init_logging() -> LogSink {
    let path = log_file_path();
    match open_log_file(&path) {
        Ok(file) => {
            let installed = fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .try_init();
            report_init_failure(&installed);
            LogSink::File(path)
        }
        Err(error) => {
            let installed = fmt()
                .with_env_filter(filter())
                .with_target(true)
                .with_writer(io::stderr)
                .try_init();
            report_init_failure(&installed);
            LogSink::Stderr { path, error }
        }
    }
}

fn report_init_failure(result: &Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>) {
    if let Err(err) = result {
        debug!(error = %err, "logging subscriber already installed, keeping it");
    }
}
