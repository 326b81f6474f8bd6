// src/errors.rs

//! Crate-wide error types.
//!
//! Startup errors (config, watch setup) bubble up through these variants and
//! terminate the process; runtime errors are logged and contained inside the
//! job loop.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid watch pattern '{spec}': {reason}")]
    InvalidPattern { spec: String, reason: String },

    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidIgnore {
        pattern: String,
        source: globset::Error,
    },

    #[error("job '{0}' has no watch section")]
    MissingWatch(String),

    #[error("job '{0}' not found in config")]
    JobNotFound(String),

    #[error("invalid delay '{delay}': {reason}")]
    InvalidDelay { delay: String, reason: String },

    #[error("failed to set up watch for {dir:?}: {source}")]
    WatchSetup {
        dir: PathBuf,
        source: notify::Error,
    },

    #[error("failed to create the filesystem watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    #[error("script cannot be empty")]
    EmptyScript,

    #[error("build step '{script}' failed with {status}")]
    Build { script: String, status: ExitStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
