// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::model::{ConfigFile, JobConfig};
use crate::config::validate::normalize_job;
use crate::errors::{Error, Result};

/// Load a configuration file from a given path and return the raw
/// `ConfigFile`.
///
/// This only performs TOML deserialization; it does **not** normalize any
/// job. Use [`load_job`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {path:?}"))?;

    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML config from {path:?}"))?;

    Ok(config)
}

/// Load the config file and extract a single normalized job by name.
///
/// This is the entry point used by the CLI:
///
/// - Reads TOML.
/// - Looks up the requested job (`Error::JobNotFound` when missing).
/// - Normalizes it: `watch` must be present, default ignores are appended.
pub fn load_job(path: impl AsRef<Path>, name: &str) -> Result<JobConfig> {
    let mut config = load_from_path(path)?;

    let mut job = config
        .jobs
        .remove(name)
        .ok_or_else(|| Error::JobNotFound(name.to_string()))?;

    normalize_job(name, &mut job)?;
    Ok(job)
}
