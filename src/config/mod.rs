// src/config/mod.rs

//! Configuration loading and normalization for rewatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file and select a job (`loader.rs`).
//! - Normalize and validate job invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_from_path, load_job};
pub use model::{ConfigFile, EnvMap, ExecConfig, JobConfig, WatchConfig};
pub use validate::{effective_delay, normalize_job};
