// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Environment variable overlay used at the job and step level.
pub type EnvMap = BTreeMap<String, String>;

/// Top-level configuration as read from a TOML file.
///
/// Jobs are named tables:
///
/// ```toml
/// [jobs.main]
/// delay = "3s"
///
/// [jobs.main.watch]
/// pattern = ["src/.../*.rs"]
/// ignore = ["*.tmp"]
///
/// [[jobs.main.build]]
/// script = "cargo build"
///
/// [jobs.main.exec]
/// script = "./target/debug/app"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// All jobs from `[jobs.<name>]`. Keys are the job names.
    #[serde(default)]
    pub jobs: BTreeMap<String, JobConfig>,
}

/// `[jobs.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobConfig {
    /// Debounce delay as a duration string (e.g. `"3s"`).
    ///
    /// Must resolve to a value in `[1s, 60s]`; `3s` when omitted.
    #[serde(default)]
    pub delay: Option<String>,

    /// What to watch. Required; its absence is a config error.
    #[serde(default)]
    pub watch: Option<WatchConfig>,

    /// Ordered build steps, run to completion before the exec step.
    #[serde(default)]
    pub build: Vec<ExecConfig>,

    /// The long-lived process to supervise.
    ///
    /// When omitted, a placeholder `sleep 3600` process is supervised so the
    /// job still reacts to changes by re-running the build steps.
    #[serde(default)]
    pub exec: Option<ExecConfig>,

    /// Job-level environment, overlaid by step-level `env` on conflicts.
    #[serde(default)]
    pub env: EnvMap,
}

/// `[jobs.<name>.watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchConfig {
    /// Basename globs to suppress. `.git` is always appended when missing.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Watch pattern strings, `<dir>[/...]/<glob>`.
    #[serde(default)]
    pub pattern: Vec<String>,
}

/// A runnable step: a script string plus an environment overlay.
///
/// Used for both `[[jobs.<name>.build]]` entries and `[jobs.<name>.exec]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecConfig {
    #[serde(default)]
    pub env: EnvMap,

    /// Whitespace-tokenized command line; no shell interpretation.
    pub script: String,
}
