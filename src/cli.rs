// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

const LONG_ABOUT: &str = "\
rewatch reloads your program after the files it watches change.

Run it from the root of your project. Jobs are described in a TOML config
file, `rewatch.toml` by default (override with `-f <path>`); the job named
`main` runs unless `-n <name>` selects another.

Any trailing arguments are appended to the exec command line, so you can pass
extra flags straight through to your program.";

/// Command-line arguments for `rewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rewatch",
    version,
    about = "Watch files, rebuild, and restart your program on change.",
    long_about = LONG_ABOUT
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(short, long, value_name = "PATH", default_value = "rewatch.toml")]
    pub file: String,

    /// Name of the job to run.
    #[arg(short, long, value_name = "NAME", default_value = "main")]
    pub name: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Extra arguments appended to the exec command line.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
