// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod watch;

use tracing::debug;

use crate::cli::CliArgs;
use crate::job::Job;

/// High-level entry point used by `main.rs`.
///
/// Loads and normalizes the selected job from the config file, wires up the
/// watcher and supervisor, and runs until shutdown.
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let cfg = config::load_job(&args.file, &args.name)?;
    debug!("loaded job '{}' from {}", args.name, args.file);

    let job = Job::new(&args.name, cfg, &args.args)?;
    job.run().await;
    Ok(())
}
