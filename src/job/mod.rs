// src/job/mod.rs

//! The job orchestrator.
//!
//! A job alternates cycles: run the build steps in order, start the exec
//! process, then race "process exited" against "kill requested by a debounced
//! file change". A kill restarts the cycle; a natural exit parks the job
//! until the next relevant change. Build or process failures never take the
//! tool down; it keeps watching.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::{EnvMap, ExecConfig, JobConfig, effective_delay};
use crate::errors::{Error, Result};
use crate::exec::{CommandSpec, ManagedProcess, ProcessExit};
use crate::watch::{ChangeEvent, WatchHandle};

/// Fallback exec when a job configures none: the job then only runs its
/// build steps on change, with this placeholder standing in as the
/// supervised process.
const PLACEHOLDER_EXEC: &str = "sleep 3600";

enum CycleEnd {
    /// Kill-triggered restart: go straight into the next cycle.
    Restart,
    /// Build failed or the process exited on its own: wait for the next
    /// change before starting a new cycle.
    Dormant,
    /// The kill-signal source closed: leave the loop permanently.
    Shutdown,
}

pub struct Job {
    watcher: WatchHandle,
    builds: Vec<CommandSpec>,
    process: ManagedProcess,
    delay: Duration,
}

impl Job {
    /// Build a job from a normalized config: start the watcher, prepare the
    /// build and exec commands with the job env overlaid by step env, and
    /// validate the debounce delay.
    ///
    /// `extra_args` are appended to the exec command line only.
    pub fn new(name: &str, cfg: JobConfig, extra_args: &[String]) -> Result<Job> {
        let watch_cfg = cfg
            .watch
            .as_ref()
            .ok_or_else(|| Error::MissingWatch(name.to_string()))?;
        let watcher = WatchHandle::run(watch_cfg)?;

        let mut builds = Vec::with_capacity(cfg.build.len());
        for step in &cfg.build {
            let step = ExecConfig {
                env: merge_env(&cfg.env, &step.env),
                script: step.script.clone(),
            };
            builds.push(CommandSpec::new(&step, &[])?);
        }

        let process = match &cfg.exec {
            Some(exec) => {
                let exec = ExecConfig {
                    env: merge_env(&cfg.env, &exec.env),
                    script: exec.script.clone(),
                };
                ManagedProcess::new(&exec, extra_args)?
            }
            None => {
                debug!("no exec for job '{name}', using placeholder {PLACEHOLDER_EXEC:?}");
                ManagedProcess::new(
                    &ExecConfig {
                        env: EnvMap::new(),
                        script: PLACEHOLDER_EXEC.to_string(),
                    },
                    &[],
                )?
            }
        };

        let delay = effective_delay(cfg.delay.as_deref())?;

        Ok(Job {
            watcher,
            builds,
            process,
            delay,
        })
    }

    /// Run the job until shutdown. Blocks for the process lifetime of the
    /// tool.
    pub async fn run(mut self) {
        let Some(changes) = self.watcher.take_stream() else {
            error!("change stream already taken, cannot run job");
            return;
        };

        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);
        tokio::spawn(debounce(changes, self.delay, kill_tx));

        // Ctrl-C closes the watcher; shutdown then cascades through the
        // change stream, the debounce loop, and the kill channel.
        let closer = self.watcher.closer();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                closer.close();
            }
        });

        loop {
            match self.run_cycle(&mut kill_rx).await {
                CycleEnd::Restart => continue,
                CycleEnd::Shutdown => break,
                CycleEnd::Dormant => match kill_rx.recv().await {
                    Some(()) => continue,
                    None => break,
                },
            }
        }
        info!("job exiting");
    }

    async fn run_cycle(&mut self, kill_rx: &mut mpsc::Receiver<()>) -> CycleEnd {
        for build in &self.builds {
            if let Err(err) = build.run().await {
                error!("{err}");
                // The exec step never starts after a failed build.
                return CycleEnd::Dormant;
            }
        }

        let mut handle = match self.process.start() {
            Ok(handle) => handle,
            Err(err) => {
                error!("failed to start process '{}': {err}", self.process.script());
                return CycleEnd::Dormant;
            }
        };

        tokio::select! {
            exit = handle.wait() => {
                match exit {
                    ProcessExit::Exited(status) if status.success() => {
                        info!("process exited");
                    }
                    ProcessExit::Exited(status) => {
                        error!("process exited with {status}");
                    }
                    ProcessExit::WaitFailed(err) => {
                        error!("failed waiting for process: {err}");
                    }
                    ProcessExit::Killed => {
                        debug!("process reported killed without a kill request");
                    }
                }
                // No respawn on our own; the next change wakes us up.
                CycleEnd::Dormant
            }
            signal = kill_rx.recv() => {
                handle.kill().await;
                match signal {
                    Some(()) => {
                        info!("file change detected, restarting");
                        CycleEnd::Restart
                    }
                    None => {
                        info!("the process was interrupted by closing");
                        CycleEnd::Shutdown
                    }
                }
            }
        }
    }
}

/// Coalesce bursts of change events into single kill signals.
///
/// The first event of a burst starts a timer for `delay`; events arriving
/// while the timer is pending are discarded, never requeued. When the timer
/// fires, exactly one kill signal is sent. The loop ends when the change
/// stream closes or the kill receiver is gone.
pub async fn debounce(
    mut changes: mpsc::Receiver<ChangeEvent>,
    delay: Duration,
    kill_tx: mpsc::Sender<()>,
) {
    while let Some(event) = changes.recv().await {
        debug!("job: received change: {}", event.path.display());

        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);
        loop {
            tokio::select! {
                _ = &mut timer => break,
                more = changes.recv() => match more {
                    Some(event) => {
                        debug!("job: discarded overflow change: {}", event.path.display());
                    }
                    None => return,
                },
            }
        }

        if kill_tx.send(()).await.is_err() {
            return;
        }
    }
    debug!("change stream closed, debounce loop exiting");
}

/// Overlay `step` on top of `job`; step entries win on key conflicts.
fn merge_env(job: &EnvMap, step: &EnvMap) -> EnvMap {
    let mut merged = job.clone();
    for (key, val) in step {
        merged.insert(key.clone(), val.clone());
    }
    merged
}
