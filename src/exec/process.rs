// src/exec/process.rs

use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::config::ExecConfig;
use crate::errors::Result;
use crate::exec::command::CommandSpec;

/// Interval between kill retries when the OS refuses the request. Retries
/// have no attempt ceiling; they stop only once the kill succeeds or the
/// process has already exited.
const KILL_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// How one supervised run ended.
#[derive(Debug)]
pub enum ProcessExit {
    /// The process ended on its own; the job goes dormant on this.
    Exited(ExitStatus),
    /// Waiting on the process failed at the OS level.
    WaitFailed(std::io::Error),
    /// The process ended because we killed it.
    Killed,
}

/// The long-lived command a job supervises. One `ProcessHandle` is created
/// per cycle via [`ManagedProcess::start`].
#[derive(Debug)]
pub struct ManagedProcess {
    cmd: CommandSpec,
}

impl ManagedProcess {
    pub fn new(cfg: &ExecConfig, extra_args: &[String]) -> Result<ManagedProcess> {
        Ok(ManagedProcess {
            cmd: CommandSpec::new(cfg, extra_args)?,
        })
    }

    pub fn script(&self) -> &str {
        self.cmd.script()
    }

    /// Spawn the process and its waiter task.
    ///
    /// The waiter owns the OS child for the whole run: it reaps the exit and
    /// services kill requests, reporting the outcome once on a single-slot
    /// channel.
    pub fn start(&self) -> Result<ProcessHandle> {
        let child = self.cmd.spawn()?;
        let running = Arc::new(AtomicBool::new(true));
        let (kill_tx, kill_rx) = mpsc::channel(1);
        let (exit_tx, exit_rx) = mpsc::channel(1);

        tokio::spawn(wait_process(child, Arc::clone(&running), kill_rx, exit_tx));

        Ok(ProcessHandle {
            running,
            kill_tx,
            exit_rx,
        })
    }
}

/// Handle to one running instance of the supervised process.
///
/// The running flag transitions true→false exactly once per run, via natural
/// exit or via [`ProcessHandle::kill`], whichever happens first. It is what
/// distinguishes "exit we caused" from "exit that happened on its own".
#[derive(Debug)]
pub struct ProcessHandle {
    running: Arc<AtomicBool>,
    kill_tx: mpsc::Sender<()>,
    exit_rx: mpsc::Receiver<ProcessExit>,
}

impl ProcessHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Block until the process ends, one way or the other.
    pub async fn wait(&mut self) -> ProcessExit {
        match self.exit_rx.recv().await {
            Some(exit) => exit,
            // The waiter task never drops its sender before reporting, so
            // this only happens after the report was already consumed.
            None => ProcessExit::Killed,
        }
    }

    /// Kill the process and wait for it to be gone.
    ///
    /// The running flag is cleared *before* the kill request is issued so a
    /// racing natural exit is recognized as caused by us. Killing a process
    /// that is no longer running is a no-op.
    pub async fn kill(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("kill: the process was not running, skip killing");
            return;
        }
        // A send error means the waiter already finished; the exit report
        // below still resolves either way.
        let _ = self.kill_tx.send(()).await;
        // Do not return until the process is confirmed dead, so the caller
        // can rebuild without racing the old instance.
        let _ = self.exit_rx.recv().await;
    }
}

async fn wait_process(
    mut child: Child,
    running: Arc<AtomicBool>,
    mut kill_rx: mpsc::Receiver<()>,
    exit_tx: mpsc::Sender<ProcessExit>,
) {
    loop {
        tokio::select! {
            status = child.wait() => {
                let natural = running.swap(false, Ordering::SeqCst);
                let exit = match status {
                    Ok(status) if natural => ProcessExit::Exited(status),
                    Ok(_) => ProcessExit::Killed,
                    Err(err) => ProcessExit::WaitFailed(err),
                };
                debug!("process exited: {exit:?}");
                let _ = exit_tx.send(exit).await;
                return;
            }
            Some(_) = kill_rx.recv() => {
                kill_with_retry(&mut child).await;
                // Loop again; the wait arm reaps and reports the exit.
            }
        }
    }
}

/// Issue the kill, retrying on a fixed interval until it succeeds or the
/// child has already exited. Transient failures are never surfaced to the
/// user as errors.
async fn kill_with_retry(child: &mut Child) {
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(err) => debug!("try_wait failed: {err}"),
        }
        match child.start_kill() {
            Ok(()) => return,
            Err(err) => {
                let pid = child.id();
                error!("failed to kill the process {pid:?}: {err}, retrying in 1s");
                sleep(KILL_RETRY_INTERVAL).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvMap;

    fn process(script: &str) -> ManagedProcess {
        ManagedProcess::new(
            &ExecConfig {
                env: EnvMap::new(),
                script: script.to_string(),
            },
            &[],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn natural_exit_is_reported_with_status() {
        let mut handle = process("true").start().unwrap();
        match handle.wait().await {
            ProcessExit::Exited(status) => assert!(status.success()),
            other => panic!("expected natural exit, got {other:?}"),
        }
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn non_zero_exit_is_still_a_natural_exit() {
        let mut handle = process("false").start().unwrap();
        match handle.wait().await {
            ProcessExit::Exited(status) => assert!(!status.success()),
            other => panic!("expected natural exit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn kill_stops_a_long_running_process() {
        let mut handle = process("sleep 3600").start().unwrap();
        assert!(handle.is_running());
        handle.kill().await;
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn killing_an_exited_process_is_a_noop() {
        let mut handle = process("true").start().unwrap();
        match handle.wait().await {
            ProcessExit::Exited(_) => {}
            other => panic!("unexpected exit: {other:?}"),
        }
        // Running flag is already false; this must neither hang nor error.
        handle.kill().await;
        handle.kill().await;
    }
}
