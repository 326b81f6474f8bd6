// src/exec/command.rs

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::info;

use crate::config::{EnvMap, ExecConfig};
use crate::errors::{Error, Result};

/// A runnable command built from a script string.
///
/// The script is tokenized on whitespace into a program name and arguments;
/// there is no shell interpretation. The env overlay is applied on top of the
/// inherited environment, overlay winning on key conflicts. stdin/stdout/
/// stderr are wired to the controlling terminal unmodified.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    name: String,
    args: Vec<String>,
    env: EnvMap,
    script: String,
}

impl CommandSpec {
    pub fn new(cfg: &ExecConfig, extra_args: &[String]) -> Result<CommandSpec> {
        let mut fields = cfg.script.split_whitespace();
        let name = fields.next().ok_or(Error::EmptyScript)?.to_string();
        let mut args: Vec<String> = fields.map(str::to_string).collect();
        args.extend(extra_args.iter().cloned());

        Ok(CommandSpec {
            name,
            args,
            env: cfg.env.clone(),
            script: cfg.script.clone(),
        })
    }

    /// The original script string, for diagnostics.
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Log the command line the way it will run, env overlay first.
    fn show(&self) {
        let cmdline = if self.args.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.args.join(" "))
        };
        if self.env.is_empty() {
            info!("exec: {cmdline}");
        } else {
            let env: Vec<String> = self
                .env
                .iter()
                .map(|(key, val)| format!("{key}={val}"))
                .collect();
            info!("exec: {} {cmdline}", env.join(" "));
        }
    }

    fn os_command(&self) -> Command {
        let mut cmd = Command::new(&self.name);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }

    /// Run to completion: used for build steps. Non-zero exit is an error.
    pub async fn run(&self) -> Result<()> {
        self.show();
        let status = self.os_command().status().await?;
        if !status.success() {
            return Err(Error::Build {
                script: self.script.clone(),
                status,
            });
        }
        Ok(())
    }

    /// Launch asynchronously: used for the supervised exec step.
    pub fn spawn(&self) -> Result<Child> {
        self.show();
        let mut cmd = self.os_command();
        // If the tool itself is torn down, the child must not outlive it.
        cmd.kill_on_drop(true);
        Ok(cmd.spawn()?)
    }
}
