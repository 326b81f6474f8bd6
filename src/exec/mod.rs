// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] builds OS commands from script strings (whitespace
//!   tokenization, env overlay) and runs one-shot build steps.
//! - [`process`] supervises the long-lived exec step: spawn, wait, and
//!   kill-with-retry, with the running-flag handshake that tells a caused
//!   exit apart from a crash.

pub mod command;
pub mod process;

pub use command::CommandSpec;
pub use process::{ManagedProcess, ProcessExit, ProcessHandle};
