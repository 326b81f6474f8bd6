// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Parsing watch pattern strings (`<dir>[/...]/<glob>`) and matching paths
//!   against them.
//! - Maintaining the dynamic set of directories registered with the OS
//!   notification primitive, growing it as new directories appear under
//!   recursive patterns.
//! - Turning raw filesystem events into a filtered, bounded stream of
//!   `ChangeEvent`s.
//!
//! It does **not** know about build steps or the supervised process; it only
//! reports relevant file changes.

pub mod ignore;
pub mod pattern;
pub mod watcher;

pub use ignore::IgnoreList;
pub use pattern::Pattern;
pub use watcher::{ChangeEvent, WatchCloser, WatchHandle};
