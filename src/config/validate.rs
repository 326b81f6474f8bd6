// src/config/validate.rs

use std::time::Duration;

use tracing::debug;

use crate::config::model::JobConfig;
use crate::errors::{Error, Result};

/// Ignore entries that are always present, configured or not.
const DEFAULT_IGNORES: &[&str] = &[".git"];

pub const MIN_DELAY: Duration = Duration::from_secs(1);
pub const MAX_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// Normalize a job configuration in place.
///
/// - `watch` must be present.
/// - The default ignore entries are appended when not already configured.
pub fn normalize_job(name: &str, job: &mut JobConfig) -> Result<()> {
    let watch = job
        .watch
        .as_mut()
        .ok_or_else(|| Error::MissingWatch(name.to_string()))?;

    for default in DEFAULT_IGNORES {
        if !watch.ignore.iter().any(|ignore| ignore == default) {
            watch.ignore.push(default.to_string());
        }
    }

    Ok(())
}

/// Resolve the effective debounce delay for a job.
///
/// An absent delay falls back to [`DEFAULT_DELAY`]; a configured one must
/// parse and land in `[MIN_DELAY, MAX_DELAY]`.
pub fn effective_delay(delay: Option<&str>) -> Result<Duration> {
    let Some(raw) = delay else {
        debug!("no delay configured, using default {:?}", DEFAULT_DELAY);
        return Ok(DEFAULT_DELAY);
    };

    let delay = parse_duration(raw).map_err(|reason| Error::InvalidDelay {
        delay: raw.to_string(),
        reason,
    })?;

    if delay < MIN_DELAY {
        return Err(Error::InvalidDelay {
            delay: raw.to_string(),
            reason: "the minimum value is '1s'".to_string(),
        });
    }
    if delay > MAX_DELAY {
        return Err(Error::InvalidDelay {
            delay: raw.to_string(),
            reason: "the maximum value is '60s'".to_string(),
        });
    }

    Ok(delay)
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
