// src/watch/pattern.rs

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::errors::{Error, Result};

/// Trailing directory segment marking "watch this tree recursively".
const RECURSIVE_MARKER: &str = "...";

/// A parsed watch rule: root directory + filename glob + recursive flag.
///
/// Parsed from strings of the form `<dir>[/...]/<glob>`, e.g. `src/.../*.rs`
/// watches `src` and all of its subdirectories for `*.rs` basenames.
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct Pattern {
    dir: PathBuf,
    file: String,
    matcher: GlobMatcher,
    recursive: bool,
}

impl Pattern {
    pub fn parse(spec: &str) -> Result<Pattern> {
        let invalid = |reason: String| Error::InvalidPattern {
            spec: spec.to_string(),
            reason,
        };

        let path = Path::new(spec);
        let file = path
            .file_name()
            .ok_or_else(|| invalid("missing file glob segment".to_string()))?
            .to_string_lossy()
            .into_owned();

        let mut dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let recursive = dir.file_name().is_some_and(|name| name == RECURSIVE_MARKER);
        if recursive {
            dir = match dir.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
        }

        // Absolute paths give stable comparisons and readable log output.
        let dir = std::path::absolute(&dir)
            .map_err(|err| invalid(format!("get absolute path failed: {err}")))?;

        let meta = fs::metadata(&dir)
            .map_err(|err| invalid(format!("stat {dir:?} failed: {err}")))?;
        if !meta.is_dir() {
            return Err(invalid(format!("{dir:?} is not a directory")));
        }

        let matcher = Glob::new(&file)
            .map_err(|err| invalid(format!("'{file}' is a bad glob: {err}")))?
            .compile_matcher();

        Ok(Pattern {
            dir,
            file,
            matcher,
            recursive,
        })
    }

    /// Root directory the pattern is anchored at (always absolute).
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Glob match against a file basename only.
    pub fn match_name(&self, filename: &str) -> bool {
        self.matcher.is_match(filename)
    }

    /// Whether files in `dir` are covered by this pattern: exact equality
    /// when non-recursive, component-boundary prefix match when recursive.
    pub fn match_dir(&self, dir: &Path) -> bool {
        if self.recursive {
            dir.starts_with(&self.dir)
        } else {
            dir == self.dir
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.dir == other.dir && self.file == other.file
    }
}

impl Eq for Pattern {}
