// src/watch/ignore.rs

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{Error, Result};

/// A validated list of basename globs to suppress.
///
/// Built once at startup; every glob must compile or the watcher refuses to
/// start.
#[derive(Debug, Clone)]
pub struct IgnoreList {
    set: GlobSet,
}

impl IgnoreList {
    pub fn new(patterns: &[String]) -> Result<IgnoreList> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|source| Error::InvalidIgnore {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| Error::InvalidIgnore {
            pattern: patterns.join(", "),
            source,
        })?;
        Ok(IgnoreList { set })
    }

    /// True if any ignore glob matches the basename.
    pub fn matches(&self, basename: &str) -> bool {
        self.set.is_match(basename)
    }
}
