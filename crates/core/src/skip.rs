//! Directories excluded from indexing
//!
//! An entry matches either a directory's base name (`.git`) or its full
//! path (`/home/me/tmp`). A match prunes the whole subtree.

use ahash::AHashSet;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct SkipList {
    entries: AHashSet<String>,
}

impl SkipList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(Into::into)
                .filter(|e: &String| !e.is_empty())
                .collect(),
        }
    }

    /// Parse the comma-separated command line form (`.git,.hg`)
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the base name or the full path is listed
    pub fn matches(&self, path: &Path) -> bool {
        if self.entries.is_empty() {
            return false;
        }

        let base_match = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.entries.contains(name));

        base_match
            || path
                .to_str()
                .is_some_and(|full| self.entries.contains(full))
    }

    /// True when `path` or one of its ancestors matches, i.e. the walk
    /// would never reach it
    pub fn covers(&self, path: &Path) -> bool {
        !self.entries.is_empty() && path.ancestors().any(|p| self.matches(p))
    }
}
