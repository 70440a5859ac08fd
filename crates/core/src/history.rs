//! Shell history ingestion
//!
//! History arrives as raw byte deltas appended to the shell's history file.
//! Each line is either a bare command or a `;`-separated record whose last
//! field is the command (zsh extended history: `: 1700000000:0;cd ~/src`).
//!
//! Accepted command grammar:
//!
//! ```text
//! command := ws* "cd" ws+ target ws*
//! target  := "/" rest | "~/" rest     (optionally wrapped in ' or ")
//! ```
//!
//! A leading `~` expands to the configured home directory. Trailing `/` is
//! trimmed, and targets without a base name (`/`, `~`) are ignored, as are
//! `~user` forms.
//!
//! Targets the indexer would skip (the target itself or any ancestor is on
//! the skip list) are dropped before they reach the store.

use crate::skip::SkipList;
use crate::store::Store;
use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Extract the `cd` target from one history line
pub fn parse_cd_target(line: &str, home: &Path) -> Option<PathBuf> {
    let command = line.rsplit(';').next()?.trim();
    let rest = command.strip_prefix("cd")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let target = unquote(rest.trim()).trim_end_matches('/');

    if target.starts_with('/') {
        return Some(PathBuf::from(target));
    }

    // Bare "~" has nothing after the prefix and falls out here too
    let relative = target.strip_prefix("~/")?;
    if relative.is_empty() {
        return None;
    }
    Some(home.join(relative))
}

fn unquote(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = s
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner;
        }
    }
    s
}

/// Count `cd` targets in a delta, one entry per distinct path
pub fn aggregate(delta: &[u8], home: &Path) -> Vec<(PathBuf, u64)> {
    let text = String::from_utf8_lossy(delta);
    let mut counts: AHashMap<PathBuf, u64> = AHashMap::new();

    for line in text.lines() {
        if let Some(path) = parse_cd_target(line, home) {
            *counts.entry(path).or_insert(0) += 1;
        }
    }

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    counts
}

/// Result of ingesting one delta
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Distinct `cd` targets found in the delta
    pub targets: usize,
    /// Targets whose base name was indexed and received rank
    pub applied: usize,
    /// Targets dropped because their base name is not indexed
    pub dropped: usize,
    /// Targets dropped because they are inside a skipped directory
    pub skipped: usize,
}

/// Feeds history deltas into the store's history ranking
#[derive(Debug, Clone)]
pub struct HistoryIngestor {
    store: Arc<Store>,
    home: PathBuf,
    skip: SkipList,
}

impl HistoryIngestor {
    pub fn new(store: Arc<Store>, home: impl Into<PathBuf>, skip: SkipList) -> Self {
        Self {
            store,
            home: home.into(),
            skip,
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Apply one delta as a single batch under the store lock
    pub fn ingest(&self, delta: &[u8]) -> IngestStats {
        if delta.is_empty() {
            return IngestStats::default();
        }

        // Parse before locking so readers only wait for the store updates
        let mut counts = aggregate(delta, &self.home);
        if counts.is_empty() {
            return IngestStats::default();
        }

        let targets = counts.len();
        counts.retain(|(path, _)| !self.skip.covers(path));
        let skipped = targets - counts.len();

        let mut batch = self.store.history_batch();
        for (path, count) in counts {
            batch.upsert_history_candidate(path, count);
        }
        let (applied, dropped) = batch.counts();
        drop(batch);

        debug!(
            "Ingested {} bytes of history: {} targets, {} applied, {} dropped, {} skipped",
            delta.len(),
            targets,
            applied,
            dropped,
            skipped
        );

        IngestStats {
            targets,
            applied,
            dropped,
            skipped,
        }
    }
}
