//! Filesystem indexer
//!
//! A pass walks the root, collects every directory not pruned by the skip
//! list, then applies the whole list to the store in one critical section
//! followed by reconciliation. The walk itself runs without the lock, so
//! lookups keep being served while the disk is scanned.

use crate::skip::SkipList;
use crate::store::{PassStats, Store};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Collect every directory under `root` (root included), pruning skipped
/// subtrees. Unreadable or vanished nodes are logged and skipped.
pub fn walk_directories(root: &Path, skip: &SkipList) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let skipped = e.file_type().is_dir() && skip.matches(e.path());
            if skipped {
                debug!("Skipping {}", e.path().display());
            }
            !skipped
        });

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => debug!("Skipping unreadable entry: {}", e),
        }
    }

    dirs
}

/// Walks one root into a shared store
#[derive(Debug, Clone)]
pub struct Indexer {
    store: Arc<Store>,
    root: PathBuf,
    skip: SkipList,
}

impl Indexer {
    pub fn new(store: Arc<Store>, root: impl Into<PathBuf>, skip: SkipList) -> Self {
        Self {
            store,
            root: root.into(),
            skip,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Run one full pass: walk, upsert, reconcile.
    ///
    /// Fails without touching the store when the root itself is not a
    /// readable directory, so a missing mount never empties the index.
    pub fn reindex(&self) -> Result<PassStats> {
        let start = Instant::now();

        let meta = std::fs::metadata(&self.root)
            .with_context(|| format!("Failed to read index root {}", self.root.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("Index root {} is not a directory", self.root.display());
        }

        let dirs = walk_directories(&self.root, &self.skip);

        let mut pass = self.store.begin_pass();
        for dir in dirs {
            pass.upsert_path_candidate(dir);
        }
        let stats = pass.reconcile();

        info!(
            "Indexing of {} took {:?} ({} dirs, {} new, {} removed)",
            self.root.display(),
            start.elapsed(),
            stats.seen,
            stats.added,
            stats.removed
        );
        Ok(stats)
    }
}
