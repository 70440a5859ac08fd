//! Shared directory store
//!
//! Maps a directory base name to its [`DirectoryEntry`]. All state sits
//! behind a single mutex and is only reachable through lock-scoped
//! operations:
//! - [`Store::begin_pass`] for one index pass (upserts + sweep)
//! - [`Store::history_batch`] for one history delta
//! - [`Store::resolve`] and the read helpers for lookups
//!
//! Liveness is generation based: every walked path records the generation
//! of the last pass that saw it. Reconciliation sweeps the paths whose
//! generation is stale. An entry lives only while at least one walked path
//! backs it; history candidates alone never keep a name resolvable.

use crate::ranking::DirectoryEntry;
use ahash::AHashMap;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory index shared by the indexer, history ingestor and resolver
#[derive(Debug, Default)]
pub struct Store {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
pub(crate) struct StoreInner {
    /// Base name -> ranked candidates (every entry has a path candidate)
    pub(crate) entries: AHashMap<String, DirectoryEntry>,
    /// Walked full path -> generation of the last pass that saw it
    liveness: AHashMap<PathBuf, u64>,
    /// Generation of the most recent pass
    generation: u64,
}

/// Outcome of one reconciled index pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub generation: u64,
    /// Directories marked live in this pass
    pub seen: usize,
    /// Paths that were new to the store
    pub added: usize,
    /// Paths swept because the pass did not see them
    pub removed: usize,
    /// Entries deleted because no walked path was left
    pub entries_removed: usize,
}

/// Base name used as the store key
pub fn base_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock()
    }

    /// Start an index pass. The store stays locked until the pass is
    /// reconciled or dropped.
    pub fn begin_pass(&self) -> IndexPass<'_> {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let generation = inner.generation;
        IndexPass {
            inner,
            stats: PassStats {
                generation,
                ..PassStats::default()
            },
        }
    }

    /// Start a history update batch, holding the lock until dropped
    pub fn history_batch(&self) -> HistoryBatch<'_> {
        HistoryBatch {
            inner: self.inner.lock(),
            applied: 0,
            dropped: 0,
        }
    }

    /// Number of base names in the store
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().entries.contains_key(name)
    }

    /// Generation of the last index pass (0 before the first pass)
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Ranked full paths for an exact base name
    pub fn get(&self, name: &str) -> Option<Vec<PathBuf>> {
        self.inner.lock().entries.get(name).map(DirectoryEntry::ranked_paths)
    }

    /// Consistent ordered copy of every entry
    pub fn snapshot(&self) -> BTreeMap<String, DirectoryEntry> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect()
    }
}

/// One index pass holding the store lock
pub struct IndexPass<'a> {
    inner: MutexGuard<'a, StoreInner>,
    stats: PassStats,
}

impl IndexPass<'_> {
    /// Mark `path` live and insert it as a path candidate of its base name.
    /// Returns true when the path was new.
    pub fn upsert_path_candidate(&mut self, path: PathBuf) -> bool {
        let Some(name) = base_name(&path) else {
            return false;
        };

        let generation = self.stats.generation;
        self.inner.liveness.insert(path.clone(), generation);
        self.stats.seen += 1;

        let entry = self.inner.entries.entry(name).or_insert_with(|| {
            debug!("Creating new directory reference for {}", path.display());
            DirectoryEntry::new()
        });

        let added = entry.add_path_candidate(path);
        if added {
            self.stats.added += 1;
        }
        added
    }

    /// Sweep every path not seen by this pass and release the lock
    pub fn reconcile(mut self) -> PassStats {
        let generation = self.stats.generation;
        let inner = &mut *self.inner;

        let stale: Vec<PathBuf> = inner
            .liveness
            .iter()
            .filter(|(_, seen)| **seen < generation)
            .map(|(path, _)| path.clone())
            .collect();

        for path in &stale {
            inner.liveness.remove(path);
            let Some(name) = base_name(path) else {
                continue;
            };
            let Some(entry) = inner.entries.get_mut(&name) else {
                continue;
            };

            if entry.remove_path(path) {
                debug!("Removed vanished path {}", path.display());
                self.stats.removed += 1;
            }
            if entry.path_candidates().is_empty() {
                debug!("Dropping {} with no remaining directory on disk", name);
                inner.entries.remove(&name);
                self.stats.entries_removed += 1;
            }
        }

        self.stats
    }
}

/// One history delta's worth of rank updates holding the store lock
pub struct HistoryBatch<'a> {
    inner: MutexGuard<'a, StoreInner>,
    applied: usize,
    dropped: usize,
}

impl HistoryBatch<'_> {
    /// Add `count` visits to `path`. Only base names already indexed can
    /// accrue history rank; returns false when the update is dropped.
    pub fn upsert_history_candidate(&mut self, path: PathBuf, count: u64) -> bool {
        let Some(name) = base_name(&path) else {
            self.dropped += 1;
            return false;
        };

        match self.inner.entries.get_mut(&name) {
            Some(entry) => {
                debug!("Adding/updating history link {} -> {}", name, path.display());
                entry.add_history_candidate(path, count);
                self.applied += 1;
                true
            }
            None => {
                self.dropped += 1;
                false
            }
        }
    }

    /// (applied, dropped) update counts so far
    pub fn counts(&self) -> (usize, usize) {
        (self.applied, self.dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(store: &Store, paths: &[&str]) -> PassStats {
        let mut pass = store.begin_pass();
        for path in paths {
            pass.upsert_path_candidate(PathBuf::from(path));
        }
        pass.reconcile()
    }

    #[test]
    fn test_pass_creates_entries() {
        let store = Store::new();
        let stats = apply(&store, &["/r", "/r/top", "/r/top/next", "/r/next"]);

        assert_eq!(stats.generation, 1);
        assert_eq!(stats.added, 4);
        assert_eq!(stats.removed, 0);
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.get("next"),
            Some(vec![PathBuf::from("/r/next"), PathBuf::from("/r/top/next")])
        );
    }

    #[test]
    fn test_repeated_pass_is_identical() {
        let store = Store::new();
        let paths = ["/r", "/r/b/foo", "/r/a/foo", "/r/foo"];
        apply(&store, &paths);
        let before = store.snapshot();

        let stats = apply(&store, &paths);
        assert_eq!(stats.added, 0);
        assert_eq!(stats.removed, 0);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_reconcile_sweeps_missing_paths() {
        let store = Store::new();
        apply(&store, &["/r", "/r/next", "/r/rand/next", "/r/deleted", "/r/rand"]);

        let stats = apply(&store, &["/r", "/r/next", "/r/rand"]);
        assert_eq!(stats.removed, 2);
        assert_eq!(stats.entries_removed, 1);
        assert!(!store.contains("deleted"));
        assert_eq!(store.get("next"), Some(vec![PathBuf::from("/r/next")]));
    }

    #[test]
    fn test_reconcile_removes_history_for_vanished_path() {
        let store = Store::new();
        apply(&store, &["/r/foo", "/r/x/foo"]);
        {
            let mut batch = store.history_batch();
            assert!(batch.upsert_history_candidate(PathBuf::from("/r/x/foo"), 3));
        }

        apply(&store, &["/r/foo"]);
        assert_eq!(store.get("foo"), Some(vec![PathBuf::from("/r/foo")]));
    }

    #[test]
    fn test_history_only_paths_survive_reconcile() {
        let store = Store::new();
        apply(&store, &["/r/foo"]);
        {
            let mut batch = store.history_batch();
            batch.upsert_history_candidate(PathBuf::from("/home/me/foo"), 2);
        }

        apply(&store, &["/r/foo"]);
        assert_eq!(
            store.get("foo"),
            Some(vec![PathBuf::from("/home/me/foo"), PathBuf::from("/r/foo")])
        );
    }

    #[test]
    fn test_history_alone_does_not_keep_entry_alive() {
        let store = Store::new();
        apply(&store, &["/r", "/r/foo"]);
        {
            let mut batch = store.history_batch();
            assert!(batch.upsert_history_candidate(PathBuf::from("/this/home/gone/foo"), 4));
        }

        let stats = apply(&store, &["/r"]);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.entries_removed, 1);
        assert!(!store.contains("foo"));
        assert!(store.resolve("foo").is_err());

        // History for the name is dropped again until a walk brings it back
        let mut batch = store.history_batch();
        assert!(!batch.upsert_history_candidate(PathBuf::from("/this/home/gone/foo"), 1));
    }

    #[test]
    fn test_history_dropped_for_unknown_base_name() {
        let store = Store::new();
        apply(&store, &["/r/foo"]);

        let mut batch = store.history_batch();
        assert!(!batch.upsert_history_candidate(PathBuf::from("/home/bar"), 1));
        assert!(batch.upsert_history_candidate(PathBuf::from("/home/foo"), 1));
        assert_eq!(batch.counts(), (1, 1));
        drop(batch);

        assert!(!store.contains("bar"));
    }

    #[test]
    fn test_generation_advances_per_pass() {
        let store = Store::new();
        assert_eq!(store.generation(), 0);
        apply(&store, &["/r"]);
        apply(&store, &["/r"]);
        assert_eq!(store.generation(), 2);
    }
}
