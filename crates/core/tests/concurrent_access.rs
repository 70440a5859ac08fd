//! Readers racing index passes and history ingestion
//!
//! A writer flips the tree between two layouts and re-indexes after each
//! flip while another thread ingests history. Readers check that every
//! lookup sees one complete, correctly ordered state.

use dirdex_core::{HistoryIngestor, Indexer, Resolution, SkipList, Store};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const PASSES: usize = 60;

/// `next` directories present in both layouts
const STABLE: &[&str] = &["next", "a/next", "b/c/next"];

/// Exactly one of these exists at a time
const FLIP_A: &str = "gone/next";
const FLIP_B: &str = "x/y/next";

/// Releases the worker threads even if the writer panics
struct StopOnDrop<'a>(&'a AtomicBool);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn check_entry_order(store: &Store) {
    let snapshot = store.snapshot();
    let entry = snapshot.get("next").expect("next is always indexed");

    let history = entry.history_candidates();
    assert!(
        history.windows(2).all(|w| w[0].count >= w[1].count),
        "history counts out of order: {:?}",
        history
    );

    let paths = entry.path_candidates();
    assert!(
        paths.windows(2).all(|w| w[0].depth <= w[1].depth),
        "path depths out of order: {:?}",
        paths
    );
}

fn check_resolution(root: &Path, results: &[Resolution]) {
    let has = |rel: &str| results.contains(&Resolution::Exact(root.join(rel)));

    for rel in STABLE {
        assert!(has(rel), "stable path {} missing from {:?}", rel, results);
    }
    // A pass lands as a whole: never both layouts, never neither
    assert!(
        has(FLIP_A) != has(FLIP_B),
        "partially reconciled result: {:?}",
        results
    );
}

#[test]
fn test_lookups_never_see_partial_passes() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    for rel in STABLE.iter().chain([&FLIP_A]) {
        fs::create_dir_all(root.join(rel)).unwrap();
    }

    let store = Arc::new(Store::new());
    let indexer = Indexer::new(Arc::clone(&store), &root, SkipList::default());
    indexer.reindex().unwrap();

    let ingestor = HistoryIngestor::new(Arc::clone(&store), "/home/me", SkipList::default());
    let history = format!(
        "cd {}\ncd ~/work/next\ncd {}\ncd {}\n",
        root.join("a/next").display(),
        root.join("b/c/next").display(),
        root.join("a/next").display(),
    );

    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let results = store.resolve("next").unwrap();
                    check_resolution(&root, &results);
                    check_entry_order(&store);
                }
            });
        }

        s.spawn(|| {
            while !done.load(Ordering::Acquire) {
                ingestor.ingest(history.as_bytes());
            }
        });

        let _stop = StopOnDrop(&done);
        let mut present = FLIP_A;
        let mut absent = FLIP_B;
        for _ in 0..PASSES {
            fs::remove_dir_all(root.join(present).parent().unwrap()).unwrap();
            fs::create_dir_all(root.join(absent)).unwrap();
            std::mem::swap(&mut present, &mut absent);

            indexer.reindex().unwrap();

            // Once the pass is applied the removed layout is gone for good
            let results = store.resolve("next").unwrap();
            assert!(!results.contains(&Resolution::Exact(root.join(absent))));
            assert!(results.contains(&Resolution::Exact(root.join(present))));
        }
    });

    // History kept accruing on the stable paths only
    ingestor.ingest(history.as_bytes());
    let ranked: Vec<PathBuf> = store.get("next").unwrap();
    assert_eq!(ranked[0], root.join("a/next"));
}
