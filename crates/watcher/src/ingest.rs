//! History ingest loop
//!
//! Drains a [`TailHandle`] into a [`HistoryIngestor`] until the tailer
//! reports an error or goes away. Ending the loop only stops rank updates;
//! the store keeps serving what it already holds.

use crate::tail::TailHandle;
use dirdex_core::HistoryIngestor;
use tracing::{debug, warn};

/// Consume deltas until the tailer fails. Returns the number of deltas applied.
pub async fn run_ingest_loop(ingestor: HistoryIngestor, mut handle: TailHandle) -> usize {
    let mut processed = 0;

    loop {
        tokio::select! {
            // Drain pending deltas before acting on an error
            biased;

            Some(delta) = handle.deltas.recv() => {
                debug!("Processing {} received bytes from history", delta.len());
                ingestor.ingest(&delta);
                processed += 1;
            }
            Some(err) = handle.errors.recv() => {
                warn!("History watcher stopped, ranking updates disabled: {}", err);
                break;
            }
            else => break,
        }
    }

    handle.abort();
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tail::HistoryTailer;
    use dirdex_core::{Resolution, SkipList, Store};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loop_applies_history_then_stops_on_error() {
        let temp_dir = TempDir::new().unwrap();
        let hist = temp_dir.path().join("histfile");
        fs::write(&hist, "cd ~/testdata/foo\ncd ~/testdata/foo\n").unwrap();

        let store = Arc::new(Store::new());
        {
            let mut pass = store.begin_pass();
            pass.upsert_path_candidate(PathBuf::from("/root/foo"));
            pass.reconcile();
        }

        let ingestor = HistoryIngestor::new(store.clone(), "/this/home", SkipList::default());
        let handle = HistoryTailer::new(&hist, Duration::from_millis(20)).spawn();
        let task = tokio::spawn(run_ingest_loop(ingestor, handle));

        // Give the first poll time to land, then break the watched file
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::remove_file(&hist).unwrap();

        let processed = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(processed, 1);

        assert_eq!(
            store.resolve("foo").unwrap()[0],
            Resolution::Exact(PathBuf::from("/this/home/testdata/foo"))
        );
    }
}
