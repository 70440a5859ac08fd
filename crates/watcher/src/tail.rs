//! History file tailer
//!
//! A `notify` poll watcher reports changes to the history file on the
//! monitor interval; the tailer turns each change into the bytes appended
//! since the previous read. The existing contents are delivered first.
//! Only complete lines are delivered; a trailing partial line waits for its
//! newline. A file that shrinks is treated as rotated and re-read from the
//! start.
//!
//! Deltas and errors travel on separate channels. After the first error
//! the tailer stops.

use notify::{Event, PollWatcher, RecursiveMode, Watcher};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Channel depth for pending deltas
const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum TailError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Tailer for one file
#[derive(Debug)]
pub struct HistoryTailer {
    path: PathBuf,
    /// Poll interval handed to the watcher
    interval: Duration,
    /// Byte offset just past the last delivered newline
    offset: u64,
}

/// Receiving side of a spawned tailer
pub struct TailHandle {
    pub deltas: mpsc::Receiver<Vec<u8>>,
    pub errors: mpsc::Receiver<TailError>,
    task: JoinHandle<()>,
}

impl TailHandle {
    /// Stop watching
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl HistoryTailer {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            offset: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read complete lines appended since the last call
    pub async fn read_delta(&mut self) -> Result<Option<Vec<u8>>, TailError> {
        let mut file = File::open(&self.path).await.map_err(|source| TailError::Open {
            path: self.path.clone(),
            source,
        })?;

        let len = file
            .metadata()
            .await
            .map_err(|source| self.read_error(source))?
            .len();

        if len < self.offset {
            debug!("{} shrank, re-reading from start", self.path.display());
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(self.offset))
            .await
            .map_err(|source| self.read_error(source))?;

        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        file.read_to_end(&mut buf)
            .await
            .map_err(|source| self.read_error(source))?;

        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(None);
        };
        buf.truncate(last_newline + 1);
        self.offset += buf.len() as u64;

        Ok(Some(buf))
    }

    fn read_error(&self, source: std::io::Error) -> TailError {
        TailError::Read {
            path: self.path.clone(),
            source,
        }
    }

    fn watch_error(&self, source: notify::Error) -> TailError {
        TailError::Watch {
            path: self.path.clone(),
            source,
        }
    }

    /// Tail in a background task until the first error or until every
    /// receiver is gone
    pub fn spawn(mut self) -> TailHandle {
        let (delta_tx, deltas) = mpsc::channel(CHANNEL_CAPACITY);
        let (error_tx, errors) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            if let Err(e) = self.stream(&delta_tx).await {
                let _ = error_tx.send(e).await;
            }
        });

        TailHandle {
            deltas,
            errors,
            task,
        }
    }

    /// Deliver the current contents, then one delta per reported change
    async fn stream(&mut self, deltas: &mpsc::Sender<Vec<u8>>) -> Result<(), TailError> {
        // A missing file fails here, before any watch is set up
        if !self.forward(deltas).await? {
            return Ok(());
        }

        let (event_tx, mut events) = mpsc::unbounded_channel();
        let config = notify::Config::default()
            .with_poll_interval(self.interval)
            .with_compare_contents(true);
        let mut watcher = PollWatcher::new(
            move |event: notify::Result<Event>| {
                let _ = event_tx.send(event);
            },
            config,
        )
        .map_err(|source| self.watch_error(source))?;
        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|source| self.watch_error(source))?;

        // Catch appends that landed before the watcher took its first scan
        if !self.forward(deltas).await? {
            return Ok(());
        }

        while let Some(event) = events.recv().await {
            let event = event.map_err(|source| self.watch_error(source))?;
            debug!("History file event: {:?}", event.kind);
            if !self.forward(deltas).await? {
                break;
            }
        }
        Ok(())
    }

    /// Send the next delta, if any. False once every receiver is gone.
    async fn forward(&mut self, deltas: &mpsc::Sender<Vec<u8>>) -> Result<bool, TailError> {
        match self.read_delta().await? {
            Some(delta) => {
                debug!("Read {} new bytes from {}", delta.len(), self.path.display());
                Ok(deltas.send(delta).await.is_ok())
            }
            None => Ok(true),
        }
    }
}
