//! Background activities for the dirdex daemon
//!
//! This crate provides:
//! - A polling tailer that turns history file appends into byte deltas,
//!   with I/O errors on a separate channel
//! - The ingest loop feeding those deltas into the store's history ranking
//! - Periodic re-indexing of the filesystem root

pub mod ingest;
pub mod reindex;
pub mod tail;

pub use ingest::run_ingest_loop;
pub use reindex::{run_pass, PeriodicIndexer};
pub use tail::{HistoryTailer, TailError, TailHandle};
