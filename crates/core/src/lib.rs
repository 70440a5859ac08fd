//! Dirdex Core - directory index and ranking engine
//!
//! This crate provides:
//! - Candidate ranking per directory base name (history + depth)
//! - The shared, lock-guarded directory store
//! - Filesystem indexing with generation-based reconciliation
//! - Shell history parsing and rank ingestion
//! - Exact / partial name resolution

pub mod history;
pub mod indexer;
pub mod ranking;
pub mod resolve;
pub mod skip;
pub mod store;

// Re-export main types for convenience
pub use history::{parse_cd_target, HistoryIngestor, IngestStats};
pub use indexer::{walk_directories, Indexer};
pub use ranking::{Candidate, DirectoryEntry};
pub use resolve::{Resolution, ResolveError};
pub use skip::SkipList;
pub use store::{PassStats, Store};

/// Common result type used throughout dirdex-core
pub type Result<T> = anyhow::Result<T>;
