//! Name resolution against the store
//!
//! An exact base-name match yields every ranked full path. Otherwise each
//! base name containing the query is offered as a partial match, sorted
//! lexicographically.

use crate::ranking::DirectoryEntry;
use crate::store::Store;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// One lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Full path of a directory whose base name equals the query
    Exact(PathBuf),
    /// Base name containing the query; needs a second, exact lookup
    Partial(String),
}

impl Resolution {
    pub fn is_exact(&self) -> bool {
        matches!(self, Resolution::Exact(_))
    }

    /// The path or base name carried by this result
    pub fn value(&self) -> String {
        match self {
            Resolution::Exact(path) => path.to_string_lossy().into_owned(),
            Resolution::Partial(name) => name.clone(),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("No entry for directory {name}")]
    NotFound { name: String },
}

impl Store {
    /// Resolve `name` under a single lock acquisition
    pub fn resolve(&self, name: &str) -> Result<Vec<Resolution>, ResolveError> {
        let inner = self.lock();

        if let Some(entry) = inner.entries.get(name) {
            return Ok(exact(entry));
        }

        debug!("No direct match for {}, starting partial check", name);
        let mut partial: Vec<&String> = inner
            .entries
            .keys()
            .filter(|key| key.contains(name))
            .collect();

        if partial.is_empty() {
            return Err(ResolveError::NotFound {
                name: name.to_string(),
            });
        }

        partial.sort_unstable();
        Ok(partial
            .into_iter()
            .map(|key| Resolution::Partial(key.clone()))
            .collect())
    }
}

fn exact(entry: &DirectoryEntry) -> Vec<Resolution> {
    entry
        .ranked_paths()
        .into_iter()
        .map(Resolution::Exact)
        .collect()
}
