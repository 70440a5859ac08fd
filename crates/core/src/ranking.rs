//! Per-base-name candidate ranking
//!
//! Every directory base name known to the index owns one [`DirectoryEntry`]
//! holding two independently ranked candidate lists:
//! - history candidates, ordered by how often the shell `cd`-ed there
//! - path candidates, ordered by depth (shallower first)

use ahash::AHashSet;
use std::path::{Path, PathBuf};

/// A single full path that can answer a lookup for its base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Full path of the directory
    pub path: PathBuf,
    /// Number of observed `cd` invocations targeting this path
    pub count: u64,
    /// Number of path segments (root included)
    pub depth: usize,
}

impl Candidate {
    /// Candidate discovered by walking the filesystem
    pub fn from_walk(path: PathBuf) -> Self {
        let depth = path_depth(&path);
        Self { path, count: 0, depth }
    }

    /// Candidate discovered in shell history
    pub fn from_history(path: PathBuf, count: u64) -> Self {
        let depth = path_depth(&path);
        Self { path, count, depth }
    }
}

/// Segment count used for depth ranking: `/a/b` has depth 3
pub fn path_depth(path: &Path) -> usize {
    path.components().count()
}

/// Ranked candidates for one base name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Sorted descending by `count`
    history_candidates: Vec<Candidate>,
    /// Sorted ascending by `depth`
    path_candidates: Vec<Candidate>,
    /// Every full path present in either list
    known_paths: AHashSet<PathBuf>,
}

impl DirectoryEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_candidates(&self) -> &[Candidate] {
        &self.history_candidates
    }

    pub fn path_candidates(&self) -> &[Candidate] {
        &self.path_candidates
    }

    /// Whether `path` is represented in either candidate list
    pub fn knows(&self, path: &Path) -> bool {
        self.known_paths.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.history_candidates.is_empty() && self.path_candidates.is_empty()
    }

    /// Insert a walked path. Returns false when it is already a path candidate.
    pub fn add_path_candidate(&mut self, path: PathBuf) -> bool {
        // A history-only path is known but still needs its path candidate
        if self.known_paths.contains(&path)
            && self.path_candidates.iter().any(|c| c.path == path)
        {
            return false;
        }

        self.known_paths.insert(path.clone());
        self.path_candidates.push(Candidate::from_walk(path));
        // Stable sort keeps discovery order among equal depths
        self.path_candidates.sort_by_key(|c| c.depth);
        true
    }

    /// Add `count` visits to `path`, appending it when new, then re-rank
    pub fn add_history_candidate(&mut self, path: PathBuf, count: u64) {
        match self.history_candidates.iter_mut().find(|c| c.path == path) {
            Some(existing) => existing.count += count,
            None => {
                self.known_paths.insert(path.clone());
                self.history_candidates.push(Candidate::from_history(path, count));
            }
        }
        self.history_candidates
            .sort_by(|a, b| b.count.cmp(&a.count));
    }

    /// Drop `path` from both lists. Returns true if anything was removed.
    pub fn remove_path(&mut self, path: &Path) -> bool {
        if !self.known_paths.remove(path) {
            return false;
        }
        self.history_candidates.retain(|c| c.path != path);
        self.path_candidates.retain(|c| c.path != path);
        true
    }

    /// Ranked full paths: history order first, then depth order, each path once
    pub fn ranked_paths(&self) -> Vec<PathBuf> {
        let mut seen = AHashSet::with_capacity(self.known_paths.len());
        self.history_candidates
            .iter()
            .chain(self.path_candidates.iter())
            .filter(|c| seen.insert(c.path.as_path()))
            .map(|c| c.path.clone())
            .collect()
    }
}
