//! Wire protocol between the `dirdex` client and the daemon
//!
//! One JSON object per line in each direction:
//!
//! ```text
//! -> {"type":"get","name":"last"}
//! <- {"type":"dlist","dirs":"e;/src/top/next/last"}
//! <- {"type":"error","kind":"not_found","message":"No entry for directory last"}
//! ```
//!
//! `dirs` is a `:`-joined list of tagged entries: `e;<full path>` for exact
//! matches and `p;<base name>` for partial ones. The tags only exist here;
//! everything else works with [`Resolution`].

use dirdex_core::Resolution;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const EXACT_TAG: &str = "e;";
const PARTIAL_TAG: &str = "p;";
const SEPARATOR: char = ':';

/// Client-to-server message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Resolve a directory name
    Get { name: String },
}

/// Server-to-client message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Dlist(Dlist),
    Error { kind: ErrorKind, message: String },
}

/// Why a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Nothing matched; an ordinary empty result
    NotFound,
    /// Malformed request or server-side failure
    Internal,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown entry tag in {0:?}")]
    UnknownTag(String),
}

/// Encoded candidate list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dlist {
    pub dirs: String,
}

impl Dlist {
    pub fn encode(results: &[Resolution]) -> Self {
        let dirs = results
            .iter()
            .map(|r| match r {
                Resolution::Exact(path) => format!("{}{}", EXACT_TAG, path.to_string_lossy()),
                Resolution::Partial(name) => format!("{}{}", PARTIAL_TAG, name),
            })
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string());
        Self { dirs }
    }

    /// Decode the tagged list. A `:` not followed by a tag is treated as part
    /// of the previous entry, so paths containing `:` survive.
    pub fn decode(&self) -> Result<Vec<Resolution>, ProtocolError> {
        if self.dirs.is_empty() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<String> = Vec::new();
        for piece in self.dirs.split(SEPARATOR) {
            let tagged = piece.starts_with(EXACT_TAG) || piece.starts_with(PARTIAL_TAG);
            match entries.last_mut() {
                Some(last) if !tagged => {
                    last.push(SEPARATOR);
                    last.push_str(piece);
                }
                _ => entries.push(piece.to_string()),
            }
        }

        entries
            .into_iter()
            .map(|entry| {
                if let Some(path) = entry.strip_prefix(EXACT_TAG) {
                    Ok(Resolution::Exact(PathBuf::from(path)))
                } else if let Some(name) = entry.strip_prefix(PARTIAL_TAG) {
                    Ok(Resolution::Partial(name.to_string()))
                } else {
                    Err(ProtocolError::UnknownTag(entry))
                }
            })
            .collect()
    }
}

impl Request {
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_line(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

impl Response {
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_line(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }
}
