//! Listing entries fabricated by the routing layer.

use serde::{Deserialize, Serialize};

/// A folder-like entry that stands for deeper mount points.
///
/// No backend stores these; they exist so that `/a` can be listed when only
/// `/a/b` and `/a/c` are mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualObject {
    /// Entry name (a single path segment).
    pub name: String,
    /// Always zero for synthetic folders.
    pub size: u64,
    /// Modification time (Unix millis) of the storage that produced the entry.
    pub modified: u64,
    pub is_folder: bool,
}

impl VirtualObject {
    /// Create a synthetic folder entry.
    pub fn folder(name: impl Into<String>, modified: u64) -> Self {
        Self {
            name: name.into(),
            size: 0,
            modified,
            is_folder: true,
        }
    }
}
