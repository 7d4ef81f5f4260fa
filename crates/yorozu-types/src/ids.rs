//! Typed storage identifier.
//!
//! Ids are assigned by the repository when a storage is first persisted.
//! `StorageId::UNASSIGNED` (zero) marks a configuration that has not been
//! written yet.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Repository-assigned storage identifier.
#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(u64);

impl StorageId {
    /// Sentinel for a storage that has not been persisted.
    pub const UNASSIGNED: StorageId = StorageId(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value, as stored in the database.
    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for StorageId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<StorageId> for u64 {
    fn from(id: StorageId) -> u64 {
        id.0
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageId({})", self.0)
    }
}
