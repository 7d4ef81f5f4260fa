//! Durable storage configuration.

use serde::{Deserialize, Serialize};

use crate::ids::StorageId;
use crate::path;

/// A storage's configuration, as persisted and as bound to a live driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    /// Assigned by the repository on first persist.
    #[serde(default)]
    pub id: StorageId,
    /// Normalized virtual path the storage is mounted at.
    pub mount_path: String,
    /// Display and listing precedence (ascending).
    #[serde(default)]
    pub index: i32,
    /// Driver type name; immutable once created.
    pub driver: String,
    /// Driver-specific configuration, serialized as JSON.
    #[serde(default)]
    pub addition: String,
    /// Last configuration change, Unix millis.
    #[serde(default)]
    pub modified: u64,
}

impl Storage {
    /// Create an unpersisted storage for the given mount path and driver type.
    pub fn new(mount_path: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            id: StorageId::UNASSIGNED,
            mount_path: mount_path.into(),
            index: 0,
            driver: driver.into(),
            addition: String::new(),
            modified: 0,
        }
    }

    pub fn with_addition(mut self, addition: impl Into<String>) -> Self {
        self.addition = addition.into();
        self
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }

    pub fn with_id(mut self, id: StorageId) -> Self {
        self.id = id;
        self
    }

    /// Whether this storage is a marked member of a balance group.
    pub fn is_balance(&self) -> bool {
        path::is_balance(&self.mount_path)
    }

    /// Mount path with any balance marker removed.
    pub fn actual_virtual_path(&self) -> &str {
        path::actual_virtual_path(&self.mount_path)
    }
}
