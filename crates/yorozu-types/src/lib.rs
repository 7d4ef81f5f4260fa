//! # yorozu-types
//!
//! Shared types for yorozu, the storage aggregation layer.
//!
//! - [`StorageId`] - Identity assigned by the repository on first persist
//! - [`Storage`] - A mounted storage's durable configuration
//! - [`VirtualObject`] - Folder entries fabricated from nested mount points
//! - [`path`] - Virtual path normalization and balance-group helpers

pub mod ids;
pub mod object;
pub mod path;
pub mod storage;

pub use ids::StorageId;
pub use object::VirtualObject;
pub use path::{BALANCE_MARKER, actual_virtual_path, is_balance, standardize_path};
pub use storage::Storage;

/// Current time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
