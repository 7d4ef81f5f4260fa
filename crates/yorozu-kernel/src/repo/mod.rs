//! Durable storage configuration.
//!
//! The repository is the source of truth across restarts; the in-memory
//! registry is rebuilt from it on startup. Only the lifecycle manager talks
//! to the repository, never the routing path.

mod sqlite;

use std::io;

use thiserror::Error;
use yorozu_types::{Storage, StorageId};

pub use sqlite::SqliteStorageRepository;

/// Repository error.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No row with this id.
    #[error("storage {0} not found")]
    NotFound(StorageId),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence for storage configuration rows.
pub trait StorageRepository: Send + Sync {
    /// Insert a new row, returning the assigned id. `storage.id` is ignored.
    fn create(&self, storage: &Storage) -> RepoResult<StorageId>;

    /// Overwrite the row with `storage.id`.
    fn update(&self, storage: &Storage) -> RepoResult<()>;

    fn delete_by_id(&self, id: StorageId) -> RepoResult<()>;

    fn get_by_id(&self, id: StorageId) -> RepoResult<Storage>;

    /// One page of rows ordered by `index`, plus the total row count.
    ///
    /// `page_index` is 1-based.
    fn list(&self, page_index: usize, page_size: usize) -> RepoResult<(Vec<Storage>, u64)>;
}
