//! Error types for storage lifecycle and routing.

use thiserror::Error;

use crate::driver::DriverError;
use crate::repo::RepoError;

/// Storage lifecycle and routing error.
///
/// Lifecycle steps wrap the underlying cause with a short description of the
/// step that failed; the cause stays reachable through `source()`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No mount at a virtual path, or no persisted storage for an id.
    #[error("not found: {0}")]
    NotFound(String),

    /// No constructor registered for the requested driver type.
    #[error("unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// Attempt to change a field that is fixed at creation.
    #[error("{0} cannot be changed")]
    ImmutableField(&'static str),

    /// Repository I/O failed.
    #[error("{context}: {source}")]
    Persistence {
        context: &'static str,
        #[source]
        source: RepoError,
    },

    /// A driver's `init` or `shutdown` failed.
    #[error("{context}: {source}")]
    DriverLifecycle {
        context: &'static str,
        #[source]
        source: DriverError,
    },

    /// A driver's addition could not be serialized.
    #[error("{context}: {source}")]
    Serialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Create a NotFound error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Wrap a repository error. A missing row is reported as `NotFound`.
    pub(crate) fn persistence(context: &'static str, source: RepoError) -> Self {
        match source {
            RepoError::NotFound(id) => Self::NotFound(format!("{context}: storage {id}")),
            source => Self::Persistence { context, source },
        }
    }

    pub(crate) fn driver(context: &'static str, source: DriverError) -> Self {
        Self::DriverLifecycle { context, source }
    }

    /// Returns true for the `NotFound` kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
