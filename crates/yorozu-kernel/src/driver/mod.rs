//! Storage drivers.
//!
//! A driver owns the live runtime state of exactly one mounted storage
//! (credentials, connection handles, cached tokens). The routing core only
//! needs four things from it:
//!
//! - [`Driver::init`] - bind to a storage configuration and acquire resources
//! - [`Driver::shutdown`] - release resources
//! - [`Driver::storage`] - the live copy of the bound configuration
//! - [`Driver::addition`] - driver-specific configuration, for persistence
//!
//! Driver types are looked up by name in a [`DriverRegistry`].

pub mod backends;
mod registry;

use std::future::Future;
use std::io;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use yorozu_types::Storage;

pub use registry::{DriverConstructor, DriverRegistry};

/// Driver lifecycle error.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The addition blob could not be parsed for this driver type.
    #[error("invalid addition: {0}")]
    InvalidAddition(#[from] serde_json::Error),

    /// The addition parsed but describes an unusable configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// I/O error talking to the backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The driver context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Backend refused or is unreachable.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Execution context handed to `init` and `shutdown`.
///
/// Cancellation is the only control the routing layer exposes; drivers are
/// expected to wrap their backend I/O with [`DriverContext::run`].
#[derive(Debug, Clone, Default)]
pub struct DriverContext {
    cancel: CancellationToken,
}

impl DriverContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context driven by an existing cancellation token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the context is already cancelled.
    pub fn check(&self) -> DriverResult<()> {
        if self.is_cancelled() {
            Err(DriverError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run a backend future, resolving to `Cancelled` if the context is
    /// cancelled first.
    pub async fn run<T, F>(&self, fut: F) -> DriverResult<T>
    where
        F: Future<Output = DriverResult<T>>,
    {
        self.cancel
            .run_until_cancelled(fut)
            .await
            .unwrap_or(Err(DriverError::Cancelled))
    }
}

/// A storage backend bound to one mounted storage.
///
/// Implementations use interior mutability: `init` and `shutdown` take
/// `&self` because the instance is shared through the registry while it is
/// reinitialized.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Bind to `storage` and acquire backend resources.
    ///
    /// `storage.id` is already assigned when this is called.
    async fn init(&self, ctx: &DriverContext, storage: Storage) -> DriverResult<()>;

    /// Release backend resources. The instance may be re-initialized afterwards.
    async fn shutdown(&self, ctx: &DriverContext) -> DriverResult<()>;

    /// Live copy of the bound storage configuration.
    fn storage(&self) -> Storage;

    /// Driver-specific configuration, in the shape persisted as `addition`.
    fn addition(&self) -> serde_json::Result<serde_json::Value>;
}

impl std::fmt::Debug for dyn Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").finish_non_exhaustive()
    }
}

/// Parse an addition blob; an empty blob yields the driver's defaults.
pub fn parse_addition<T>(raw: &str) -> DriverResult<T>
where
    T: DeserializeOwned + Default,
{
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(raw)?)
}
