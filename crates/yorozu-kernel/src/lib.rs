//! # yorozu-kernel
//!
//! Aggregates many storage backends into one virtual namespace.
//!
//! Each storage is mounted at a virtual path. Lookups route to the deepest
//! matching mount; several storages may share one logical mount point as a
//! balance group (`/movies`, `/movies.balance1`, ...) and are rotated
//! round-robin. Where mounts nest below a path that no storage owns, folder
//! entries are synthesized so the namespace can still be browsed.
//!
//! - [`StorageManager`] - Lifecycle (create/update/delete) and routing entry point
//! - [`StorageRegistry`] - Concurrent mount path → driver map
//! - [`Balancer`] - Round-robin over balance groups
//! - [`Driver`] - Backend contract, looked up by name in a [`DriverRegistry`]
//! - [`StorageRepository`] - Durable configuration ([`SqliteStorageRepository`])
//!
//! ## Consistency
//!
//! The registry is an in-memory cache of the repository's rows. Lifecycle
//! sequences are not transactional; on restart the registry is rebuilt from
//! the repository with [`StorageManager::load_storages`].

pub mod balance;
pub mod config;
pub mod driver;
pub mod error;
pub mod manager;
pub mod mount;
pub mod registry;
pub mod repo;

pub use balance::Balancer;
pub use config::{ConfigError, YorozuConfig};
pub use driver::{
    Driver, DriverConstructor, DriverContext, DriverError, DriverRegistry, DriverResult,
    backends::{LocalAddition, LocalDriver, MemoryAddition, MemoryDriver},
};
pub use error::{StorageError, StorageResult};
pub use manager::StorageManager;
pub use mount::MountInfo;
pub use registry::StorageRegistry;
pub use repo::{RepoError, RepoResult, SqliteStorageRepository, StorageRepository};

pub use yorozu_types::{Storage, StorageId, VirtualObject};
