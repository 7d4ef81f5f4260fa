//! Local filesystem driver.
//!
//! Mounts a directory of the host filesystem. `init` checks that the
//! configured root exists and is a directory, and canonicalizes it to handle
//! symlinks (e.g. macOS `/tmp` → `/private/tmp`).

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::fs;
use yorozu_types::Storage;

use crate::driver::{Driver, DriverContext, DriverError, DriverResult, parse_addition};

/// Configuration persisted in the storage's `addition` blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAddition {
    /// Absolute path of the directory to mount.
    #[serde(default)]
    pub root_folder: String,
}

/// Driver for a directory on the local filesystem.
#[derive(Debug, Default)]
pub struct LocalDriver {
    storage: RwLock<Storage>,
    addition: RwLock<LocalAddition>,
    /// Canonical root, present while initialized.
    root: RwLock<Option<PathBuf>>,
}

impl LocalDriver {
    pub const NAME: &'static str = "local";

    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical root directory, if initialized.
    pub fn root(&self) -> Option<PathBuf> {
        self.root.read().clone()
    }
}

#[async_trait]
impl Driver for LocalDriver {
    async fn init(&self, ctx: &DriverContext, storage: Storage) -> DriverResult<()> {
        let addition: LocalAddition = parse_addition(&storage.addition)?;
        if addition.root_folder.is_empty() {
            return Err(DriverError::InvalidConfig("root_folder is required".into()));
        }

        let requested = PathBuf::from(&addition.root_folder);
        let root = ctx
            .run(async {
                let meta = fs::metadata(&requested).await?;
                if !meta.is_dir() {
                    return Err(DriverError::InvalidConfig(format!(
                        "{} is not a directory",
                        requested.display()
                    )));
                }
                Ok(fs::canonicalize(&requested).await?)
            })
            .await?;

        tracing::debug!(mount_path = %storage.mount_path, root = %root.display(), "local storage ready");
        *self.root.write() = Some(root);
        *self.addition.write() = addition;
        *self.storage.write() = storage;
        Ok(())
    }

    async fn shutdown(&self, _ctx: &DriverContext) -> DriverResult<()> {
        self.root.write().take();
        Ok(())
    }

    fn storage(&self) -> Storage {
        self.storage.read().clone()
    }

    fn addition(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&*self.addition.read())
    }
}
