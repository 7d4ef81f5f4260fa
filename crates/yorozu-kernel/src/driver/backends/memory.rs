//! In-memory driver.
//!
//! Holds no data of its own. On `init` it mints a session token when the
//! addition carries none; the token is derived state that only reaches the
//! repository through `StorageManager::sync_driver_storage`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use yorozu_types::Storage;

use crate::driver::{Driver, DriverContext, DriverResult, parse_addition};

/// Configuration persisted in the storage's `addition` blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryAddition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

/// Ephemeral driver, used for scratch mounts and testing.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    storage: RwLock<Storage>,
    addition: RwLock<MemoryAddition>,
    active: AtomicBool,
}

impl MemoryDriver {
    pub const NAME: &'static str = "memory";

    pub fn new() -> Self {
        Self::default()
    }

    /// Current session token, if initialized at least once.
    pub fn session(&self) -> Option<String> {
        self.addition.read().session.clone()
    }

    /// Whether the driver is between `init` and `shutdown`.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn init(&self, ctx: &DriverContext, storage: Storage) -> DriverResult<()> {
        ctx.check()?;
        let mut addition: MemoryAddition = parse_addition(&storage.addition)?;
        if addition.session.is_none() {
            addition.session = Some(uuid::Uuid::new_v4().to_string());
        }

        *self.addition.write() = addition;
        *self.storage.write() = storage;
        self.active.store(true, Ordering::Release);
        Ok(())
    }

    async fn shutdown(&self, _ctx: &DriverContext) -> DriverResult<()> {
        self.active.store(false, Ordering::Release);
        Ok(())
    }

    fn storage(&self) -> Storage {
        self.storage.read().clone()
    }

    fn addition(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&*self.addition.read())
    }
}
