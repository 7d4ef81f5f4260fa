//! Storage lifecycle management.
//!
//! [`StorageManager`] owns the registry and is its only writer. Each
//! lifecycle operation is a sequence of independent steps across the
//! repository, the driver and the registry:
//!
//! - create: persist → `init` → register
//! - update: persist → unregister old path (if renamed) → `shutdown` → `init` → register
//! - delete: `shutdown` → delete row → unregister
//!
//! None of these sequences is atomic. A failure part-way leaves the earlier
//! steps in place (e.g. a persisted row whose driver failed to initialize)
//! and is reported to the caller. Restarting and replaying the repository
//! through [`StorageManager::load_storages`] rebuilds a consistent registry.

use std::sync::Arc;

use yorozu_types::{Storage, StorageId, VirtualObject, now_millis, standardize_path};

use crate::balance::Balancer;
use crate::driver::{Driver, DriverContext, DriverRegistry};
use crate::error::{StorageError, StorageResult};
use crate::mount::MountInfo;
use crate::registry::StorageRegistry;
use crate::repo::StorageRepository;

/// Long-lived service owning the mounted storages of one process.
pub struct StorageManager {
    repo: Arc<dyn StorageRepository>,
    drivers: DriverRegistry,
    registry: StorageRegistry,
    balancer: Balancer,
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("drivers", &self.drivers)
            .field("registry", &self.registry)
            .finish()
    }
}

impl StorageManager {
    /// Create a manager with an empty registry.
    ///
    /// Call [`load_storages`](Self::load_storages) to mount what the
    /// repository already holds.
    pub fn new(repo: Arc<dyn StorageRepository>, drivers: DriverRegistry) -> Self {
        Self {
            repo,
            drivers,
            registry: StorageRegistry::new(),
            balancer: Balancer::new(),
        }
    }

    pub fn registry(&self) -> &StorageRegistry {
        &self.registry
    }

    pub fn repository(&self) -> &Arc<dyn StorageRepository> {
        &self.repo
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    fn new_driver(&self, name: &str) -> StorageResult<Arc<dyn Driver>> {
        let constructor = self
            .drivers
            .get(name)
            .ok_or_else(|| StorageError::UnsupportedDriver(name.to_string()))?;
        Ok(constructor())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Persist a new storage, initialize its driver and mount it.
    ///
    /// The row is written before `init` so the driver sees its assigned id.
    /// If `init` fails the row stays persisted and nothing is mounted.
    #[tracing::instrument(
        skip(self, ctx, storage),
        fields(mount_path = %storage.mount_path, driver = %storage.driver),
        name = "storage.create"
    )]
    pub async fn create_storage(
        &self,
        ctx: &DriverContext,
        mut storage: Storage,
    ) -> StorageResult<StorageId> {
        storage.modified = now_millis();
        storage.mount_path = standardize_path(&storage.mount_path);

        let driver = self.new_driver(&storage.driver)?;
        let id = self.repo.create(&storage).map_err(|e| {
            StorageError::persistence("failed create storage in database", e)
        })?;
        storage.id = id;

        let mount_path = storage.mount_path.clone();
        driver.init(ctx, storage).await.map_err(|e| {
            StorageError::driver("failed init storage but storage is already created", e)
        })?;
        tracing::debug!(storage = ?driver.storage(), "storage is created");

        self.registry.store(mount_path, driver);
        tracing::info!(storage.id = %id, "storage mounted");
        Ok(id)
    }

    /// Persist a changed configuration and reinitialize the mounted driver.
    ///
    /// The driver type cannot change. When the mount path changes the old
    /// registry key is removed before the driver is reinitialized under the
    /// new one.
    #[tracing::instrument(
        skip(self, ctx, storage),
        fields(storage.id = %storage.id, mount_path = %storage.mount_path),
        name = "storage.update"
    )]
    pub async fn update_storage(&self, ctx: &DriverContext, mut storage: Storage) -> StorageResult<()> {
        let old = self
            .repo
            .get_by_id(storage.id)
            .map_err(|e| StorageError::persistence("failed get old storage", e))?;
        if old.driver != storage.driver {
            return Err(StorageError::ImmutableField("driver"));
        }

        storage.modified = now_millis();
        storage.mount_path = standardize_path(&storage.mount_path);
        self.repo.update(&storage).map_err(|e| {
            StorageError::persistence("failed update storage in database", e)
        })?;

        let driver = self.registry.get_by_virtual_path(&old.mount_path);
        if old.mount_path != storage.mount_path {
            self.registry.delete(&old.mount_path);
        }
        let driver = driver?;

        driver
            .shutdown(ctx)
            .await
            .map_err(|e| StorageError::driver("failed drop storage", e))?;

        let mount_path = storage.mount_path.clone();
        driver
            .init(ctx, storage)
            .await
            .map_err(|e| StorageError::driver("failed init storage", e))?;

        self.registry.store(mount_path, driver);
        tracing::info!(old_mount_path = %old.mount_path, "storage updated");
        Ok(())
    }

    /// Shut a storage's driver down, delete its row and unmount it.
    #[tracing::instrument(skip(self, ctx), name = "storage.delete")]
    pub async fn delete_storage_by_id(&self, ctx: &DriverContext, id: StorageId) -> StorageResult<()> {
        let storage = self
            .repo
            .get_by_id(id)
            .map_err(|e| StorageError::persistence("failed get storage", e))?;
        let driver = self.registry.get_by_virtual_path(&storage.mount_path)?;

        driver
            .shutdown(ctx)
            .await
            .map_err(|e| StorageError::driver("failed drop storage", e))?;
        self.repo.delete_by_id(id).map_err(|e| {
            StorageError::persistence("failed delete storage in database", e)
        })?;
        self.registry.delete(&storage.mount_path);

        tracing::info!(mount_path = %storage.mount_path, "storage deleted");
        Ok(())
    }

    /// Persist a driver's live configuration and addition, best-effort.
    ///
    /// For drivers that change their own addition (refreshed tokens and the
    /// like). Failures are logged and never returned.
    pub fn sync_driver_storage(&self, driver: &dyn Driver) {
        if let Err(e) = self.save_driver_storage(driver) {
            tracing::error!("failed save driver storage: {}", e);
        }
    }

    fn save_driver_storage(&self, driver: &dyn Driver) -> StorageResult<()> {
        let mut storage = driver.storage();
        storage.addition = driver
            .addition()
            .map_err(|source| StorageError::Serialize {
                context: "error while marshal addition",
                source,
            })?
            .to_string();
        self.repo.update(&storage).map_err(|e| {
            StorageError::persistence("failed update storage in database", e)
        })
    }

    // ========================================================================
    // Bootstrap
    // ========================================================================

    /// Mount every storage the repository holds.
    ///
    /// Rows are read `page_size` at a time in index order. A storage that
    /// fails to mount is logged and skipped. Returns how many were mounted.
    #[tracing::instrument(skip(self, ctx), name = "storage.load")]
    pub async fn load_storages(&self, ctx: &DriverContext, page_size: usize) -> StorageResult<usize> {
        let page_size = page_size.max(1);
        let mut page_index = 1;
        let mut fetched = 0u64;
        let mut mounted = 0;

        loop {
            let (page, total) = self
                .repo
                .list(page_index, page_size)
                .map_err(|e| StorageError::persistence("failed get storages", e))?;
            if page.is_empty() {
                break;
            }
            fetched += page.len() as u64;

            for storage in page {
                let id = storage.id;
                let mount_path = storage.mount_path.clone();
                match self.mount_existing(ctx, storage).await {
                    Ok(()) => mounted += 1,
                    Err(e) => {
                        tracing::error!(storage.id = %id, %mount_path, "failed load storage: {}", e)
                    }
                }
            }

            if fetched >= total {
                break;
            }
            page_index += 1;
        }

        tracing::info!("loaded {} storages", mounted);
        Ok(mounted)
    }

    async fn mount_existing(&self, ctx: &DriverContext, storage: Storage) -> StorageResult<()> {
        let driver = self.new_driver(&storage.driver)?;
        let mount_path = storage.mount_path.clone();
        driver
            .init(ctx, storage)
            .await
            .map_err(|e| StorageError::driver("failed init storage", e))?;
        self.registry.store(mount_path, driver);
        Ok(())
    }

    /// Shut down and unmount every driver, leaving the repository untouched.
    ///
    /// Returns how many drivers were unmounted.
    pub async fn shutdown_all(&self, ctx: &DriverContext) -> usize {
        let mut released = 0;
        for (mount_path, driver) in self.registry.entries() {
            if let Err(e) = driver.shutdown(ctx).await {
                tracing::warn!(%mount_path, "failed drop storage: {}", e);
            }
            self.registry.delete(&mount_path);
            released += 1;
        }
        released
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Driver mounted exactly at `virtual_path`.
    pub fn get_storage_by_virtual_path(&self, virtual_path: &str) -> StorageResult<Arc<dyn Driver>> {
        self.registry.get_by_virtual_path(virtual_path)
    }

    /// Deepest-prefix matches for `path`, including balance siblings.
    pub fn storages_by_path(&self, path: &str) -> Vec<Arc<dyn Driver>> {
        self.registry.storages_by_path(path)
    }

    /// One driver for `path`, rotating across balance groups.
    pub fn balanced_storage(&self, path: &str) -> Option<Arc<dyn Driver>> {
        self.balancer.select(&self.registry, path)
    }

    /// Synthetic folders implied by mounts below `prefix`.
    pub fn virtual_children(&self, prefix: &str) -> Vec<VirtualObject> {
        self.registry.virtual_children(prefix)
    }

    /// Balanced driver for `path` plus the path relative to its mount.
    ///
    /// `/movies/2024/a.mkv` on a storage mounted at `/movies` yields
    /// `/2024/a.mkv`.
    pub fn get_storage_and_actual_path(&self, path: &str) -> StorageResult<(Arc<dyn Driver>, String)> {
        let path = standardize_path(path);
        let driver = self
            .balanced_storage(&path)
            .ok_or_else(|| StorageError::not_found(format!("no storage for path {path}")))?;

        let storage = driver.storage();
        let actual = path
            .strip_prefix(storage.actual_virtual_path())
            .unwrap_or(&path);
        Ok((driver, standardize_path(actual)))
    }

    /// Sorted snapshot of what is mounted.
    pub fn mounts(&self) -> Vec<MountInfo> {
        self.registry.mounts()
    }

    /// One page of persisted storages, in index order.
    pub fn list_storages(&self, page_index: usize, page_size: usize) -> StorageResult<(Vec<Storage>, u64)> {
        self.repo
            .list(page_index, page_size)
            .map_err(|e| StorageError::persistence("failed get storages", e))
    }
}
