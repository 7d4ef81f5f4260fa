//! Virtual path routing over the storage registry.
//!
//! - [`StorageRegistry::storages_by_path`] - deepest-prefix match, including
//!   every member of a balance group
//! - [`StorageRegistry::virtual_children`] - folder entries implied by
//!   mounts nested below a prefix
//! - [`StorageRegistry::get_by_virtual_path`] - exact lookup
//!
//! Matching depth is the number of `/` in a mount's actual virtual path, not
//! its string length. Mount paths form a hierarchy, so among prefixes of one
//! path the deeper one is always the longer one.

use std::collections::HashSet;
use std::sync::Arc;

use yorozu_types::{Storage, StorageId, VirtualObject, standardize_path};

use crate::driver::Driver;
use crate::error::{StorageError, StorageResult};
use crate::registry::StorageRegistry;

/// Summary of a mounted storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub id: StorageId,
    pub mount_path: String,
    pub driver: String,
    pub index: i32,
}

impl From<&Storage> for MountInfo {
    fn from(storage: &Storage) -> Self {
        Self {
            id: storage.id,
            mount_path: storage.mount_path.clone(),
            driver: storage.driver.clone(),
            index: storage.index,
        }
    }
}

impl StorageRegistry {
    /// Exact lookup by mount path.
    pub fn get_by_virtual_path(&self, virtual_path: &str) -> StorageResult<Arc<dyn Driver>> {
        self.load(virtual_path).ok_or_else(|| {
            StorageError::not_found(format!("no storage mounted at virtual path {virtual_path}"))
        })
    }

    /// Drivers whose actual virtual path is the deepest prefix of `path`.
    ///
    /// All members of a balance group share an actual virtual path, so they
    /// are returned together. Output is sorted by mount path.
    ///
    /// With `/a/b`, `/a/c`, `/a/d/e` and `/a/d/e.balance` mounted,
    /// `/a/d/e/f` resolves to `/a/d/e` and `/a/d/e.balance`.
    pub fn storages_by_path(&self, path: &str) -> Vec<Arc<dyn Driver>> {
        let mut matched: Vec<(Storage, Arc<dyn Driver>)> = Vec::new();
        let mut max_depth = 0;

        self.range(|_, driver| {
            let storage = driver.storage();
            let mut virtual_path = storage.actual_virtual_path();
            if virtual_path == "/" {
                virtual_path = "";
            }

            let is_match = path == virtual_path
                || path
                    .strip_prefix(virtual_path)
                    .is_some_and(|rest| rest.starts_with('/'));
            if !is_match {
                return true;
            }

            let depth = virtual_path.matches('/').count();
            if depth < max_depth {
                return true;
            }
            if depth > max_depth {
                matched.clear();
                max_depth = depth;
            }
            matched.push((storage, Arc::clone(driver)));
            true
        });

        matched.sort_by(|a, b| a.0.mount_path.cmp(&b.0.mount_path));
        matched.into_iter().map(|(_, driver)| driver).collect()
    }

    /// Folder entries implied by mounts nested below `prefix`.
    ///
    /// Storages are visited by `(index, mount_path)`; the first storage to
    /// produce a name supplies its `modified` time. Marked balance members
    /// never produce entries, so a group without an unmarked primary is not
    /// listed at all.
    ///
    /// With `/a/b`, `/a/c`, `/a/d/e`, `/a/b.balance1` and `/av` mounted,
    /// `/a` lists `b`, `c` and `d`.
    pub fn virtual_children(&self, prefix: &str) -> Vec<VirtualObject> {
        let mut storages: Vec<Storage> = self.values().iter().map(|d| d.storage()).collect();
        storages.sort_by(|a, b| {
            a.index
                .cmp(&b.index)
                .then_with(|| a.mount_path.cmp(&b.mount_path))
        });

        let mut prefix = standardize_path(prefix);
        if prefix != "/" {
            prefix.push('/');
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for storage in &storages {
            if storage.is_balance() {
                continue;
            }
            let mount_path = storage.mount_path.as_str();
            if mount_path.len() <= prefix.len() {
                continue;
            }
            let Some(rest) = mount_path.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let name = rest.split('/').next().unwrap_or(rest);
            if seen.insert(name.to_string()) {
                entries.push(VirtualObject::folder(name, storage.modified));
            }
        }
        entries
    }

    /// Snapshot of every mount, sorted by `(index, mount_path)`.
    pub fn mounts(&self) -> Vec<MountInfo> {
        let mut mounts: Vec<MountInfo> = self
            .values()
            .iter()
            .map(|d| MountInfo::from(&d.storage()))
            .collect();
        mounts.sort_by(|a, b| {
            a.index
                .cmp(&b.index)
                .then_with(|| a.mount_path.cmp(&b.mount_path))
        });
        mounts
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::driver::DriverContext;
    use crate::driver::backends::MemoryDriver;

    /// Initialize a memory driver at `mount_path` and register it.
    pub(crate) async fn mount(
        registry: &StorageRegistry,
        mount_path: &str,
        index: i32,
        modified: u64,
    ) -> Arc<dyn Driver> {
        let driver = MemoryDriver::new();
        let mut storage = Storage::new(mount_path, MemoryDriver::NAME).with_index(index);
        storage.modified = modified;
        driver.init(&DriverContext::new(), storage).await.unwrap();
        let driver: Arc<dyn Driver> = Arc::new(driver);
        registry.store(mount_path, Arc::clone(&driver));
        driver
    }

    fn paths(drivers: &[Arc<dyn Driver>]) -> Vec<String> {
        drivers.iter().map(|d| d.storage().mount_path).collect()
    }

    fn names(entries: &[VirtualObject]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    async fn sample_registry() -> StorageRegistry {
        let registry = StorageRegistry::new();
        for path in ["/a/b", "/a/c", "/a/d/e", "/a/d/e.balance", "/a/b.balance1", "/av"] {
            mount(&registry, path, 0, 0).await;
        }
        registry
    }

    #[tokio::test]
    async fn test_deepest_match_includes_balance_group() {
        let registry = sample_registry().await;
        assert_eq!(
            paths(&registry.storages_by_path("/a/d/e/f")),
            vec!["/a/d/e", "/a/d/e.balance"]
        );
        assert_eq!(
            paths(&registry.storages_by_path("/a/d/e")),
            vec!["/a/d/e", "/a/d/e.balance"]
        );
    }

    #[tokio::test]
    async fn test_sibling_prefix_is_not_a_match() {
        let registry = sample_registry().await;
        assert_eq!(paths(&registry.storages_by_path("/av/x")), vec!["/av"]);
        assert_eq!(
            paths(&registry.storages_by_path("/a/bc")),
            Vec::<String>::new()
        );
        assert_eq!(
            paths(&registry.storages_by_path("/a/b/x")),
            vec!["/a/b", "/a/b.balance1"]
        );
    }

    #[tokio::test]
    async fn test_shallower_mount_excluded_when_deeper_matches() {
        let registry = StorageRegistry::new();
        mount(&registry, "/", 0, 0).await;
        mount(&registry, "/mnt", 0, 0).await;
        mount(&registry, "/mnt/project", 0, 0).await;

        assert_eq!(
            paths(&registry.storages_by_path("/mnt/project/src")),
            vec!["/mnt/project"]
        );
        assert_eq!(paths(&registry.storages_by_path("/mnt/other")), vec!["/mnt"]);
        assert_eq!(paths(&registry.storages_by_path("/elsewhere")), vec!["/"]);
    }

    #[tokio::test]
    async fn test_root_mount_matches_root_path() {
        let registry = StorageRegistry::new();
        mount(&registry, "/", 0, 0).await;
        assert_eq!(paths(&registry.storages_by_path("")), vec!["/"]);
        assert_eq!(paths(&registry.storages_by_path("/x")), vec!["/"]);
    }

    #[tokio::test]
    async fn test_no_mount_is_empty() {
        let registry = StorageRegistry::new();
        mount(&registry, "/scratch", 0, 0).await;
        assert!(registry.storages_by_path("/nothing/here").is_empty());
    }

    #[tokio::test]
    async fn test_resolution_is_deterministic() {
        let registry = sample_registry().await;
        let first = paths(&registry.storages_by_path("/a/b/file"));
        for _ in 0..10 {
            assert_eq!(paths(&registry.storages_by_path("/a/b/file")), first);
        }
    }

    #[tokio::test]
    async fn test_virtual_children() {
        let registry = sample_registry().await;
        assert_eq!(names(&registry.virtual_children("/a")), vec!["b", "c", "d"]);
        assert_eq!(names(&registry.virtual_children("/a/")), vec!["b", "c", "d"]);
        assert_eq!(names(&registry.virtual_children("/")), vec!["a", "av"]);
        assert_eq!(names(&registry.virtual_children("/a/d")), vec!["e"]);
        assert!(registry.virtual_children("/a/b").is_empty());

        let entry = &registry.virtual_children("/a")[0];
        assert!(entry.is_folder);
        assert_eq!(entry.size, 0);
    }

    #[tokio::test]
    async fn test_virtual_children_first_by_index_wins() {
        let registry = StorageRegistry::new();
        mount(&registry, "/shared/x", 5, 100).await;
        mount(&registry, "/shared/y", 1, 200).await;

        let entries = registry.virtual_children("/");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "shared");
        assert_eq!(entries[0].modified, 200);
    }

    #[tokio::test]
    async fn test_virtual_children_equal_index_breaks_on_mount_path() {
        for _ in 0..20 {
            let registry = StorageRegistry::new();
            mount(&registry, "/s/z", 0, 300).await;
            mount(&registry, "/s/a", 0, 100).await;
            mount(&registry, "/s/m", 0, 200).await;

            let entries = registry.virtual_children("/");
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].name, "s");
            assert_eq!(entries[0].modified, 100);
        }
    }

    #[tokio::test]
    async fn test_virtual_children_order_follows_index() {
        let registry = StorageRegistry::new();
        mount(&registry, "/z", 0, 0).await;
        mount(&registry, "/m", 1, 0).await;
        mount(&registry, "/a", 2, 0).await;
        assert_eq!(names(&registry.virtual_children("/")), vec!["z", "m", "a"]);
    }

    #[tokio::test]
    async fn test_balance_group_without_primary_is_hidden() {
        let registry = StorageRegistry::new();
        mount(&registry, "/g.balance1", 0, 0).await;
        mount(&registry, "/g.balance2", 0, 0).await;
        assert!(registry.virtual_children("/").is_empty());
        assert_eq!(registry.storages_by_path("/g/file").len(), 2);
    }

    #[tokio::test]
    async fn test_exact_lookup() {
        let registry = sample_registry().await;
        assert!(registry.get_by_virtual_path("/a/c").is_ok());
        let err = registry.get_by_virtual_path("/a").err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mounts_sorted() {
        let registry = StorageRegistry::new();
        mount(&registry, "/b", 0, 0).await;
        mount(&registry, "/a", 1, 0).await;
        mount(&registry, "/c", 0, 0).await;
        let mounts: Vec<_> = registry.mounts().into_iter().map(|m| m.mount_path).collect();
        assert_eq!(mounts, vec!["/b", "/c", "/a"]);
    }
}
