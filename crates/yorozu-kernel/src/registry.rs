//! In-memory directory of mounted storages.
//!
//! Maps a normalized mount path to the live driver bound to it. An entry
//! exists only while its storage is initialized; the lifecycle manager is the
//! only writer.

use std::sync::Arc;

use dashmap::DashMap;

use crate::driver::Driver;

/// Concurrent map from mount path to driver instance.
///
/// Individual operations are atomic; sequences of operations are not.
#[derive(Default)]
pub struct StorageRegistry {
    storages: DashMap<String, Arc<dyn Driver>>,
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.storages.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        f.debug_struct("StorageRegistry").field("mounts", &keys).finish()
    }
}

impl StorageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver mounted exactly at `mount_path`.
    pub fn load(&self, mount_path: &str) -> Option<Arc<dyn Driver>> {
        self.storages.get(mount_path).map(|e| Arc::clone(e.value()))
    }

    /// Mount a driver, replacing whatever was mounted at the same path.
    pub fn store(&self, mount_path: impl Into<String>, driver: Arc<dyn Driver>) {
        self.storages.insert(mount_path.into(), driver);
    }

    /// Remove the entry at `mount_path`, returning the driver that was there.
    pub fn delete(&self, mount_path: &str) -> Option<Arc<dyn Driver>> {
        self.storages.remove(mount_path).map(|(_, driver)| driver)
    }

    /// Visit every entry until `visit` returns `false`.
    ///
    /// Iterates over a snapshot, so the visitor may mutate the registry.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &Arc<dyn Driver>) -> bool,
    {
        for (mount_path, driver) in self.entries() {
            if !visit(&mount_path, &driver) {
                break;
            }
        }
    }

    /// All mounted drivers, in no particular order.
    pub fn values(&self) -> Vec<Arc<dyn Driver>> {
        self.storages.iter().map(|e| Arc::clone(e.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.storages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }

    /// Snapshot of `(mount_path, driver)` pairs.
    pub fn entries(&self) -> Vec<(String, Arc<dyn Driver>)> {
        self.storages
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::backends::MemoryDriver;

    fn driver() -> Arc<dyn Driver> {
        Arc::new(MemoryDriver::new())
    }

    #[test]
    fn test_store_load_delete() {
        let registry = StorageRegistry::new();
        let d = driver();
        registry.store("/a", Arc::clone(&d));

        let loaded = registry.load("/a").unwrap();
        assert!(Arc::ptr_eq(&loaded, &d));
        assert!(registry.load("/b").is_none());

        assert!(registry.delete("/a").is_some());
        assert!(registry.delete("/a").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_store_replaces() {
        let registry = StorageRegistry::new();
        registry.store("/a", driver());
        let replacement = driver();
        registry.store("/a", Arc::clone(&replacement));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.load("/a").unwrap(), &replacement));
    }

    #[test]
    fn test_range_stops_early() {
        let registry = StorageRegistry::new();
        for path in ["/a", "/b", "/c"] {
            registry.store(path, driver());
        }
        let mut seen = 0;
        registry.range(|_, _| {
            seen += 1;
            seen < 2
        });
        assert_eq!(seen, 2);
        assert_eq!(registry.values().len(), 3);
    }

    #[test]
    fn test_range_allows_mutation() {
        let registry = StorageRegistry::new();
        registry.store("/a", driver());
        registry.store("/b", driver());
        registry.range(|path, _| {
            registry.delete(path);
            true
        });
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let registry = Arc::new(StorageRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry.store(format!("/t{t}/m{i}"), driver());
                        let _ = registry.values();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 400);
    }
}
