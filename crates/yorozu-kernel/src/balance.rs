//! Round-robin selection across balance groups.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use yorozu_types::standardize_path;

use crate::driver::Driver;
use crate::registry::StorageRegistry;

/// Per-group rotation cursors, keyed by actual virtual path.
///
/// Cursors are never persisted; after a restart every group starts at 0.
#[derive(Debug, Default)]
pub struct Balancer {
    cursors: DashMap<String, usize>,
}

impl Balancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the driver that should serve `path`.
    ///
    /// A single match is returned as-is. For a balance group the first call
    /// creates the cursor at 0 and returns member 0; every later call
    /// advances the cursor modulo the group size and returns the member it
    /// lands on. Members are indexed in mount path order.
    pub fn select(&self, registry: &StorageRegistry, path: &str) -> Option<Arc<dyn Driver>> {
        let path = standardize_path(path);
        let mut storages = registry.storages_by_path(&path);
        match storages.len() {
            0 => None,
            1 => storages.pop(),
            len => {
                let key = storages[0].storage().actual_virtual_path().to_string();
                let i = match self.cursors.entry(key) {
                    Entry::Vacant(vacant) => {
                        vacant.insert(0);
                        0
                    }
                    Entry::Occupied(mut occupied) => {
                        let next = (*occupied.get() + 1) % len;
                        occupied.insert(next);
                        next
                    }
                };
                Some(storages.swap_remove(i))
            }
        }
    }

    /// Current cursor for a group's actual virtual path.
    pub fn cursor(&self, actual_virtual_path: &str) -> Option<usize> {
        self.cursors.get(actual_virtual_path).map(|c| *c)
    }
}
