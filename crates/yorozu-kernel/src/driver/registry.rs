//! Named driver constructors.

use std::collections::HashMap;
use std::sync::Arc;

use super::Driver;
use super::backends::{LocalDriver, MemoryDriver};

/// Builds a fresh, uninitialized driver instance.
pub type DriverConstructor = Arc<dyn Fn() -> Arc<dyn Driver> + Send + Sync>;

/// Factory table mapping driver type names to constructors.
#[derive(Default, Clone)]
pub struct DriverRegistry {
    constructors: HashMap<String, DriverConstructor>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

impl DriverRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the drivers that ship with yorozu.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(LocalDriver::NAME, || Arc::new(LocalDriver::new()));
        registry.register(MemoryDriver::NAME, || Arc::new(MemoryDriver::new()));
        registry
    }

    /// Register a constructor, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Arc<dyn Driver> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    /// Look up the constructor for a driver type.
    pub fn get(&self, name: &str) -> Option<DriverConstructor> {
        self.constructors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered driver names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_drivers() {
        let registry = DriverRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["local".to_string(), "memory".to_string()]);
        assert!(registry.contains("local"));
        assert!(registry.get("ftp").is_none());
    }

    #[test]
    fn test_constructor_builds_fresh_instances() {
        let registry = DriverRegistry::with_builtin();
        let new_driver = registry.get("memory").unwrap();
        let a = new_driver();
        let b = new_driver();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
