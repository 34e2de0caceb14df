//! Adapter Registry
//!
//! Name -> constructor table used to build cache instances at start-up.
//! The registry is an ordinary value passed to whoever builds caches.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::cache::{Cache, MemoryCache, TieredCache};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Builds a cache from server configuration.
pub type Constructor = Box<dyn Fn(&Config) -> Result<Arc<dyn Cache>> + Send + Sync>;

/// Table of named cache constructors. Names are case-insensitive.
#[derive(Default)]
pub struct Registry {
    constructors: HashMap<String, Constructor>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("adapters", &self.names())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `memory` and `tiered` adapters.
    ///
    /// `tiered` is local-only: a tiered cache over a memory cache.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.insert(
            "memory",
            Box::new(|config: &Config| {
                let cache: Arc<dyn Cache> = MemoryCache::start(config.memory_config());
                Ok(cache)
            }),
        );

        registry.insert(
            "tiered",
            Box::new(|config: &Config| {
                let local = MemoryCache::start(config.memory_config());
                let cache: Arc<dyn Cache> =
                    Arc::new(TieredCache::local_only(config.tiered_config(), local));
                Ok(cache)
            }),
        );

        registry
    }

    /// Registers a constructor under `name`.
    ///
    /// Fails on an empty or already-registered name.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(&Config) -> Result<Arc<dyn Cache>> + Send + Sync + 'static,
    {
        let name = normalize(name);
        if name.is_empty() {
            return Err(CacheError::Configuration(
                "adapter name cannot be empty".to_string(),
            ));
        }
        if self.constructors.contains_key(&name) {
            return Err(CacheError::Configuration(format!(
                "adapter '{}' is already registered",
                name
            )));
        }

        self.insert(&name, Box::new(constructor));
        Ok(())
    }

    /// Builds the adapter registered under `name`.
    pub fn create(&self, name: &str, config: &Config) -> Result<Arc<dyn Cache>> {
        let constructor = self
            .constructors
            .get(&normalize(name))
            .ok_or_else(|| CacheError::Configuration(format!("unknown adapter '{}'", name)))?;
        constructor(config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&normalize(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    fn insert(&mut self, name: &str, constructor: Constructor) {
        info!("Registered cache adapter '{}'", name);
        self.constructors.insert(name.to_string(), constructor);
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
