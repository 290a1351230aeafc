//! Cache Registry
//!
//! Explicit, caller-owned map of named stores and named caches. Built once
//! at startup and passed to whoever needs a cache; there is no process-wide
//! registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::cache::{Cache, Clock, SystemClock, SEPARATOR};
use crate::error::{CacheError, Result};
use crate::store::Store;

/// Name the registry gives to the store passed to [`CacheRegistry::new`].
pub const DEFAULT_STORE: &str = "default";

// == Cache Registry ==
pub struct CacheRegistry {
    stores: HashMap<String, Arc<dyn Store>>,
    /// Keyed by full name (global namespace included)
    caches: HashMap<String, Arc<Cache>>,
    /// Prefixed to every cache name, `global::name`
    global_namespace: String,
    /// Whether newly registered caches start enabled
    enabled: bool,
    clock: Arc<dyn Clock>,
}

impl CacheRegistry {
    // == Constructor ==
    /// Creates a registry with `default_store` registered as `"default"`.
    pub fn new(default_store: Arc<dyn Store>) -> Self {
        let mut stores: HashMap<String, Arc<dyn Store>> = HashMap::new();
        stores.insert(DEFAULT_STORE.to_string(), default_store);

        Self {
            stores,
            caches: HashMap::new(),
            global_namespace: String::new(),
            enabled: true,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_global_namespace(mut self, global_namespace: impl Into<String>) -> Self {
        self.global_namespace = global_namespace.into();
        self
    }

    /// Clock handed to every cache created from now on.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether caches created from now on start enabled.
    pub fn with_caches_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    // == Stores ==
    /// Registers a store. Names are unique; re-registering is rejected.
    pub fn register_store(&mut self, name: &str, store: Arc<dyn Store>) -> Result<()> {
        if self.stores.contains_key(name) {
            return Err(CacheError::StoreDefined(format!(
                "Cannot overwrite already defined store \"{}\"",
                name
            )));
        }

        self.stores.insert(name.to_string(), store);
        info!(store = name, "Registered cache store");
        Ok(())
    }

    pub fn store(&self, name: &str) -> Result<Arc<dyn Store>> {
        self.stores
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::NoStore(format!("No store called \"{}\" defined", name)))
    }

    // == Caches ==
    /// Registers a cache named `name` over the store registered as `store_name`.
    ///
    /// Fails with `CacheDefined` for a duplicate name and `NoStore` when the
    /// store is unknown, before any cache is created.
    pub fn register_cache(&mut self, name: &str, store_name: &str) -> Result<Arc<Cache>> {
        self.ensure_unregistered(name)?;
        let store = self.store(store_name)?;
        self.insert_cache(name, store)
    }

    /// Registers a cache over a store object that is not itself registered.
    pub fn register_cache_with_store(
        &mut self,
        name: &str,
        store: Arc<dyn Store>,
    ) -> Result<Arc<Cache>> {
        self.ensure_unregistered(name)?;
        self.insert_cache(name, store)
    }

    /// Returns the cache named `name`, registering it over `store_name` if needed.
    pub fn provide(&mut self, name: &str, store_name: &str) -> Result<Arc<Cache>> {
        match self.cache(name) {
            Ok(cache) => Ok(cache),
            Err(CacheError::NoCache(_)) => self.register_cache(name, store_name),
            Err(e) => Err(e),
        }
    }

    pub fn cache(&self, name: &str) -> Result<Arc<Cache>> {
        self.caches
            .get(&self.full_name(name))
            .cloned()
            .ok_or_else(|| CacheError::NoCache(format!("There is no cache \"{}\" registered", name)))
    }

    /// Full names of every registered cache, sorted.
    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn global_namespace(&self) -> &str {
        &self.global_namespace
    }

    fn ensure_unregistered(&self, name: &str) -> Result<()> {
        if self.caches.contains_key(&self.full_name(name)) {
            return Err(CacheError::CacheDefined(format!(
                "Cache with name \"{}\" has already been registered",
                name
            )));
        }
        Ok(())
    }

    fn insert_cache(&mut self, name: &str, store: Arc<dyn Store>) -> Result<Arc<Cache>> {
        let full_name = self.full_name(name);
        let cache = Arc::new(
            Cache::new(store, &full_name)?
                .with_clock(self.clock.clone())
                .with_enabled(self.enabled),
        );
        self.caches.insert(full_name.clone(), cache.clone());
        info!(cache = %full_name, "Registered cache");
        Ok(cache)
    }

    /// Lower-cased like the cache namespace, so names differing only in
    /// case resolve to the same cache.
    fn full_name(&self, name: &str) -> String {
        if self.global_namespace.is_empty() {
            return name.to_lowercase();
        }
        format!("{}{}{}", self.global_namespace, SEPARATOR, name).to_lowercase()
    }
}
