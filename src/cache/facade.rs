//! Cache Facade Module
//!
//! Turns a raw [`Store`] into a TTL-aware, namespaced cache.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::keys::{meta_key, resource_key};
use crate::cache::meta::EntryMeta;
use crate::cache::NAMESPACE_SEPARATOR;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::error::{CacheError, Result};
use crate::store::Store;

// == Cache ==
/// Namespaced cache with per-key TTL metadata.
///
/// Every value is written under a resource key and paired with an
/// [`EntryMeta`] record under a meta key. Metadata read from the store is
/// mirrored in a per-instance map so a `has` followed by `get` costs one
/// metadata read. The mirror is never authoritative: a fresh verdict is
/// always confirmed against the store's copy of the value.
///
/// All methods take `&self`; share a cache between threads with `Arc`.
pub struct Cache {
    /// Backing store
    store: Arc<dyn Store>,
    /// Lower-cased namespace prefixed to every key
    namespace: RwLock<String>,
    /// Disabled caches behave as permanently empty
    enabled: AtomicBool,
    /// Metadata records already read, keyed by meta key
    meta_cache: DashMap<String, EntryMeta>,
    /// Bumped by every write; a metadata read that overlaps one is not mirrored
    write_epoch: AtomicU64,
    clock: Arc<dyn Clock>,
    stats: StatsRecorder,
}

impl Cache {
    // == Constructor ==
    /// Creates an enabled cache over `store` using the system clock.
    ///
    /// Fails with `InvalidConfig` if the namespace contains `>>`.
    pub fn new(store: Arc<dyn Store>, namespace: &str) -> Result<Self> {
        Ok(Self {
            store,
            namespace: RwLock::new(normalize_namespace(namespace)?),
            enabled: AtomicBool::new(true),
            meta_cache: DashMap::new(),
            write_epoch: AtomicU64::new(0),
            clock: Arc::new(SystemClock),
            stats: StatsRecorder::default(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        self.set_enabled(enabled);
        self
    }

    // == Set ==
    /// Stores `value` under `key` with an optional TTL in seconds (0 = none).
    ///
    /// The value is written before its metadata. Does nothing when disabled.
    pub fn set<V>(&self, key: &str, value: &V, ttl: u64) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        if !self.is_enabled() {
            return Ok(());
        }

        let namespace = self.namespace();
        let meta_key = meta_key(&namespace, key);
        let resource_key = resource_key(&namespace, key);

        let meta = EntryMeta::new(ttl, self.clock.now());
        let value_bytes = serde_json::to_vec(value)?;
        let meta_bytes = meta.encode()?;

        self.meta_cache.remove(&meta_key);
        self.store.write(&resource_key, &value_bytes)?;
        self.store.write(&meta_key, &meta_bytes)?;
        self.invalidate_mirror(&meta_key);

        self.stats.record_write();
        debug!(namespace = %namespace, key, ttl, "Cached value");
        Ok(())
    }

    // == Get ==
    /// Returns the value under `key` if it is fresh.
    ///
    /// `age > 0` additionally rejects entries created more than `age` seconds
    /// ago. Misses, stale entries and undecodable values all yield `Ok(None)`.
    pub fn get<V>(&self, key: &str, age: u64) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        if !self.is_enabled() {
            return Ok(None);
        }

        let found = self.lookup(key, age)?;
        if found.is_some() {
            self.stats.record_hit();
            debug!(key, "Cache hit");
        } else {
            self.stats.record_miss();
            debug!(key, "Cache miss");
        }
        Ok(found)
    }

    /// Read-through variant of [`get`](Self::get).
    ///
    /// On a miss `on_miss` computes the value, which is cached with `age` as
    /// its TTL and returned. A disabled cache always calls `on_miss` and
    /// stores nothing.
    pub fn get_or_else<V, F>(&self, key: &str, age: u64, on_miss: F) -> Result<V>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> V,
    {
        self.try_get_or_else(key, age, || Ok::<V, CacheError>(on_miss()))
    }

    /// Like [`get_or_else`](Self::get_or_else) with a fallible producer.
    ///
    /// A producer error is returned as is and nothing is cached.
    pub fn try_get_or_else<V, E, F>(&self, key: &str, age: u64, on_miss: F) -> Result<V>
    where
        V: Serialize + DeserializeOwned,
        E: Into<CacheError>,
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if !self.is_enabled() {
            return on_miss().map_err(Into::into);
        }

        if let Some(value) = self.get(key, age)? {
            return Ok(value);
        }

        let value = on_miss().map_err(Into::into)?;
        self.set(key, &value, age)?;
        Ok(value)
    }

    fn lookup<V>(&self, key: &str, age: u64) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        if !self.has(key, age)? {
            return Ok(None);
        }

        // The value may have vanished between `has` and this read.
        let resource_key = resource_key(&self.namespace(), key);
        let Some(bytes) = self.store.read(&resource_key)? else {
            debug!(key, "Value disappeared after freshness check");
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Cached value could not be decoded, treating as miss");
                Ok(None)
            }
        }
    }

    // == Has ==
    /// Checks whether a fresh value exists under `key`.
    ///
    /// Fresh means: metadata present and readable, created no earlier than
    /// `now - age` when `age > 0`, not past its absolute expiry, and the
    /// value itself still present in the store.
    pub fn has(&self, key: &str, age: u64) -> Result<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }

        let namespace = self.namespace();
        let meta_key = meta_key(&namespace, key);

        let cached = self.meta_cache.get(&meta_key).map(|meta| *meta);
        let meta = match cached {
            Some(meta) => meta,
            None => match self.load_meta(&meta_key)? {
                Some(meta) => meta,
                None => return Ok(false),
            },
        };

        if !meta.is_fresh(age, self.clock.now()) {
            return Ok(false);
        }

        self.store.exists(&resource_key(&namespace, key))
    }

    fn load_meta(&self, meta_key: &str) -> Result<Option<EntryMeta>> {
        let epoch = self.write_epoch.load(Ordering::SeqCst);
        let Some(bytes) = self.store.read(meta_key)? else {
            return Ok(None);
        };

        match EntryMeta::decode(&bytes) {
            Some(meta) => {
                self.mirror_meta(meta_key, meta, epoch);
                Ok(Some(meta))
            }
            None => {
                warn!(meta_key, "Corrupted cache metadata, treating as miss");
                Ok(None)
            }
        }
    }

    /// Mirrors `meta` unless a write started after `epoch` was read.
    ///
    /// The epoch is checked while the entry's shard is locked, and writers
    /// bump the epoch before evicting, so a record read before a write can
    /// never outlive that write's eviction.
    fn mirror_meta(&self, meta_key: &str, meta: EntryMeta, epoch: u64) {
        match self.meta_cache.entry(meta_key.to_string()) {
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                if self.write_epoch.load(Ordering::SeqCst) == epoch {
                    slot.insert(meta);
                }
            }
        }
    }

    fn invalidate_mirror(&self, meta_key: &str) {
        self.write_epoch.fetch_add(1, Ordering::SeqCst);
        self.meta_cache.remove(meta_key);
    }

    // == Clear ==
    /// Removes the value and metadata stored under `key`. Idempotent.
    pub fn clear(&self, key: &str) -> Result<()> {
        let namespace = self.namespace();
        let meta_key = meta_key(&namespace, key);

        self.meta_cache.remove(&meta_key);
        self.store.remove(&meta_key)?;
        self.store.remove(&resource_key(&namespace, key))?;
        self.invalidate_mirror(&meta_key);

        self.stats.record_clear();
        debug!(namespace = %namespace, key, "Cleared key");
        Ok(())
    }

    // == Flush ==
    /// Removes every entry in this cache's namespace.
    ///
    /// With an empty namespace this empties the whole store.
    pub fn flush(&self) -> Result<()> {
        let namespace = self.namespace();
        self.store.remove_all(&namespace)?;
        self.write_epoch.fetch_add(1, Ordering::SeqCst);
        self.meta_cache.clear();

        self.stats.record_flush();
        info!(namespace = %namespace, "Flushed cache namespace");
        Ok(())
    }

    // == Settings ==
    /// Sets the namespace, lower-cased. Rejects namespaces containing `>>`.
    pub fn set_namespace(&self, namespace: &str) -> Result<()> {
        let normalized = normalize_namespace(namespace)?;
        let mut current = self
            .namespace
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = normalized;
        Ok(())
    }

    pub fn namespace(&self) -> String {
        self.namespace
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Enables or disables the cache. Stored data is left untouched.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

/// Lower-cases `namespace`; `>>` would be read back as the namespace boundary.
fn normalize_namespace(namespace: &str) -> Result<String> {
    if namespace.contains(NAMESPACE_SEPARATOR) {
        return Err(CacheError::InvalidConfig(format!(
            "Namespace \"{}\" must not contain \"{}\"",
            namespace, NAMESPACE_SEPARATOR
        )));
    }
    Ok(namespace.to_lowercase())
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("namespace", &self.namespace())
            .field("enabled", &self.is_enabled())
            .field("mirrored_meta", &self.meta_cache.len())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::store::MemoryStore;
    use std::cell::Cell;
    use std::sync::Mutex;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        cache: Cache,
    }

    fn fixture(namespace: &str) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let cache = Cache::new(store.clone(), namespace)
            .unwrap()
            .with_clock(clock.clone());
        Fixture {
            store,
            clock,
            cache,
        }
    }

    #[test]
    fn test_set_and_get() {
        let f = fixture("test");

        f.cache.set("key1", "value1", 0).unwrap();

        assert!(f.cache.has("key1", 0).unwrap());
        assert_eq!(f.cache.get::<String>("key1", 0).unwrap(), Some("value1".to_string()));
    }

    #[test]
    fn test_get_nonexistent() {
        let f = fixture("test");

        assert!(!f.cache.has("nope", 0).unwrap());
        assert_eq!(f.cache.get::<String>("nope", 0).unwrap(), None);
    }

    #[test]
    fn test_overwrite() {
        let f = fixture("test");

        f.cache.set("key1", &1u32, 0).unwrap();
        f.cache.set("key1", &2u32, 0).unwrap();

        assert_eq!(f.cache.get::<u32>("key1", 0).unwrap(), Some(2));
    }

    #[test]
    fn test_overwrite_replaces_mirrored_meta() {
        let f = fixture("test");

        f.cache.set("key1", "short", 1).unwrap();
        assert!(f.cache.has("key1", 0).unwrap());

        f.cache.set("key1", "long", 0).unwrap();
        f.clock.advance(10);

        assert!(f.cache.has("key1", 0).unwrap(), "new record replaces the mirrored one");
    }

    #[test]
    fn test_ttl_expiration() {
        let f = fixture("test");

        f.cache.set("key1", "value1", 1).unwrap();
        assert!(f.cache.has("key1", 0).unwrap());

        f.clock.advance(1);
        assert!(f.cache.has("key1", 0).unwrap(), "fresh exactly at expiry");

        f.clock.advance(1);
        assert!(!f.cache.has("key1", 0).unwrap());
        assert_eq!(f.cache.get::<String>("key1", 0).unwrap(), None);
    }

    #[test]
    fn test_age_override_without_ttl() {
        let f = fixture("test");

        f.cache.set("key1", "value1", 0).unwrap();
        assert!(f.cache.has("key1", 1).unwrap());

        f.clock.advance(2);
        assert!(!f.cache.has("key1", 1).unwrap());
        assert!(f.cache.has("key1", 0).unwrap(), "no age limit, no expiry");
    }

    #[test]
    fn test_age_never_extends_ttl() {
        let f = fixture("test");

        f.cache.set("key1", "value1", 5).unwrap();
        f.clock.advance(6);

        assert!(!f.cache.has("key1", 3_600).unwrap());
    }

    #[test]
    fn test_clear_removes_both_records() {
        let f = fixture("test");

        f.cache.set("key1", "value1", 0).unwrap();
        assert!(f.cache.has("key1", 0).unwrap());

        f.cache.clear("key1").unwrap();

        assert!(!f.cache.has("key1", 0).unwrap());
        assert!(!f.store.exists(&resource_key("test", "key1")).unwrap());
        assert!(!f.store.exists(&meta_key("test", "key1")).unwrap());
    }

    #[test]
    fn test_clear_nonexistent_is_ok() {
        let f = fixture("test");
        f.cache.clear("ghost").unwrap();
        f.cache.clear("ghost").unwrap();
    }

    #[test]
    fn test_has_detects_out_of_band_value_removal() {
        let f = fixture("test");

        f.cache.set("key1", "value1", 0).unwrap();
        assert!(f.cache.has("key1", 0).unwrap());

        f.store.remove(&resource_key("test", "key1")).unwrap();

        assert!(!f.cache.has("key1", 0).unwrap());
    }

    #[test]
    fn test_corrupted_meta_is_a_miss() {
        let f = fixture("test");

        f.cache.set("key1", "value1", 0).unwrap();
        f.store.write(&meta_key("test", "key1"), b"{broken").unwrap();

        assert!(!f.cache.has("key1", 0).unwrap());
        assert_eq!(f.cache.get::<String>("key1", 0).unwrap(), None);
    }

    #[test]
    fn test_undecodable_value_is_a_miss() {
        let f = fixture("test");

        f.cache.set("key1", "not a number", 0).unwrap();

        assert_eq!(f.cache.get::<u64>("key1", 0).unwrap(), None);
    }

    #[test]
    fn test_read_through_callback() {
        let f = fixture("test");
        let calls = Cell::new(0);

        let value = f
            .cache
            .get_or_else("missing", 60, || {
                calls.set(calls.get() + 1);
                "computed".to_string()
            })
            .unwrap();
        assert_eq!(value, "computed");

        let again: Option<String> = f.cache.get("missing", 0).unwrap();
        assert_eq!(again.as_deref(), Some("computed"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_read_through_uses_age_as_ttl() {
        let f = fixture("test");

        f.cache.get_or_else("k", 60, || 7u8).unwrap();
        f.clock.advance(61);

        assert!(!f.cache.has("k", 0).unwrap());
        assert_eq!(f.cache.get_or_else("k", 60, || 8u8).unwrap(), 8);
    }

    #[test]
    fn test_read_through_after_desync() {
        let f = fixture("test");

        f.cache.set("key1", "old", 0).unwrap();
        f.store.remove(&resource_key("test", "key1")).unwrap();

        let value = f.cache.get_or_else("key1", 0, || "new".to_string()).unwrap();
        assert_eq!(value, "new");
        assert_eq!(f.cache.get::<String>("key1", 0).unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_failed_producer_caches_nothing() {
        let f = fixture("test");

        let result: Result<String> = f.cache.try_get_or_else("k", 0, || {
            Err(CacheError::Backend("upstream down".to_string()))
        });

        assert!(matches!(result, Err(CacheError::Backend(_))));
        assert!(!f.cache.has("k", 0).unwrap());
        assert!(f.store.is_empty());
    }

    #[test]
    fn test_disabled_cache() {
        let f = fixture("test");
        f.cache.set("before", "kept", 0).unwrap();
        f.cache.set_enabled(false);
        assert!(!f.cache.is_enabled());

        f.cache.set("key1", "value1", 0).unwrap();
        assert!(!f.store.exists(&resource_key("test", "key1")).unwrap());
        assert!(!f.cache.has("before", 0).unwrap());
        assert_eq!(f.cache.get::<String>("before", 0).unwrap(), None);

        let calls = Cell::new(0);
        for _ in 0..2 {
            let value = f
                .cache
                .get_or_else("before", 0, || {
                    calls.set(calls.get() + 1);
                    "fresh".to_string()
                })
                .unwrap();
            assert_eq!(value, "fresh");
        }
        assert_eq!(calls.get(), 2);

        f.cache.set_enabled(true);
        assert_eq!(f.cache.get::<String>("before", 0).unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_flush_only_touches_own_namespace() {
        let store = Arc::new(MemoryStore::new());
        let a = Cache::new(store.clone(), "a").unwrap();
        let b = Cache::new(store.clone(), "b").unwrap();

        a.set("same", "from a", 0).unwrap();
        b.set("same", "from b", 0).unwrap();
        assert!(a.has("same", 0).unwrap());

        a.flush().unwrap();

        assert!(!a.has("same", 0).unwrap());
        assert_eq!(b.get::<String>("same", 0).unwrap().as_deref(), Some("from b"));
    }

    #[test]
    fn test_namespace_is_lowercased() {
        let f = fixture("MixedCase");
        assert_eq!(f.cache.namespace(), "mixedcase");

        f.cache.set_namespace("Other").unwrap();
        assert_eq!(f.cache.namespace(), "other");

        f.cache.set("k", "v", 0).unwrap();
        assert!(f.store.exists("other>>resource::k").unwrap());
    }

    #[test]
    fn test_namespace_separator_rejected() {
        let store = Arc::new(MemoryStore::new());
        let result = Cache::new(store, "a>>b");
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));

        let f = fixture("kept");
        let result = f.cache.set_namespace("x>>y");
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
        assert_eq!(f.cache.namespace(), "kept");
    }

    #[test]
    fn test_empty_namespace_uses_global_keys() {
        let f = fixture("");

        f.cache.set("k", "v", 0).unwrap();
        assert!(f.store.exists("resource::k").unwrap());
        assert!(f.store.exists("meta::k").unwrap());
    }

    /// Memory store that runs a hook right after the next metadata read,
    /// interleaving a writer between a reader's store read and its mirroring.
    #[derive(Default)]
    struct InterleavingStore {
        inner: MemoryStore,
        after_meta_read: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl Store for InterleavingStore {
        fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
            let bytes = self.inner.read(key)?;
            if key.contains("meta::") {
                let hook = self.after_meta_read.lock().unwrap().take();
                if let Some(hook) = hook {
                    hook();
                }
            }
            Ok(bytes)
        }

        fn exists(&self, key: &str) -> Result<bool> {
            self.inner.exists(key)
        }

        fn write(&self, key: &str, value: &[u8]) -> Result<()> {
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }

        fn remove_all(&self, namespace: &str) -> Result<()> {
            self.inner.remove_all(namespace)
        }
    }

    #[test]
    fn test_write_during_meta_read_is_not_mirrored() {
        let store = Arc::new(InterleavingStore::default());
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let cache = Arc::new(
            Cache::new(store.clone(), "race")
                .unwrap()
                .with_clock(clock.clone()),
        );
        cache.set("k", "old", 0).unwrap();

        let writer = cache.clone();
        *store.after_meta_read.lock().unwrap() = Some(Box::new(move || {
            writer.set("k", "new", 1).unwrap();
        }));

        // This read still answers from the record it loaded before the write.
        assert!(cache.has("k", 0).unwrap());

        clock.advance(5);

        assert!(!cache.has("k", 0).unwrap());
        assert_eq!(cache.get::<String>("k", 0).unwrap(), None);
    }

    #[test]
    fn test_clear_during_meta_read_is_not_mirrored() {
        let store = Arc::new(InterleavingStore::default());
        let cache = Arc::new(Cache::new(store.clone(), "race").unwrap());
        cache.set("k", "v", 0).unwrap();

        let writer = cache.clone();
        *store.after_meta_read.lock().unwrap() = Some(Box::new(move || {
            writer.clear("k").unwrap();
        }));

        assert!(!cache.has("k", 0).unwrap());

        cache.set("k", "back", 0).unwrap();
        assert_eq!(cache.get::<String>("k", 0).unwrap().as_deref(), Some("back"));
    }

    #[test]
    fn test_stats_counts_hits_and_misses() {
        let f = fixture("test");

        f.cache.set("k", "v", 0).unwrap();
        f.cache.get::<String>("k", 0).unwrap();
        f.cache.get::<String>("missing", 0).unwrap();
        f.cache.clear("k").unwrap();
        f.cache.flush().unwrap();

        let stats = f.cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.clears, 1);
        assert_eq!(stats.flushes, 1);
    }
}
