//! Versioned-key Store
//!
//! Namespace invalidation for flat memory-object backends (memcached style)
//! that cannot enumerate or delete by prefix.
//!
//! Each namespace owns a generation counter stored under
//! `md5(namespace)>>version`. Every namespaced key is rewritten to embed the
//! current generation right after the namespace segment, so
//! `users>>resource::42` is stored as `users>>3>>resource::42`. Flushing a
//! namespace bumps its counter: old keys become unreachable in O(1) and are
//! left for the backend's own eviction to reclaim.

use dashmap::DashMap;
use tracing::{debug, info};

use crate::cache::NAMESPACE_SEPARATOR;
use crate::error::{CacheError, Result};
use crate::store::Store;

/// Generation every namespace starts at.
pub const INITIAL_GENERATION: u64 = 1;

// == Object Backend Trait ==
/// Flat key/value primitives of a distributed memory-object store.
pub trait ObjectBackend: Send + Sync {
    /// Returns the stored bytes, `None` when the key is not found.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Stores only if the key is absent. Returns whether it was stored.
    fn add(&self, key: &str, value: &[u8]) -> Result<bool>;

    fn delete(&self, key: &str) -> Result<()>;

    /// Atomically increments a decimal counter and returns the new value.
    ///
    /// `None` means the counter is missing or the backend has no atomic
    /// increment; callers then fall back to read-modify-write.
    fn increment(&self, _key: &str) -> Result<Option<u64>> {
        Ok(None)
    }

    /// Drops every key in the backend.
    fn flush(&self) -> Result<()>;
}

// == Memory Object Backend ==
/// In-process stand-in for a memcached server.
#[derive(Debug, Default)]
pub struct MemoryObjectBackend {
    items: DashMap<String, Vec<u8>>,
}

impl MemoryObjectBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physical items, orphaned generations included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }
}

impl ObjectBackend for MemoryObjectBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.items.get(key).map(|item| item.value().clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.items.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn add(&self, key: &str, value: &[u8]) -> Result<bool> {
        let mut stored = false;
        self.items.entry(key.to_string()).or_insert_with(|| {
            stored = true;
            value.to_vec()
        });
        Ok(stored)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }

    fn increment(&self, key: &str) -> Result<Option<u64>> {
        // The shard lock held by get_mut makes read-add-write atomic.
        let Some(mut item) = self.items.get_mut(key) else {
            return Ok(None);
        };
        let next = parse_counter(key, item.value())? + 1;
        *item.value_mut() = next.to_string().into_bytes();
        Ok(Some(next))
    }

    fn flush(&self) -> Result<()> {
        self.items.clear();
        Ok(())
    }
}

fn parse_counter(key: &str, bytes: &[u8]) -> Result<u64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| CacheError::Backend(format!("Counter at '{}' is not a number", key)))
}

// == Versioned Store ==
/// [`Store`] adapter that implements namespace removal by generation bumps.
#[derive(Debug, Default)]
pub struct VersionedStore<B> {
    backend: B,
    /// Process-local view of each namespace's current generation
    generations: DashMap<String, u64>,
}

impl<B: ObjectBackend> VersionedStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            generations: DashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Key holding the generation counter of `namespace`.
    pub fn generation_key(namespace: &str) -> String {
        format!("{:x}{}version", md5::compute(namespace), NAMESPACE_SEPARATOR)
    }

    // == Generation ==
    /// Current generation of `namespace`, read from the backend at most once
    /// per process unless [`refresh_generations`](Self::refresh_generations)
    /// is called.
    pub fn generation(&self, namespace: &str) -> Result<u64> {
        if let Some(generation) = self.generations.get(namespace) {
            return Ok(*generation);
        }

        let key = Self::generation_key(namespace);
        let generation = match self.backend.get(&key)? {
            Some(bytes) => parse_counter(&key, &bytes)?,
            None => {
                // Seed the counter so later flushes can use the atomic increment.
                let seed = INITIAL_GENERATION.to_string();
                if self.backend.add(&key, seed.as_bytes())? {
                    INITIAL_GENERATION
                } else {
                    match self.backend.get(&key)? {
                        Some(bytes) => parse_counter(&key, &bytes)?,
                        None => INITIAL_GENERATION,
                    }
                }
            }
        };

        // A concurrent flush may have recorded a newer generation meanwhile.
        let generation = *self
            .generations
            .entry(namespace.to_string())
            .and_modify(|g| *g = (*g).max(generation))
            .or_insert(generation);
        Ok(generation)
    }

    /// Forgets cached generations so bumps made by other processes become visible.
    pub fn refresh_generations(&self) {
        self.generations.clear();
    }

    // == Bump Generation ==
    fn bump_generation(&self, namespace: &str) -> Result<u64> {
        let key = Self::generation_key(namespace);

        let next = match self.backend.increment(&key)? {
            Some(next) => next,
            None => {
                // Two racing fallbacks may coalesce into a single bump.
                let stored = match self.backend.get(&key)? {
                    Some(bytes) => parse_counter(&key, &bytes)?,
                    None => INITIAL_GENERATION,
                };
                let local = self
                    .generations
                    .get(namespace)
                    .map(|g| *g)
                    .unwrap_or(INITIAL_GENERATION);
                let next = stored.max(local) + 1;
                self.backend.set(&key, next.to_string().as_bytes())?;
                next
            }
        };

        self.generations
            .entry(namespace.to_string())
            .and_modify(|g| *g = (*g).max(next))
            .or_insert(next);

        info!(namespace, generation = next, "Bumped namespace generation");
        Ok(next)
    }

    // == Versioned Key ==
    /// Splices the namespace generation after the namespace segment.
    ///
    /// Keys without a namespace segment pass through untouched.
    pub fn versioned_key(&self, key: &str) -> Result<String> {
        match key.find(NAMESPACE_SEPARATOR) {
            Some(idx) if idx > 0 => {
                let (namespace, rest) = key.split_at(idx);
                let generation = self.generation(namespace)?;
                Ok(format!(
                    "{}{}{}{}",
                    namespace, NAMESPACE_SEPARATOR, generation, rest
                ))
            }
            _ => Ok(key.to_string()),
        }
    }
}

impl<B: ObjectBackend> Store for VersionedStore<B> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.backend.get(&self.versioned_key(key)?)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.read(key)?.is_some())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.backend.set(&self.versioned_key(key)?, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.backend.delete(&self.versioned_key(key)?)
    }

    fn remove_all(&self, namespace: &str) -> Result<()> {
        if namespace.is_empty() {
            self.backend.flush()?;
            self.generations.clear();
            debug!("Flushed memory-object backend");
            return Ok(());
        }

        self.bump_generation(namespace)?;
        Ok(())
    }
}
