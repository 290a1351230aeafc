//! In-process Memory Store
//!
//! Keeps entries in a `HashMap` for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::cache::{NAMESPACE_SEPARATOR, SEPARATOR};
use crate::error::Result;
use crate::store::Store;

// == Memory Store ==
/// Map-backed store; also known as an "array cache".
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of raw keys held, metadata records included.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// True if `key` lives in `namespace` or in one of its `::` children.
///
/// Only the part before `>>` is compared; keys without one are global.
fn in_namespace(key: &str, namespace: &str) -> bool {
    let key_namespace = match key.find(NAMESPACE_SEPARATOR) {
        Some(idx) if idx > 0 => &key[..idx],
        _ => return false,
    };
    match key_namespace.strip_prefix(namespace) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.read_entries().get(key).cloned())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.read_entries().contains_key(key))
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.write_entries().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.write_entries().remove(key);
        Ok(())
    }

    fn remove_all(&self, namespace: &str) -> Result<()> {
        let mut entries = self.write_entries();
        if namespace.is_empty() {
            entries.clear();
            return Ok(());
        }

        let before = entries.len();
        entries.retain(|key, _| !in_namespace(key, namespace));
        debug!(
            namespace,
            removed = before - entries.len(),
            "Removed namespace from memory store"
        );
        Ok(())
    }
}
