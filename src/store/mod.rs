//! Store Module
//!
//! Raw byte storage consumed by [`Cache`](crate::cache::Cache). A store only
//! needs read/write/exists/remove and a namespace-scoped bulk removal; TTL
//! policy lives entirely in the cache layer.

mod file;
mod memory;
mod versioned;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use versioned::{MemoryObjectBackend, ObjectBackend, VersionedStore};

use crate::error::Result;

// == Store Trait ==
/// Capability contract every cache backend satisfies.
///
/// Keys arrive already derived by the cache (`ns>>tag::key`). Every method
/// may fail with the backend's own I/O error, which the cache propagates
/// unchanged.
pub trait Store: Send + Sync {
    /// Returns the stored bytes, or `None` when the key is absent.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn exists(&self, key: &str) -> Result<bool>;

    fn write(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Removes one key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Removes everything under `namespace`, or everything at all when
    /// `namespace` is empty. Idempotent.
    fn remove_all(&self, namespace: &str) -> Result<()>;
}
