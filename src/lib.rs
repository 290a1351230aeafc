//! nscache - Namespaced TTL cache facade
//!
//! Adds per-key TTL metadata, age checks, read-through callbacks and
//! namespace-wide invalidation on top of plain key/value stores (memory,
//! filesystem, or a flat memory-object backend using versioned keys).

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod store;

pub use api::AppState;
pub use cache::{Cache, CacheStats, Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{CacheError, Result};
pub use registry::CacheRegistry;
pub use store::{FileStore, MemoryObjectBackend, MemoryStore, ObjectBackend, Store, VersionedStore};
