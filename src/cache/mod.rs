//! Cache Module
//!
//! TTL-aware cache facade layered over a [`Store`](crate::store::Store).
//! Every cached value is paired with a metadata record that carries its
//! creation time and absolute expiry.

mod clock;
mod facade;
mod keys;
mod meta;
mod stats;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use facade::Cache;
pub use keys::{meta_key, resource_key, KeyKind};
pub use meta::EntryMeta;
pub use stats::CacheStats;

// == Public Constants ==
/// Separator between the type tag and the base key (`resource::key`).
pub const SEPARATOR: &str = "::";

/// Separator between a namespace and the rest of a store key (`ns>>meta::key`).
pub const NAMESPACE_SEPARATOR: &str = ">>";
