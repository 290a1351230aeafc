//! Store Key Derivation
//!
//! Builds the store keys under which a cached value and its metadata live.

use super::{NAMESPACE_SEPARATOR, SEPARATOR};

// == Key Kind ==
/// Type tag embedded in every derived store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// The cached value itself
    Resource,
    /// The TTL bookkeeping record for the value
    Meta,
}

impl KeyKind {
    pub fn tag(self) -> &'static str {
        match self {
            KeyKind::Resource => "resource",
            KeyKind::Meta => "meta",
        }
    }
}

// == Build Key ==
/// Builds `[namespace>>]tag::key`. An empty namespace yields a global key.
pub fn build_key(namespace: &str, kind: KeyKind, key: &str) -> String {
    let tagged = format!("{}{}{}", kind.tag(), SEPARATOR, key);
    if namespace.is_empty() {
        return tagged;
    }

    format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, tagged)
}

/// Store key for the cached value.
pub fn resource_key(namespace: &str, key: &str) -> String {
    build_key(namespace, KeyKind::Resource, key)
}

/// Store key for the metadata record.
pub fn meta_key(namespace: &str, key: &str) -> String {
    build_key(namespace, KeyKind::Meta, key)
}
