//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Longest key accepted over HTTP (the memcached key limit).
pub const MAX_KEY_LENGTH: usize = 250;

/// Request body for `PUT /caches/:cache/keys/:key`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// Any JSON value
    pub value: Value,
    /// TTL in seconds, absent or 0 = no absolute expiry
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Query string accepted by the read endpoints, `?age=60`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgeQuery {
    /// Maximum age in seconds, absent or 0 = rely on TTL only
    #[serde(default)]
    pub age: Option<u64>,
}

impl AgeQuery {
    pub fn seconds(&self) -> u64 {
        self.age.unwrap_or(0)
    }
}

/// Validates a cache or key name taken from the URL.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}
