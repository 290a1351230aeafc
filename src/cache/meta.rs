//! Entry Metadata Module
//!
//! Defines the TTL bookkeeping record stored next to every cached value.

use serde::{Deserialize, Serialize};

// == Entry Meta ==
/// Metadata record for a cached value.
///
/// Timestamps are Unix seconds. `expires == 0` means the entry never expires
/// on its own, though callers may still reject it with an age check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Requested time-to-live in seconds, 0 = no absolute expiry
    pub ttl: u64,
    /// Time of the write
    pub created_at: i64,
    /// Absolute expiry, 0 = never
    pub expires: i64,
}

impl EntryMeta {
    // == Constructor ==
    /// Builds the record for a write happening at `now`.
    ///
    /// `expires` is `now + ttl` when `ttl > 0`, otherwise `0`.
    pub fn new(ttl: u64, now: i64) -> Self {
        let expires = if ttl > 0 {
            now.saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX))
        } else {
            0
        };

        Self {
            ttl,
            created_at: now,
            expires,
        }
    }

    // == Is Expired ==
    /// True once `now` is strictly past the absolute expiry.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires != 0 && now > self.expires
    }

    // == Is Older Than ==
    /// True if the entry was created before `now - age`.
    ///
    /// An `age` of 0 disables the check.
    pub fn is_older_than(&self, age: u64, now: i64) -> bool {
        if age == 0 {
            return false;
        }
        let created_after = now.saturating_sub(i64::try_from(age).unwrap_or(i64::MAX));
        created_after > self.created_at
    }

    /// Combined freshness verdict used by `Cache::has`.
    pub fn is_fresh(&self, age: u64, now: i64) -> bool {
        !self.is_older_than(age, now) && !self.is_expired(now)
    }

    // == Encoding ==
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parses a stored record. Anything malformed comes back as `None`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}
