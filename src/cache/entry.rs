//! Cache Entry Module
//!
//! Defines the structure for individual cache entries.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cache entry: the stored value plus its insertion instant.
///
/// Entries are replaced wholesale on every `put` to the same key, never
/// mutated in place, so `inserted_at` uniquely identifies one generation of
/// a key. Conditional removal compares against it to avoid deleting an
/// entry that was concurrently overwritten.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion instant; doubles as the staleness token
    pub inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current instant.
    pub fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived the given TTL.
    ///
    /// Boundary condition: an entry is considered expired once the elapsed
    /// time is greater than or equal to the TTL, so an entry becomes
    /// unavailable the moment its TTL has fully elapsed.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }

    // == Remaining ==
    /// Returns the remaining lifetime under the given TTL.
    ///
    /// Returns `Duration::ZERO` once the entry has expired. Useful for
    /// debugging and statistics purposes.
    pub fn remaining(&self, ttl: Duration) -> Duration {
        ttl.saturating_sub(self.inserted_at.elapsed())
    }
}
