//! Fallback Entry Module
//!
//! Defines the structure for individual fallback-store entries with TTL support.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

// == Fallback Entry ==
/// A value held by the local fallback store together with its timestamps.
///
/// The value is type-erased so one store can hold results of different types;
/// readers recover it with [`FallbackEntry::value`].
#[derive(Clone)]
pub struct FallbackEntry {
    value: Arc<dyn Any + Send + Sync>,
    /// Insertion timestamp (Unix milliseconds)
    pub inserted_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl FallbackEntry {
    // == Constructor ==
    /// Creates a new entry with optional TTL in seconds.
    pub fn new<T>(value: T, ttl_seconds: Option<u64>) -> Self
    where
        T: Any + Send + Sync,
    {
        let now = current_timestamp_ms();
        Self {
            value: Arc::new(value),
            inserted_at: now,
            expires_at: ttl_seconds.map(|ttl| now.saturating_add(ttl.saturating_mul(1000))),
        }
    }

    // == Value ==
    /// Returns a clone of the stored value if it has type `T`.
    pub fn value<T>(&self) -> Option<T>
    where
        T: Any + Clone,
    {
        self.value.downcast_ref::<T>().cloned()
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }
}

impl fmt::Debug for FallbackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackEntry")
            .field("inserted_at", &self.inserted_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
