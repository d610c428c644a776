//! Cache Module
//!
//! Two-tier caching for slow upstream calls: a remote key-value store with a bounded
//! in-process fallback, plus key derivation, value encoding and memoization.

mod codec;
mod entry;
mod fallback;
mod key;
mod memoize;
mod memory;
mod order;
mod presets;
mod redis_backend;
mod remote;
mod service;
mod stats;


// Re-export public types
pub use codec::{Codec, FORMAT_BINARY, FORMAT_TEXT};
pub use entry::FallbackEntry;
pub use fallback::FallbackStore;
pub use key::{encode, CacheParams, DIGEST_LEN};
pub use memoize::{Memoized, Memoizer};
pub use memory::MemoryBackend;
pub use order::InsertionOrder;
pub use presets::DataClass;
pub use redis_backend::RedisBackend;
pub use remote::{
    escape_glob, parse_info, ConnectionState, RemoteBackend, RemoteInfo, RemoteLookup,
    RemoteStore,
};
pub use service::{CacheService, Cacheable, MEMORY_URL_SCHEME};
pub use stats::{CacheCounters, CacheStats, CounterSnapshot};
