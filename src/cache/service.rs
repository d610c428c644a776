//! Cache Service Module
//!
//! The two-tier cache facade: remote store first, local fallback second. No
//! operation here returns an error; remote trouble degrades to fallback-only mode.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{
    encode, escape_glob, CacheCounters, CacheParams, CacheStats, Codec, FallbackStore,
    MemoryBackend, RedisBackend, RemoteBackend, RemoteLookup, RemoteStore,
};
use crate::config::Config;
use crate::error::Result;

/// URL scheme that selects the in-process [`MemoryBackend`] instead of Redis.
pub const MEMORY_URL_SCHEME: &str = "memory://";

// == Cacheable ==
/// Values the cache can hold in both tiers.
pub trait Cacheable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

// == Cache Service ==
/// Two-tier cache shared by every component that caches upstream results.
///
/// Construct one per process, call [`CacheService::connect`] at startup and
/// [`CacheService::disconnect`] at shutdown, and pass it around as `Arc<CacheService>`.
pub struct CacheService {
    remote: RemoteStore,
    fallback: RwLock<FallbackStore>,
    codec: Codec,
    counters: CacheCounters,
    default_ttl: u64,
}

impl CacheService {
    // == Constructor ==
    pub fn new(remote: RemoteStore, max_fallback_entries: usize, default_ttl: u64) -> Self {
        Self {
            remote,
            fallback: RwLock::new(FallbackStore::new(max_fallback_entries)),
            codec: Codec::new(),
            counters: CacheCounters::new(),
            default_ttl,
        }
    }

    /// Builds the service from configuration. Does not connect.
    ///
    /// Fails only when the remote URL cannot be parsed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn RemoteBackend> = if config.redis_url.starts_with(MEMORY_URL_SCHEME)
        {
            Arc::new(MemoryBackend::new())
        } else {
            Arc::new(RedisBackend::open(&config.redis_url)?)
        };
        let remote = RemoteStore::new(backend, config.connect_timeout)
            .with_namespace(config.namespace.clone());
        Ok(Self::new(
            remote,
            config.max_fallback_entries,
            config.default_ttl,
        ))
    }

    // == Lifecycle ==
    /// Connects the remote tier. Returns false when running on the fallback only.
    pub async fn connect(&self) -> bool {
        self.remote.connect().await
    }

    pub async fn disconnect(&self) {
        self.remote.disconnect().await;
    }

    pub async fn is_remote_connected(&self) -> bool {
        self.remote.is_connected().await
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    /// Explicit TTL if positive, otherwise the configured default.
    fn resolve_ttl(&self, ttl: Option<u64>) -> u64 {
        ttl.filter(|t| *t > 0).unwrap_or(self.default_ttl)
    }

    // == Get ==
    /// Looks `base` + `params` up in the remote tier, then the fallback tier.
    ///
    /// Uncacheable params are always a miss.
    pub async fn get<T: Cacheable>(&self, base: &str, params: &CacheParams) -> Option<T> {
        if !params.is_cacheable() {
            warn!("Skipping cache lookup for {}: params are not cacheable", base);
            self.counters.record_miss();
            return None;
        }
        let key = encode(base, params);

        if let RemoteLookup::Hit(bytes) = self.remote.get(&key).await {
            if let Some(value) = self.codec.decode::<T>(&bytes) {
                debug!("Remote cache hit: {}", key);
                self.counters.record_remote_hit();
                return Some(value);
            }
        }

        let value = self.fallback.write().await.get::<T>(&key);
        match value {
            Some(value) => {
                debug!("Fallback cache hit: {}", key);
                self.counters.record_fallback_hit();
                Some(value)
            }
            None => {
                debug!("Cache miss: {}", key);
                self.counters.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` remotely when possible, otherwise in the fallback tier.
    ///
    /// `ttl` of `None` or `Some(0)` uses the default TTL. Uncacheable params are
    /// not written anywhere.
    pub async fn set<T: Cacheable>(
        &self,
        base: &str,
        value: T,
        ttl: Option<u64>,
        params: &CacheParams,
    ) {
        if !params.is_cacheable() {
            warn!("Not caching {}: params are not cacheable", base);
            return;
        }
        let key = encode(base, params);
        let ttl = self.resolve_ttl(ttl);

        if self.remote.is_connected().await {
            if let Some(bytes) = self.codec.encode(&value) {
                if self.remote.set_with_ttl(&key, &bytes, ttl).await {
                    debug!("Data cached in remote store: {}", key);
                    return;
                }
            }
        }

        let evicted = self.fallback.write().await.put(key.clone(), value, Some(ttl));
        if let Some(evicted) = evicted {
            debug!("Fallback cache full, evicted {}", evicted);
            self.counters.record_eviction();
        }
        debug!("Data cached in fallback: {}", key);
    }

    // == Delete ==
    /// Removes the entry from both tiers. Deleting a missing key is not an error.
    pub async fn delete(&self, base: &str, params: &CacheParams) {
        if !params.is_cacheable() {
            return;
        }
        let key = encode(base, params);
        self.remote.delete(&key).await;
        self.fallback.write().await.delete(&key);
        debug!("Cache deleted: {}", key);
    }

    // == Invalidate Prefix ==
    /// Removes `base` and every parameterized variant `base:*` from both tiers.
    ///
    /// Returns the number of entries removed.
    pub async fn invalidate_prefix(&self, base: &str) -> u64 {
        let mut removed = 0;
        if self.remote.is_connected().await {
            if let Some(n) = self.remote.delete_matching(&escape_glob(base)).await {
                removed += n;
            }
            let variants = format!("{}:*", escape_glob(base));
            if let Some(n) = self.remote.delete_matching(&variants).await {
                removed += n;
            }
        }
        removed += self.fallback.write().await.delete_matching(base) as u64;
        info!("Invalidated {} cache entries under {}", removed, base);
        removed
    }

    // == Clear All ==
    /// Flushes the remote tier (when connected) and empties the fallback tier.
    pub async fn clear_all(&self) {
        self.remote.flush_all().await;
        self.fallback.write().await.clear();
        info!("All cache cleared");
    }

    // == Sweep ==
    /// Drops expired fallback entries. Returns how many were removed.
    pub async fn sweep_fallback(&self) -> usize {
        self.fallback.write().await.purge_expired()
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let remote_connected = self.remote.is_connected().await;
        let info = if remote_connected {
            self.remote.info().await
        } else {
            None
        };
        let fallback_cache_size = self.fallback.read().await.len();
        let counters = self.counters.snapshot();

        CacheStats {
            remote_connected,
            fallback_cache_size,
            remote_memory_used: info.as_ref().and_then(|i| i.used_memory_human.clone()),
            remote_connected_clients: info.and_then(|i| i.connected_clients),
            hit_rate: counters.hit_rate(),
            counters,
        }
    }
}
