//! Memoization Module
//!
//! Wraps async computations so repeated calls with equivalent parameters reuse the
//! cached result instead of recomputing it.
//!
//! ```ignore
//! let memo = Memoizer::for_class(cache.clone(), DataClass::MarketData);
//! let market_cap = memo.wrap("market_cap", |params| async move { fetch(params).await });
//! let value = market_cap.call(CacheParams::new().with("year", 2024)).await;
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::cache::{encode, CacheParams, CacheService, Cacheable, DataClass};

type InflightTable = DashMap<String, Arc<Mutex<()>>>;

// == Memoizer ==
/// Factory for memoized computations sharing a key prefix and a TTL.
#[derive(Clone)]
pub struct Memoizer {
    cache: Arc<CacheService>,
    prefix: String,
    ttl: u64,
    inflight: Option<Arc<InflightTable>>,
}

impl Memoizer {
    pub fn new(cache: Arc<CacheService>, prefix: impl Into<String>, ttl: u64) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            ttl,
            inflight: None,
        }
    }

    /// Memoizer using the prefix and TTL preset of `class`.
    pub fn for_class(cache: Arc<CacheService>, class: DataClass) -> Self {
        Self::new(cache, class.prefix(), class.ttl())
    }

    /// Coalesces concurrent misses on the same key into a single computation.
    ///
    /// Without this, concurrent callers that miss together each run the computation.
    pub fn single_flight(mut self) -> Self {
        self.inflight = Some(Arc::new(DashMap::new()));
        self
    }

    /// Wraps `f`; `name` identifies the computation within the prefix.
    pub fn wrap<F>(&self, name: impl AsRef<str>, f: F) -> Memoized<F> {
        Memoized {
            cache: self.cache.clone(),
            base: format!("{}:{}", self.prefix, name.as_ref()),
            ttl: self.ttl,
            inflight: self.inflight.clone(),
            f,
        }
    }
}

// == Memoized ==
/// A memoized async computation produced by [`Memoizer::wrap`].
pub struct Memoized<F> {
    cache: Arc<CacheService>,
    base: String,
    ttl: u64,
    inflight: Option<Arc<InflightTable>>,
    f: F,
}

impl<F> Memoized<F> {
    /// Base key under which results are cached (`{prefix}:{name}`).
    pub fn base_key(&self) -> &str {
        &self.base
    }

    /// Full cache key for one set of params.
    pub fn cache_key(&self, params: &CacheParams) -> String {
        encode(&self.base, params)
    }

    // == Call ==
    /// Returns the cached result for `params`, computing and caching it on a miss.
    pub async fn call<T, Fut>(&self, params: CacheParams) -> T
    where
        F: Fn(CacheParams) -> Fut,
        Fut: Future<Output = T>,
        T: Cacheable,
    {
        let outcome = self
            .run(&params, || async { Ok::<T, Infallible>((self.f)(params.clone()).await) })
            .await;
        match outcome {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    // == Try Call ==
    /// Like [`Memoized::call`] for fallible computations. Errors are returned as-is
    /// and never cached.
    pub async fn try_call<T, E, Fut>(&self, params: CacheParams) -> Result<T, E>
    where
        F: Fn(CacheParams) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Cacheable,
    {
        self.run(&params, || (self.f)(params.clone())).await
    }

    async fn run<T, E, C, Fut>(&self, params: &CacheParams, compute: C) -> Result<T, E>
    where
        C: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Cacheable,
    {
        if !params.is_cacheable() {
            debug!("Params for {} are not cacheable, computing directly", self.base);
            return compute().await;
        }

        if let Some(hit) = self.cache.get::<T>(&self.base, params).await {
            debug!("Memoized hit for {}", self.base);
            return Ok(hit);
        }

        let key = self.cache_key(params);
        let guard = self.acquire(&key).await;
        if guard.is_some() {
            // Another caller may have filled the entry while we waited.
            if let Some(hit) = self.cache.get::<T>(&self.base, params).await {
                self.release(&key, guard);
                return Ok(hit);
            }
        }

        let outcome = compute().await;
        if let Ok(value) = &outcome {
            self.cache
                .set(&self.base, value.clone(), Some(self.ttl), params)
                .await;
            debug!("Cached result for {}", self.base);
        }
        self.release(&key, guard);
        outcome
    }

    async fn acquire(&self, key: &str) -> Option<OwnedMutexGuard<()>> {
        let table = self.inflight.as_ref()?;
        let lock = table
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Some(lock.lock_owned().await)
    }

    fn release(&self, key: &str, guard: Option<OwnedMutexGuard<()>>) {
        drop(guard);
        if let Some(table) = &self.inflight {
            table.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryBackend, RemoteStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache() -> Arc<CacheService> {
        let remote = RemoteStore::new(Arc::new(MemoryBackend::new()), Duration::from_secs(1));
        Arc::new(CacheService::new(remote, 100, 300))
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let memo = Memoizer::new(cache(), "market", 300);
        let lookup = memo.wrap("market_cap", move |params: CacheParams| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                params.get("year").and_then(|v| v.as_i64()).unwrap_or(0) * 10
            }
        });

        let params = CacheParams::new().with("year", 2024);
        assert_eq!(lookup.call(params.clone()).await, 20240);
        assert_eq!(lookup.call(params).await, 20240);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(lookup.call(CacheParams::new().with("year", 2023)).await, 20230);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_key_includes_prefix_and_name() {
        let memo = Memoizer::for_class(cache(), DataClass::NewsFeed);
        let news = memo.wrap("all_news", |_params: CacheParams| async { vec!["a".to_string()] });

        assert_eq!(news.base_key(), "news:all_news");
        assert_eq!(news.cache_key(&CacheParams::new()), "news:all_news");
    }

    #[tokio::test]
    async fn test_try_call_does_not_cache_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let memo = Memoizer::new(cache(), "financial", 3600);
        let chart = memo.wrap("chart", move |_params: CacheParams| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err("upstream timeout".to_string())
                } else {
                    Ok(vec![1.5f64, 2.5])
                }
            }
        });

        assert_eq!(chart.try_call(CacheParams::new()).await, Err("upstream timeout".to_string()));
        assert_eq!(chart.try_call(CacheParams::new()).await, Ok(vec![1.5, 2.5]));
        assert_eq!(chart.try_call(CacheParams::new()).await, Ok(vec![1.5, 2.5]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_uncacheable_params_always_compute() {
        use std::collections::HashMap;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let memo = Memoizer::new(cache(), "market", 300).single_flight();
        let screen = memo.wrap("screen", move |_params: CacheParams| {
            let counter = counter.clone();
            async move { counter.fetch_add(1, Ordering::SeqCst) }
        });

        let a = CacheParams::new().with("filter", HashMap::from([((1, 2), 3)]));
        let b = CacheParams::new().with("filter", HashMap::from([((9, 9), 9)]));
        assert_eq!(screen.call(a.clone()).await, 0);
        assert_eq!(screen.call(b).await, 1);
        assert_eq!(screen.call(a).await, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_flight_table_is_cleaned_up() {
        let memo = Memoizer::new(cache(), "stock", 30).single_flight();
        let price = memo.wrap("price", |_params: CacheParams| async { 91.5f64 });

        price.call(CacheParams::new().with("symbol", "VCB")).await;

        let table = memo.inflight.as_ref().unwrap();
        assert!(table.is_empty());
    }
}
