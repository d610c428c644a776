//! Remote Store Module
//!
//! Adapter around the network key-value store. Every operation is guarded so a
//! failing or unreachable store degrades to "unavailable" instead of an error.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{CacheError, Result};

// == Remote Backend ==
/// The six verbs the cache needs from a remote key-value store, plus pattern deletion.
///
/// Implementations report failures as errors; [`RemoteStore`] decides what to do
/// with them.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Opens the connection and verifies it with PING.
    async fn connect(&self) -> Result<()>;

    /// Drops the connection. Never fails.
    async fn disconnect(&self);

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// SETEX: stores `value` and lets the store expire it after `ttl_secs`.
    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()>;

    /// DEL: returns the number of removed keys.
    async fn del(&self, key: &str) -> Result<u64>;

    /// FLUSHDB
    async fn flush_db(&self) -> Result<()>;

    /// INFO for one section, as the raw `field:value` text.
    async fn info(&self, section: &str) -> Result<String>;

    /// Removes every key matching the glob `pattern`, returning how many were removed.
    async fn delete_matching(&self, pattern: &str) -> Result<u64>;
}

// == Connection State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

// == Remote Lookup ==
/// Outcome of a guarded remote read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLookup {
    Hit(Vec<u8>),
    Miss,
    /// Disconnected, or the operation failed
    Unavailable,
}

// == Remote Info ==
/// Subset of INFO reported through the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteInfo {
    pub used_memory_human: Option<String>,
    pub connected_clients: Option<u64>,
}

impl RemoteInfo {
    fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            used_memory_human: fields.get("used_memory_human").cloned(),
            connected_clients: fields
                .get("connected_clients")
                .and_then(|v| v.parse().ok()),
        }
    }
}

/// Parses INFO output (`# Section` headers and `field:value` lines).
pub fn parse_info(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

/// Escapes glob metacharacters so `text` matches literally in SCAN MATCH.
pub fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// == Remote Store ==
/// Guarded adapter over a [`RemoteBackend`] that tracks [`ConnectionState`].
pub struct RemoteStore {
    backend: Arc<dyn RemoteBackend>,
    state: RwLock<ConnectionState>,
    namespace: Option<String>,
    connect_timeout: Duration,
}

impl RemoteStore {
    // == Constructor ==
    /// Wraps `backend`; the store starts Disconnected.
    pub fn new(backend: Arc<dyn RemoteBackend>, connect_timeout: Duration) -> Self {
        Self {
            backend,
            state: RwLock::new(ConnectionState::Disconnected),
            namespace: None,
            connect_timeout,
        }
    }

    /// Prefixes every remote key with `{namespace}:`.
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    fn scoped<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match &self.namespace {
            Some(ns) => Cow::Owned(format!("{}:{}", ns, key)),
            None => Cow::Borrowed(key),
        }
    }

    /// Like `scoped`, for glob patterns: the namespace is matched literally.
    fn scoped_pattern<'a>(&self, pattern: &'a str) -> Cow<'a, str> {
        match &self.namespace {
            Some(ns) => Cow::Owned(format!("{}:{}", escape_glob(ns), pattern)),
            None => Cow::Borrowed(pattern),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    // == Connect ==
    /// Connects and PINGs the remote store. Idempotent.
    ///
    /// Returns `false` (after logging a warning) when the store is unreachable; the
    /// caller keeps running on the fallback tier.
    pub async fn connect(&self) -> bool {
        let mut state = self.state.write().await;
        if *state == ConnectionState::Connected {
            return true;
        }

        let outcome = tokio::time::timeout(self.connect_timeout, self.backend.connect())
            .await
            .unwrap_or_else(|_| Err(CacheError::Timeout(self.connect_timeout.as_millis() as u64)));

        match outcome {
            Ok(()) => {
                *state = ConnectionState::Connected;
                info!("Remote cache connected");
                true
            }
            Err(e) => {
                warn!("Remote cache connection failed: {}. Using fallback cache.", e);
                false
            }
        }
    }

    // == Disconnect ==
    pub async fn disconnect(&self) {
        let mut state = self.state.write().await;
        if *state == ConnectionState::Connected {
            self.backend.disconnect().await;
            *state = ConnectionState::Disconnected;
            info!("Remote cache disconnected");
        }
    }

    // == Get ==
    pub async fn get(&self, key: &str) -> RemoteLookup {
        if !self.is_connected().await {
            return RemoteLookup::Unavailable;
        }
        match self.backend.get(&self.scoped(key)).await {
            Ok(Some(bytes)) => RemoteLookup::Hit(bytes),
            Ok(None) => RemoteLookup::Miss,
            Err(e) => {
                error!("Remote get error for {}: {}", key, e);
                RemoteLookup::Unavailable
            }
        }
    }

    // == Set With TTL ==
    /// Returns whether the remote store accepted the write.
    pub async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> bool {
        if !self.is_connected().await {
            return false;
        }
        match self.backend.set_ex(&self.scoped(key), value, ttl_secs).await {
            Ok(()) => true,
            Err(e) => {
                error!("Remote set error for {}: {}", key, e);
                false
            }
        }
    }

    // == Delete ==
    /// Returns whether the DEL was executed (not whether the key existed).
    pub async fn delete(&self, key: &str) -> bool {
        if !self.is_connected().await {
            return false;
        }
        match self.backend.del(&self.scoped(key)).await {
            Ok(removed) => {
                debug!("Remote delete {} removed {} key(s)", key, removed);
                true
            }
            Err(e) => {
                error!("Remote delete error for {}: {}", key, e);
                false
            }
        }
    }

    // == Flush All ==
    /// FLUSHDB, or only this store's keys when a namespace is configured.
    pub async fn flush_all(&self) -> bool {
        if !self.is_connected().await {
            return false;
        }
        let result = match &self.namespace {
            Some(_) => self
                .backend
                .delete_matching(&self.scoped_pattern("*"))
                .await
                .map(|_| ()),
            None => self.backend.flush_db().await,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Remote flush error: {}", e);
                false
            }
        }
    }

    // == Delete Matching ==
    /// Deletes keys matching the glob `pattern` (namespace applied).
    pub async fn delete_matching(&self, pattern: &str) -> Option<u64> {
        if !self.is_connected().await {
            return None;
        }
        match self.backend.delete_matching(&self.scoped_pattern(pattern)).await {
            Ok(removed) => Some(removed),
            Err(e) => {
                error!("Remote pattern delete error for {}: {}", pattern, e);
                None
            }
        }
    }

    // == Info ==
    /// Memory and client figures from INFO, or None when unavailable.
    pub async fn info(&self) -> Option<RemoteInfo> {
        if !self.is_connected().await {
            return None;
        }
        let mut fields = HashMap::new();
        for section in ["memory", "clients"] {
            match self.backend.info(section).await {
                Ok(text) => fields.extend(parse_info(&text)),
                Err(e) => {
                    error!("Remote info error: {}", e);
                    return None;
                }
            }
        }
        Some(RemoteInfo::from_fields(&fields))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;

    fn connected_store() -> (Arc<MemoryBackend>, RemoteStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = RemoteStore::new(backend.clone(), Duration::from_secs(1));
        (backend, store)
    }

    #[test]
    fn test_parse_info() {
        let text = "# Memory\r\nused_memory:1024\r\nused_memory_human:1.00K\r\n\r\n# Clients\r\nconnected_clients:3\r\n";
        let fields = parse_info(text);
        assert_eq!(fields.get("used_memory_human").map(String::as_str), Some("1.00K"));

        let info = RemoteInfo::from_fields(&fields);
        assert_eq!(info.used_memory_human.as_deref(), Some("1.00K"));
        assert_eq!(info.connected_clients, Some(3));
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("plain:key"), "plain:key");
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }

    #[tokio::test]
    async fn test_starts_disconnected() {
        let (_, store) = connected_store();
        assert_eq!(store.state().await, ConnectionState::Disconnected);
        assert_eq!(store.get("k").await, RemoteLookup::Unavailable);
        assert!(!store.set_with_ttl("k", b"v", 10).await);
        assert!(store.info().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let (backend, store) = connected_store();
        assert!(store.connect().await);
        assert!(store.connect().await);
        assert_eq!(backend.connect_calls(), 1);
        assert_eq!(store.state().await, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_connect_failure_stays_disconnected() {
        let (backend, store) = connected_store();
        backend.set_reachable(false);

        assert!(!store.connect().await);
        assert_eq!(store.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_get_set_delete() {
        let (_, store) = connected_store();
        store.connect().await;

        assert_eq!(store.get("k").await, RemoteLookup::Miss);
        assert!(store.set_with_ttl("k", b"v", 10).await);
        assert_eq!(store.get("k").await, RemoteLookup::Hit(b"v".to_vec()));
        assert!(store.delete("k").await);
        assert!(store.delete("k").await);
        assert_eq!(store.get("k").await, RemoteLookup::Miss);
    }

    #[tokio::test]
    async fn test_failures_are_unavailable_without_state_change() {
        let (backend, store) = connected_store();
        store.connect().await;
        backend.set_failing(true);

        assert_eq!(store.get("k").await, RemoteLookup::Unavailable);
        assert!(!store.set_with_ttl("k", b"v", 10).await);
        assert!(!store.delete("k").await);
        assert!(!store.flush_all().await);
        assert!(store.info().await.is_none());
        assert!(store.delete_matching("k*").await.is_none());
        assert_eq!(store.state().await, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_namespace_scopes_keys_and_flush() {
        let backend = Arc::new(MemoryBackend::new());
        let scoped = RemoteStore::new(backend.clone(), Duration::from_secs(1))
            .with_namespace(Some("dashboard_finance".to_string()));
        let plain = RemoteStore::new(backend.clone(), Duration::from_secs(1));
        scoped.connect().await;
        plain.connect().await;

        scoped.set_with_ttl("news", b"1", 60).await;
        plain.set_with_ttl("other", b"2", 60).await;
        assert!(backend.contains("dashboard_finance:news"));

        assert!(scoped.flush_all().await);
        assert!(!backend.contains("dashboard_finance:news"));
        assert!(backend.contains("other"));
    }

    #[tokio::test]
    async fn test_namespace_with_glob_chars_matches_literally() {
        let backend = Arc::new(MemoryBackend::new());
        let scoped = RemoteStore::new(backend.clone(), Duration::from_secs(1))
            .with_namespace(Some("fin*".to_string()));
        let plain = RemoteStore::new(backend.clone(), Duration::from_secs(1));
        scoped.connect().await;
        plain.connect().await;

        scoped.set_with_ttl("news", b"1", 60).await;
        plain.set_with_ttl("finX:news", b"2", 60).await;

        assert_eq!(scoped.delete_matching("news").await, Some(1));
        assert!(!backend.contains("fin*:news"));
        assert!(backend.contains("finX:news"));

        scoped.set_with_ttl("news", b"1", 60).await;
        assert!(scoped.flush_all().await);
        assert!(backend.contains("finX:news"));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let (backend, store) = connected_store();
        store.connect().await;
        store.set_with_ttl("k", b"v", 60).await;

        backend.set_failing(true);
        assert_eq!(store.get("k").await, RemoteLookup::Unavailable);

        backend.set_failing(false);
        assert_eq!(store.get("k").await, RemoteLookup::Hit(b"v".to_vec()));
        assert!(store.set_with_ttl("k2", b"w", 60).await);
        assert_eq!(backend.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_info() {
        let (_, store) = connected_store();
        store.connect().await;

        let info = store.info().await.unwrap();
        assert!(info.used_memory_human.is_some());
        assert_eq!(info.connected_clients, Some(1));
    }

    #[tokio::test]
    async fn test_disconnect() {
        let (_, store) = connected_store();
        store.connect().await;
        store.disconnect().await;

        assert_eq!(store.state().await, ConnectionState::Disconnected);
        assert_eq!(store.get("k").await, RemoteLookup::Unavailable);
    }
}
