//! In-Process Remote Backend
//!
//! A [`RemoteBackend`] that keeps entries in process memory. Selected with the
//! `memory://` URL for single-node runs, and used as a controllable store in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::cache::RemoteBackend;
use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Instant,
}

// == Memory Backend ==
#[derive(Debug)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, StoredValue>>,
    reachable: AtomicBool,
    failing: AtomicBool,
    connected: AtomicBool,
    connect_calls: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            connect_calls: AtomicU64::new(0),
        }
    }

    /// When false, `connect` fails as if the server were down.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// When true, every data operation fails as if the connection broke.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> u64 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Whether an unexpired entry exists under the exact (already namespaced) key.
    pub fn contains(&self, key: &str) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|v| v.expires_at > Instant::now())
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|v| v.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredValue>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("connection reset".to_string()));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("not connected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteBackend for MemoryBackend {
    async fn connect(&self) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("connection refused".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check()?;
        let mut entries = self.lock();
        match entries.get(key) {
            Some(value) if value.expires_at > Instant::now() => Ok(Some(value.bytes.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()> {
        self.check()?;
        if ttl_secs == 0 {
            return Err(CacheError::InvalidRequest(
                "invalid expire time in 'setex' command".to_string(),
            ));
        }
        self.lock().insert(
            key.to_string(),
            StoredValue {
                bytes: value.to_vec(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<u64> {
        self.check()?;
        Ok(u64::from(self.lock().remove(key).is_some()))
    }

    async fn flush_db(&self) -> Result<()> {
        self.check()?;
        self.lock().clear();
        Ok(())
    }

    async fn info(&self, section: &str) -> Result<String> {
        self.check()?;
        let text = match section {
            "memory" => {
                let used: usize = self.lock().values().map(|v| v.bytes.len()).sum();
                format!(
                    "# Memory\r\nused_memory:{}\r\nused_memory_human:{:.2}K\r\n",
                    used,
                    used as f64 / 1024.0
                )
            }
            "clients" => "# Clients\r\nconnected_clients:1\r\n".to_string(),
            _ => String::new(),
        };
        Ok(text)
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        self.check()?;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        Ok((before - entries.len()) as u64)
    }
}

/// Glob matching with `*`, `?` and backslash escapes.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_from(&pattern, &text)
}

fn glob_match_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => (0..=text.len()).any(|skip| glob_match_from(rest, &text[skip..])),
        Some(('?', rest)) => !text.is_empty() && glob_match_from(rest, &text[1..]),
        Some(('\\', rest)) if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && glob_match_from(&rest[1..], &text[1..])
        }
        Some((c, rest)) => text.first() == Some(c) && glob_match_from(rest, &text[1..]),
    }
}
