//! Cache Key Module
//!
//! Derives deterministic cache keys from a base name plus a parameter set.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::error;

/// Number of hex characters kept from the parameter digest.
pub const DIGEST_LEN: usize = 8;

// == Cache Params ==
/// Named parameters that distinguish cached variants of the same base key.
///
/// Backed by a `BTreeMap`, so iteration is always in key order regardless of the
/// order parameters were added in.
///
/// A parameter whose value cannot be represented as JSON makes the whole set
/// uncacheable: the cache treats lookups as misses and skips writes for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheParams {
    values: BTreeMap<String, Value>,
    rejected: BTreeSet<String>,
}

impl CacheParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value under the same name.
    ///
    /// A value that cannot be represented as JSON is logged and marks the set
    /// uncacheable; use [`CacheParams::try_with`] to handle the error instead.
    pub fn with(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        self.insert(name, value);
        self
    }

    /// Fallible version of [`CacheParams::with`].
    pub fn try_with(
        mut self,
        name: impl Into<String>,
        value: impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        self.try_insert(name, value)?;
        Ok(self)
    }

    /// In-place version of [`CacheParams::with`].
    pub fn insert(&mut self, name: impl Into<String>, value: impl Serialize) {
        let name = name.into();
        if let Err(e) = self.try_insert(name.clone(), value) {
            error!("Cache param '{}' is not representable: {}", name, e);
            self.values.remove(&name);
            self.rejected.insert(name);
        }
    }

    /// In-place version of [`CacheParams::try_with`]. On error the set is unchanged.
    pub fn try_insert(
        &mut self,
        name: impl Into<String>,
        value: impl Serialize,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        let name = name.into();
        self.rejected.remove(&name);
        self.values.insert(name, value);
        Ok(())
    }

    /// False when any parameter could not be represented; such a set has no
    /// distinct key and must not be cached.
    pub fn is_cacheable(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Returns the value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Canonical text form: a JSON array of `[name, value]` pairs in name order.
    fn canonical(&self) -> String {
        let pairs: Vec<(&String, &Value)> = self.values.iter().collect();
        // Serializing string keys and JSON values cannot fail.
        serde_json::to_string(&pairs).unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for CacheParams
where
    K: Into<String>,
    V: Serialize,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

// == Encode ==
/// Builds the composite cache key for `base` and `params`.
///
/// Returns `base` unchanged when there are no params, otherwise `base:{digest}` where
/// digest is the first [`DIGEST_LEN`] hex chars of the SHA-256 of the canonical params.
pub fn encode(base: &str, params: &CacheParams) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    format!("{}:{}", base, digest(&params.canonical()))
}

fn digest(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..DIGEST_LEN / 2])
}
