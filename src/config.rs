//! Configuration Module
//!
//! Handles loading and managing cache service configuration from environment variables.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Cache service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote store connection URL
    pub redis_url: String,
    /// Default TTL in seconds for entries written without explicit TTL
    pub default_ttl: u64,
    /// Maximum number of entries the local fallback store can hold
    pub max_fallback_entries: usize,
    /// Optional prefix applied to every remote key
    pub namespace: Option<String>,
    /// Upper bound on connect + PING during `connect()`
    pub connect_timeout: Duration,
    /// Interval in seconds between fallback expiry sweeps
    pub sweep_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Remote store URL (default: redis://localhost:6379)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds, must be positive (default: 300)
    /// - `CACHE_MAX_FALLBACK_ENTRIES` - Fallback store capacity (default: 100)
    /// - `CACHE_NAMESPACE` - Remote key prefix (default: none)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect timeout in milliseconds (default: 2000)
    /// - `CACHE_SWEEP_INTERVAL` - Fallback sweep frequency in seconds (default: 60)
    /// - `SERVER_PORT` - HTTP server port (default: 8000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            default_ttl: parse_positive("CACHE_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            max_fallback_entries: parse_var("CACHE_MAX_FALLBACK_ENTRIES")
                .unwrap_or(defaults.max_fallback_entries),
            namespace: env::var("CACHE_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
            connect_timeout: parse_var("REDIS_CONNECT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            sweep_interval: parse_var("CACHE_SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Like `parse_var`, but a zero value is ignored with a warning.
fn parse_positive(name: &str) -> Option<u64> {
    parse_var::<u64>(name).filter(|&value| {
        if value == 0 {
            warn!("Ignoring {}=0, using the default", name);
        }
        value > 0
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            default_ttl: 300,
            max_fallback_entries: 100,
            namespace: None,
            connect_timeout: Duration::from_millis(2000),
            sweep_interval: 60,
            server_port: 8000,
        }
    }
}
