//! Redis Backend Module
//!
//! [`RemoteBackend`] implementation on top of the redis crate.

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    Client,
};
use tokio::sync::RwLock;
use tracing::trace;

use crate::cache::RemoteBackend;
use crate::error::{CacheError, Result};

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 200;

/// Attempts made by the connection manager for the initial connect and for each
/// reconnect after the socket drops.
const CONNECT_RETRIES: usize = 2;

// == Redis Backend ==
/// Redis store reached through a [`ConnectionManager`].
///
/// The manager is created by `connect()`; until then every data operation fails
/// with [`CacheError::Connection`]. Once created it re-establishes a dropped
/// connection on its own, so a restarted server is picked up again by later
/// commands without another `connect()`.
pub struct RedisBackend {
    client: Client,
    connection: RwLock<Option<ConnectionManager>>,
}

impl RedisBackend {
    /// Parses `url` without touching the network.
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| CacheError::InvalidConfig(format!("redis url '{}': {}", url, e)))?;
        Ok(Self {
            client,
            connection: RwLock::new(None),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| CacheError::Connection("connect() has not succeeded".to_string()))
    }
}

#[async_trait]
impl RemoteBackend for RedisBackend {
    async fn connect(&self) -> Result<()> {
        trace!("Initialize redis connection manager");
        let config = ConnectionManagerConfig::new().set_number_of_retries(CONNECT_RETRIES);
        let mut con = self.client.get_connection_manager_with_config(config).await?;
        redis::cmd("PING").query_async::<()>(&mut con).await?;
        *self.connection.write().await = Some(con);
        Ok(())
    }

    async fn disconnect(&self) {
        // Dropping the last manager handle closes the socket.
        self.connection.write().await.take();
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut con = self.connection().await?;
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut con)
            .await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()> {
        let mut con = self.connection().await?;
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async::<()>(&mut con)
            .await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<u64> {
        let mut con = self.connection().await?;
        let removed = redis::cmd("DEL")
            .arg(key)
            .query_async::<u64>(&mut con)
            .await?;
        Ok(removed)
    }

    async fn flush_db(&self) -> Result<()> {
        let mut con = self.connection().await?;
        redis::cmd("FLUSHDB").query_async::<()>(&mut con).await?;
        Ok(())
    }

    async fn info(&self, section: &str) -> Result<String> {
        let mut con = self.connection().await?;
        let text = redis::cmd("INFO")
            .arg(section)
            .query_async::<String>(&mut con)
            .await?;
        Ok(text)
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let mut con = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async::<(u64, Vec<Vec<u8>>)>(&mut con)
                .await?;

            if !keys.is_empty() {
                removed += del_keys(&keys).query_async::<u64>(&mut con).await?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        trace!("SCAN {} removed {} key(s)", pattern, removed);
        Ok(removed)
    }
}

/// DEL for raw SCAN keys; keys are passed as bytes and need not be UTF-8.
fn del_keys(keys: &[Vec<u8>]) -> redis::Cmd {
    let mut cmd = redis::cmd("DEL");
    for key in keys {
        cmd.arg(key.as_slice());
    }
    cmd
}
