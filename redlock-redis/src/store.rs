//! Redis lock store
//!
//! One Redis server (or database) per node. Acquisition is a plain
//! `SET NX PX`; release and extend compare the stored token inside a Lua
//! script so the check and the write happen in one atomic round trip.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redlock_core::{LockStore, RedlockError, RedlockResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::{RedisNodeConfig, RedisNodeError, Result};

const RELEASE_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

const EXTEND_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        redis.call("SET", KEYS[1], ARGV[1], "XX", "PX", ARGV[2])
        return 1
    else
        return 0
    end
"#;

/// Redis-backed lock store
pub struct RedisStore {
    /// Redis connection manager
    conn: ConnectionManager,
    release: redis::Script,
    extend: redis::Script,
}

impl RedisStore {
    /// Connect to a Redis node
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn new(url: &str) -> Result<Self> {
        Self::connect(&RedisNodeConfig::new(url)).await
    }

    /// Connect to a Redis node described by `config`
    pub async fn connect(config: &RedisNodeConfig) -> Result<Self> {
        let url = config.connection_url()?;
        debug!(url = %config.url, "Connecting to Redis lock node");

        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| RedisNodeError::Timeout)?
            .map_err(|e| RedisNodeError::Connection(e.to_string()))?;

        info!(url = %config.url, "Redis lock node connected");

        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection manager
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            release: redis::Script::new(RELEASE_SCRIPT),
            extend: redis::Script::new(EXTEND_SCRIPT),
        }
    }

    /// Current value of `key`
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    /// Remaining time to live of `key`, `None` when absent or persistent
    pub async fn pttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        let ms: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok((ms >= 0).then(|| Duration::from_millis(ms as u64)))
    }
}

/// Redis expiries are whole milliseconds; never send zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn store_error(e: redis::RedisError) -> RedlockError {
    RedlockError::store(e.to_string())
}

#[async_trait]
impl LockStore for RedisStore {
    async fn try_set(&self, key: &str, value: &str, ttl: Duration) -> RedlockResult<bool> {
        trace!(key = %key, ttl = ?ttl, "Redis SET NX PX");

        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX") // Only set if not exists
            .arg("PX") // Set expiry in milliseconds
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;

        Ok(reply.is_some())
    }

    async fn try_release(&self, key: &str, value: &str) -> RedlockResult<bool> {
        trace!(key = %key, "Redis compare-and-delete");

        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .release
            .key(key)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;

        Ok(deleted == 1)
    }

    async fn try_extend(&self, key: &str, value: &str, ttl: Duration) -> RedlockResult<bool> {
        trace!(key = %key, ttl = ?ttl, "Redis compare-and-expire");

        let mut conn = self.conn.clone();
        let extended: i64 = self
            .extend
            .key(key)
            .arg(value)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;

        Ok(extended == 1)
    }

    fn store_type(&self) -> &'static str {
        "redis"
    }
}

/// Connect to every node concurrently.
///
/// Fails if any node cannot be reached; a lock set is built once from a
/// fixed list of nodes.
pub async fn connect_all(configs: &[RedisNodeConfig]) -> Result<Vec<Arc<dyn LockStore>>> {
    if configs.is_empty() {
        return Err(RedisNodeError::Config("no Redis nodes configured".into()));
    }

    let stores = futures::future::try_join_all(configs.iter().map(RedisStore::connect)).await?;

    Ok(stores
        .into_iter()
        .map(|store| Arc::new(store) as Arc<dyn LockStore>)
        .collect())
}
