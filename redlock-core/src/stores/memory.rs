//! In-memory lock store
//!
//! Uses DashMap for thread-safe concurrent access. Each primitive runs under
//! the shard lock of its key, which makes compare-and-act atomic. Suitable
//! for tests and for locking between tasks of a single process. For
//! distributed deployments, use the Redis store.

use crate::error::{RedlockError, RedlockResult};
use crate::stores::LockStore;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Stored lease record; an unrepresentable deadline never expires
#[derive(Debug, Clone)]
struct Record {
    value: String,
    expires_at: Option<Instant>,
}

impl Record {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory lock store
pub struct MemoryStore {
    records: DashMap<String, Record>,
    /// When false every primitive fails as an unreachable node would
    online: AtomicBool,
    /// Artificial delay applied before every primitive
    latency: Option<Duration>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        debug!("Creating new in-memory lock store");
        Self {
            records: DashMap::new(),
            online: AtomicBool::new(true),
            latency: None,
        }
    }

    /// Delay every primitive by `latency` (simulates a slow node)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Take the store on or off line. An offline store answers every
    /// primitive with a store error.
    pub fn set_online(&self, online: bool) {
        debug!(online, "Changing memory store availability");
        self.online.store(online, Ordering::Release);
    }

    /// Whether the store currently answers requests
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Current value of `key`, if present and not expired
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.records
            .get(key)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.value.clone())
    }

    /// Remaining time to live of `key`.
    ///
    /// Returns `None` when the key is absent, expired, or has no expiry.
    pub fn pttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.records
            .get(key)
            .filter(|record| !record.is_expired(now))
            .and_then(|record| record.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Unconditionally write a record, bypassing the lease protocol.
    ///
    /// `ttl == None` stores the record without expiry. Useful to plant a
    /// foreign lease on a node.
    pub fn set_raw(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        let record = Record {
            value: value.into(),
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        };
        self.records.insert(key.into(), record);
    }

    /// Unconditionally remove a record
    pub fn remove(&self, key: &str) -> bool {
        self.records.remove(key).is_some()
    }

    /// Drop expired records
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.records.retain(|_, record| !record.is_expired(now));
        debug!(key_count = self.key_count(), "Cleanup complete");
    }

    /// Number of stored records, expired ones included until cleanup
    pub fn key_count(&self) -> usize {
        self.records.len()
    }

    async fn round_trip(&self) -> RedlockResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.is_online() {
            return Err(RedlockError::store("memory store is offline"));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn try_set(&self, key: &str, value: &str, ttl: Duration) -> RedlockResult<bool> {
        self.round_trip().await?;
        trace!(key = %key, ttl = ?ttl, "Memory store set-if-absent");

        let now = Instant::now();
        let record = Record {
            value: value.to_string(),
            expires_at: now.checked_add(ttl),
        };

        let created = match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(now) {
                    entry.insert(record);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(record);
                true
            }
        };

        Ok(created)
    }

    async fn try_release(&self, key: &str, value: &str) -> RedlockResult<bool> {
        self.round_trip().await?;
        trace!(key = %key, "Memory store compare-and-delete");

        let now = Instant::now();
        let removed = self
            .records
            .remove_if(key, |_, record| {
                !record.is_expired(now) && record.value == value
            })
            .is_some();

        Ok(removed)
    }

    async fn try_extend(&self, key: &str, value: &str, ttl: Duration) -> RedlockResult<bool> {
        self.round_trip().await?;
        trace!(key = %key, ttl = ?ttl, "Memory store compare-and-expire");

        let now = Instant::now();
        if let Some(mut record) = self.records.get_mut(key)
            && !record.is_expired(now)
            && record.value == value
        {
            record.expires_at = now.checked_add(ttl);
            return Ok(true);
        }

        Ok(false)
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
