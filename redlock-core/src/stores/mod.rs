//! Lock store backends
//!
//! A lock store is a single, independent key-value node offering three
//! atomic primitives. Nodes never talk to each other; agreement is reached
//! only by the quorum count kept in [`Mutex`](crate::Mutex).
//!
//! - **Memory**: In-process store using DashMap (tests, single process)
//! - **Redis**: see the `redlock-redis` crate

mod memory;

pub use memory::MemoryStore;

use crate::error::RedlockResult;
use async_trait::async_trait;
use std::time::Duration;

/// Trait for lock store backends
///
/// Every method must be a single atomic round trip: a check-then-act split
/// over two calls lets a party that no longer owns a lease delete or extend
/// it.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Set `key` to `value` with expiry `ttl` only if `key` is absent.
    /// Returns whether this call created the record.
    async fn try_set(&self, key: &str, value: &str, ttl: Duration) -> RedlockResult<bool>;

    /// Delete `key` if its stored value equals `value`.
    /// Returns false, leaving the key untouched, on mismatch or absence.
    async fn try_release(&self, key: &str, value: &str) -> RedlockResult<bool>;

    /// Reset the expiry of `key` to `ttl` if its stored value equals `value`.
    /// Returns false on mismatch or absence.
    async fn try_extend(&self, key: &str, value: &str, ttl: Duration) -> RedlockResult<bool>;

    /// Get store type name for debugging
    fn store_type(&self) -> &'static str;
}
