//! Quorum-based distributed mutex

use crate::config::MutexConfig;
use crate::error::{RedlockError, RedlockResult};
use crate::node::NodeSet;
use crate::token::{OsRngTokens, TokenGenerator};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lease currently believed held by this mutex
#[derive(Debug, Default)]
struct Lease {
    /// Lease token; empty when not held
    value: String,
    valid_until: Option<Instant>,
}

impl Lease {
    fn clear(&mut self) {
        self.value.clear();
        self.valid_until = None;
    }
}

/// Token of the acquisition attempt currently on the wire
type InFlight = parking_lot::Mutex<Option<String>>;

/// A distributed mutual exclusion lock.
///
/// The lock is held when a quorum of the nodes store this mutex's lease
/// token under its name. Exclusivity may only be assumed until
/// [`valid_until`](Mutex::valid_until), which is the lease expiry minus the
/// time the acquisition took and a drift allowance.
///
/// One mutex object is meant to be reused across many lock/unlock cycles.
/// Calls on the same object are serialized; mutexes with different names
/// share nothing.
pub struct Mutex {
    name: String,
    config: MutexConfig,
    nodes: NodeSet,
    tokens: Arc<dyn TokenGenerator>,
    lease: tokio::sync::Mutex<Lease>,
}

impl Mutex {
    /// Create a mutex over `nodes`.
    ///
    /// # Errors
    ///
    /// Returns [`RedlockError::Config`] if `config` is invalid for the number
    /// of nodes.
    pub fn new(name: impl Into<String>, nodes: NodeSet, config: MutexConfig) -> RedlockResult<Self> {
        config.validate(nodes.len())?;

        let name = name.into();
        debug!(name = %name, nodes = nodes.len(), quorum = nodes.quorum(), "Creating mutex");

        Ok(Self {
            name,
            config,
            nodes,
            tokens: Arc::new(OsRngTokens),
            lease: tokio::sync::Mutex::new(Lease::default()),
        })
    }

    /// Replace the lease token source
    pub fn with_token_generator(mut self, tokens: Arc<dyn TokenGenerator>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Get the lock name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum number of agreeing nodes
    pub fn quorum(&self) -> usize {
        self.nodes.quorum()
    }

    /// Get the configuration
    pub fn config(&self) -> &MutexConfig {
        &self.config
    }

    /// Current lease token, if held
    pub async fn value(&self) -> Option<String> {
        let lease = self.lease.lock().await;
        (!lease.value.is_empty()).then(|| lease.value.clone())
    }

    /// Deadline up to which exclusivity may be assumed, if held
    pub async fn valid_until(&self) -> Option<Instant> {
        self.lease.lock().await.valid_until
    }

    /// Whether a lease is held and its validity window has not closed
    pub async fn is_held(&self) -> bool {
        let lease = self.lease.lock().await;
        !lease.value.is_empty() && lease.valid_until.is_some_and(|until| Instant::now() < until)
    }

    /// Acquire the lock, retrying up to the configured number of tries.
    ///
    /// # Errors
    ///
    /// - [`RedlockError::AcquireFailed`] when no attempt reached quorum
    ///   inside its validity window
    /// - [`RedlockError::TokenGeneration`] when the random source fails;
    ///   this is never retried
    pub async fn lock(&self) -> RedlockResult<()> {
        self.acquire(&InFlight::default()).await
    }

    /// Acquire the lock, giving up after `deadline`.
    ///
    /// Node calls still outstanding when the deadline fires are dropped and
    /// the interrupted attempt's lease is released on every node.
    pub async fn lock_timeout(&self, deadline: Duration) -> RedlockResult<()> {
        let in_flight = InFlight::default();

        match tokio::time::timeout(deadline, self.acquire(&in_flight)).await {
            Ok(result) => result,
            Err(_) => {
                let pending = in_flight.lock().take();
                if let Some(token) = pending {
                    self.release_all(&token).await;
                }
                warn!(name = %self.name, deadline = ?deadline, "Lock timeout");
                Err(RedlockError::Timeout)
            }
        }
    }

    /// Make a single acquisition attempt without retrying.
    ///
    /// Returns `Ok(false)` when quorum was not reached.
    pub async fn try_lock(&self) -> RedlockResult<bool> {
        let mut lease = self.lease.lock().await;
        lease.clear();

        match self.attempt(0, &InFlight::default()).await? {
            Some((token, until)) => {
                lease.value = token;
                lease.valid_until = Some(until);
                info!("Acquired lock: {}", self.name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Release the lock.
    ///
    /// Returns whether a quorum of nodes deleted this mutex's lease. Local
    /// ownership is dropped either way. Calling `unlock` on a mutex that
    /// does not hold a lease is a programming error; it is logged and
    /// reported as `false`.
    pub async fn unlock(&self) -> bool {
        let mut lease = self.lease.lock().await;
        if lease.value.is_empty() {
            warn!(name = %self.name, "Unlock called on a mutex that is not locked");
            return false;
        }

        let token = std::mem::take(&mut lease.value);
        lease.valid_until = None;

        let votes = self.release_all(&token).await;
        let released = votes >= self.quorum();

        if released {
            info!("Released lock: {}", self.name);
        } else {
            warn!(
                name = %self.name,
                votes,
                quorum = self.quorum(),
                "Failed to release lock on a quorum (expired or lost)"
            );
        }

        released
    }

    /// Reset the lease expiry on every node to the configured expiry.
    ///
    /// Returns whether a quorum of nodes still held this mutex's lease. On
    /// success the validity window is recomputed from the start of this
    /// call; a `false` result should be treated as "lock likely lost".
    /// Extending a mutex that does not hold a lease is a programming error;
    /// it is logged and reported as `false`.
    pub async fn extend(&self) -> bool {
        let mut lease = self.lease.lock().await;
        if lease.value.is_empty() {
            warn!(name = %self.name, "Extend called on a mutex that is not locked");
            return false;
        }

        let start = Instant::now();
        let key: Arc<str> = self.name.as_str().into();
        let token: Arc<str> = lease.value.as_str().into();
        let ttl = self.config.expiry;

        let votes = self
            .nodes
            .vote(self.config.node_timeout, |node| {
                let key = Arc::clone(&key);
                let token = Arc::clone(&token);
                async move { node.try_extend(&key, &token, ttl).await }
            })
            .await;

        if votes < self.quorum() {
            warn!(name = %self.name, votes, quorum = self.quorum(), "Failed to extend lock");
            return false;
        }

        // A window already closed still records as the start instant.
        lease.valid_until = Some(self.validity_deadline(start).unwrap_or(start));
        debug!(name = %self.name, votes, "Extended lock");
        true
    }

    async fn acquire(&self, in_flight: &InFlight) -> RedlockResult<()> {
        let mut lease = self.lease.lock().await;
        lease.clear();

        for attempt in 0..self.config.tries {
            if attempt != 0 {
                tokio::time::sleep(self.config.retry_delay).await;
            }

            if let Some((token, until)) = self.attempt(attempt, in_flight).await? {
                lease.value = token;
                lease.valid_until = Some(until);
                info!("Acquired lock: {}", self.name);
                return Ok(());
            }
        }

        warn!(name = %self.name, tries = self.config.tries, "Failed to acquire lock");
        Err(RedlockError::acquire_failed(&self.name, self.config.tries))
    }

    /// One acquisition round. Returns the token and validity deadline on
    /// success; on failure every node is asked to drop the token.
    async fn attempt(
        &self,
        attempt: u32,
        in_flight: &InFlight,
    ) -> RedlockResult<Option<(String, Instant)>> {
        let token = self.tokens.generate()?;
        *in_flight.lock() = Some(token.clone());

        let start = Instant::now();
        let key: Arc<str> = self.name.as_str().into();
        let value: Arc<str> = token.as_str().into();
        let ttl = self.config.expiry;

        let votes = self
            .nodes
            .vote(self.config.node_timeout, |node| {
                let key = Arc::clone(&key);
                let value = Arc::clone(&value);
                async move { node.try_set(&key, &value, ttl).await }
            })
            .await;

        let quorum = self.quorum();
        match self.validity_deadline(start) {
            Some(until) if votes >= quorum && Instant::now() < until => {
                in_flight.lock().take();
                debug!(name = %self.name, attempt, votes, quorum, "Lock attempt succeeded");
                Ok(Some((token, until)))
            }
            window => {
                debug!(
                    name = %self.name,
                    attempt,
                    votes,
                    quorum,
                    window_closed = window.is_none(),
                    "Lock attempt failed"
                );
                self.release_all(&token).await;
                in_flight.lock().take();
                Ok(None)
            }
        }
    }

    /// `now + expiry - elapsed - drift`, or `None` when nothing is left or the
    /// deadline is not representable.
    fn validity_deadline(&self, start: Instant) -> Option<Instant> {
        let elapsed = start.elapsed();
        self.config
            .expiry
            .checked_sub(elapsed + self.config.drift())
            .and_then(|left| Instant::now().checked_add(left))
    }

    /// Best-effort compare-and-delete of `token` on every node
    async fn release_all(&self, token: &str) -> usize {
        let key: Arc<str> = self.name.as_str().into();
        let value: Arc<str> = token.into();

        self.nodes
            .vote(self.config.node_timeout, |node| {
                let key = Arc::clone(&key);
                let value = Arc::clone(&value);
                async move { node.try_release(&key, &value).await }
            })
            .await
    }
}

impl std::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutex")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("nodes", &self.nodes)
            .finish()
    }
}
