//! Mutex factory bound to a fixed set of lock stores

use crate::config::MutexConfig;
use crate::error::RedlockResult;
use crate::mutex::Mutex;
use crate::node::NodeSet;
use crate::stores::LockStore;
use crate::token::TokenGenerator;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Creates distributed mutexes over one set of independent lock stores.
///
/// # Examples
///
/// ```rust
/// use redlock_core::{LockStore, MemoryStore, Redsync};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let nodes: Vec<Arc<dyn LockStore>> = (0..3)
///     .map(|_| Arc::new(MemoryStore::new()) as Arc<dyn LockStore>)
///     .collect();
///
/// let redsync = Redsync::new(nodes);
/// let mutex = redsync
///     .mutex("my-resource")
///     .expiry(Duration::from_secs(30))
///     .tries(5)
///     .build()?;
///
/// mutex.lock().await?;
/// // Critical section
/// mutex.unlock().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Redsync {
    nodes: NodeSet,
    defaults: MutexConfig,
}

impl Redsync {
    /// Create a factory over `nodes` with default mutex settings
    pub fn new(nodes: Vec<Arc<dyn LockStore>>) -> Self {
        Self::with_defaults(nodes, MutexConfig::default())
    }

    /// Create a factory whose mutexes start from `defaults`
    pub fn with_defaults(nodes: Vec<Arc<dyn LockStore>>, defaults: MutexConfig) -> Self {
        let nodes = NodeSet::new(nodes);
        info!(nodes = nodes.len(), quorum = nodes.quorum(), "Creating redsync");
        Self { nodes, defaults }
    }

    /// Get the node set
    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    /// Get the default mutex configuration
    pub fn defaults(&self) -> &MutexConfig {
        &self.defaults
    }

    /// Start building a mutex with the given name
    pub fn mutex(&self, name: impl Into<String>) -> MutexBuilder {
        MutexBuilder {
            name: name.into(),
            nodes: self.nodes.clone(),
            config: self.defaults.clone(),
            tokens: None,
        }
    }

    /// Create a mutex with the factory defaults
    pub fn new_mutex(&self, name: impl Into<String>) -> RedlockResult<Mutex> {
        self.mutex(name).build()
    }
}

/// Mutex builder
pub struct MutexBuilder {
    name: String,
    nodes: NodeSet,
    config: MutexConfig,
    tokens: Option<Arc<dyn TokenGenerator>>,
}

impl MutexBuilder {
    /// Replace the whole configuration
    pub fn config(mut self, config: MutexConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the lease duration
    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.config.expiry = expiry;
        self
    }

    /// Set the number of acquisition attempts
    pub fn tries(mut self, tries: u32) -> Self {
        self.config.tries = tries;
        self
    }

    /// Set the delay between acquisition attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the clock drift factor
    pub fn drift_factor(mut self, factor: f64) -> Self {
        self.config.drift_factor = factor;
        self
    }

    /// Set the per-node round trip timeout
    pub fn node_timeout(mut self, timeout: Duration) -> Self {
        self.config.node_timeout = timeout;
        self
    }

    /// Use a custom lease token source
    pub fn token_generator(mut self, tokens: Arc<dyn TokenGenerator>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Build the mutex, validating its configuration
    pub fn build(self) -> RedlockResult<Mutex> {
        let mutex = Mutex::new(self.name, self.nodes, self.config)?;
        Ok(match self.tokens {
            Some(tokens) => mutex.with_token_generator(tokens),
            None => mutex,
        })
    }
}
