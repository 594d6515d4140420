//! Mutex configuration.

use crate::error::{RedlockError, RedlockResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed allowance for network jitter subtracted from every validity window.
pub const CLOCK_DRIFT_MARGIN: Duration = Duration::from_millis(2);

/// Longest accepted lease, the largest millisecond TTL a store can be sent.
pub const MAX_EXPIRY: Duration = Duration::from_millis(i64::MAX as u64);

/// Mutex configuration.
///
/// Validated once when a [`Mutex`](crate::Mutex) is built; see
/// [`MutexConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutexConfig {
    /// Lease duration.
    #[serde(with = "millis_serde", default = "default_expiry")]
    pub expiry: Duration,
    /// Maximum acquisition attempts.
    #[serde(default = "default_tries")]
    pub tries: u32,
    /// Sleep between acquisition attempts.
    #[serde(with = "millis_serde", default = "default_retry_delay")]
    pub retry_delay: Duration,
    /// Fraction of `expiry` reserved for clock drift between nodes.
    #[serde(default = "default_drift_factor")]
    pub drift_factor: f64,
    /// Upper bound for a single node round trip.
    #[serde(with = "millis_serde", default = "default_node_timeout")]
    pub node_timeout: Duration,
}

fn default_expiry() -> Duration {
    Duration::from_secs(8)
}

fn default_tries() -> u32 {
    32
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_drift_factor() -> f64 {
    0.01
}

fn default_node_timeout() -> Duration {
    Duration::from_secs(1)
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            expiry: default_expiry(),
            tries: default_tries(),
            retry_delay: default_retry_delay(),
            drift_factor: default_drift_factor(),
            node_timeout: default_node_timeout(),
        }
    }
}

impl MutexConfig {
    /// Create a builder.
    pub fn builder() -> MutexConfigBuilder {
        MutexConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> MutexConfigBuilder {
        let mut builder = MutexConfigBuilder::new();

        if let Some(ms) = env_parse::<u64>("REDLOCK_EXPIRY_MS") {
            builder = builder.expiry(Duration::from_millis(ms));
        }

        if let Some(tries) = env_parse("REDLOCK_TRIES") {
            builder = builder.tries(tries);
        }

        if let Some(ms) = env_parse::<u64>("REDLOCK_RETRY_DELAY_MS") {
            builder = builder.retry_delay(Duration::from_millis(ms));
        }

        if let Some(factor) = env_parse("REDLOCK_DRIFT_FACTOR") {
            builder = builder.drift_factor(factor);
        }

        if let Some(ms) = env_parse::<u64>("REDLOCK_NODE_TIMEOUT_MS") {
            builder = builder.node_timeout(Duration::from_millis(ms));
        }

        builder
    }

    /// Check the configuration against the number of nodes it will run on.
    pub fn validate(&self, node_count: usize) -> RedlockResult<()> {
        if node_count == 0 {
            return Err(RedlockError::config("at least one lock store is required"));
        }
        if self.expiry < Duration::from_millis(1) {
            return Err(RedlockError::config("expiry must be at least 1ms"));
        }
        if self.expiry > MAX_EXPIRY {
            return Err(RedlockError::config(format!(
                "expiry must be at most {}ms",
                MAX_EXPIRY.as_millis()
            )));
        }
        if self.tries == 0 {
            return Err(RedlockError::config("tries must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.drift_factor) {
            return Err(RedlockError::config(format!(
                "drift factor must be in [0, 1), got {}",
                self.drift_factor
            )));
        }
        if self.node_timeout.is_zero() {
            return Err(RedlockError::config("node timeout must be positive"));
        }

        let quorum = quorum_for(node_count);
        debug_assert!((1..=node_count).contains(&quorum));

        Ok(())
    }

    /// Time subtracted from `expiry` to cover clock drift and jitter.
    pub fn drift(&self) -> Duration {
        self.expiry.mul_f64(self.drift_factor) + CLOCK_DRIFT_MARGIN
    }
}

/// Majority quorum for `node_count` independent nodes.
pub fn quorum_for(node_count: usize) -> usize {
    node_count / 2 + 1
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for mutex configuration.
#[derive(Debug, Default)]
pub struct MutexConfigBuilder {
    config: MutexConfig,
}

impl MutexConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: MutexConfig::default(),
        }
    }

    /// Set the lease duration.
    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.config.expiry = expiry;
        self
    }

    /// Set the number of acquisition attempts.
    pub fn tries(mut self, tries: u32) -> Self {
        self.config.tries = tries;
        self
    }

    /// Set the delay between acquisition attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the clock drift factor.
    pub fn drift_factor(mut self, factor: f64) -> Self {
        self.config.drift_factor = factor;
        self
    }

    /// Set the per-node round trip timeout.
    pub fn node_timeout(mut self, timeout: Duration) -> Self {
        self.config.node_timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MutexConfig {
        self.config
    }
}

mod millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
