//! Redis node configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{RedisNodeError, Result};

/// Configuration of one Redis lock node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisNodeConfig {
    /// Redis URL (redis://host:port or rediss://host:port for TLS).
    pub url: String,
    /// Connection timeout.
    #[serde(with = "secs_serde", default = "default_connection_timeout")]
    pub connection_timeout: Duration,
    /// Database number (0-15).
    pub database: Option<u8>,
    /// Username for Redis 6+ ACL.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Use TLS.
    pub tls: bool,
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for RedisNodeConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connection_timeout: default_connection_timeout(),
            database: None,
            username: None,
            password: None,
            tls: false,
        }
    }
}

impl RedisNodeConfig {
    /// Create a new configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> RedisNodeConfigBuilder {
        RedisNodeConfigBuilder::new()
    }

    /// Load shared node settings from environment variables.
    pub fn from_env() -> RedisNodeConfigBuilder {
        let mut builder = RedisNodeConfigBuilder::new();

        if let Ok(db) = std::env::var("REDLOCK_REDIS_DATABASE")
            && let Ok(db_num) = db.parse() {
                builder = builder.database(db_num);
            }

        if let Ok(username) = std::env::var("REDLOCK_REDIS_USERNAME") {
            builder = builder.username(username);
        }

        if let Ok(password) = std::env::var("REDLOCK_REDIS_PASSWORD") {
            builder = builder.password(password);
        }

        if let Ok(secs) = std::env::var("REDLOCK_REDIS_CONNECT_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse() {
                builder = builder.connection_timeout(Duration::from_secs(secs));
            }

        if std::env::var("REDLOCK_REDIS_TLS").is_ok() {
            builder = builder.tls(true);
        }

        builder
    }

    /// Load one configuration per node from `REDLOCK_REDIS_URLS`
    /// (comma separated), sharing the settings read by [`from_env`](Self::from_env).
    pub fn nodes_from_env() -> Vec<RedisNodeConfig> {
        let shared = Self::from_env().build();

        std::env::var("REDLOCK_REDIS_URLS")
            .map(|urls| parse_url_list(&urls))
            .unwrap_or_default()
            .into_iter()
            .map(|url| {
                let mut config = shared.clone();
                config.url = url;
                if config.tls {
                    config.url = config.url.replacen("redis://", "rediss://", 1);
                }
                config
            })
            .collect()
    }

    /// Get the full Redis URL with auth and database.
    pub fn connection_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| RedisNodeError::Config(format!("invalid url '{}': {}", self.url, e)))?;

        match url.scheme() {
            "redis" | "rediss" | "redis+unix" | "unix" => {}
            other => {
                return Err(RedisNodeError::Config(format!(
                    "unsupported scheme '{}'",
                    other
                )));
            }
        }

        if let Some(password) = &self.password {
            // Legacy auth uses an empty username: redis://:password@host
            let username = self.username.as_deref().unwrap_or("");
            url.set_username(username)
                .and_then(|_| url.set_password(Some(password)))
                .map_err(|_| RedisNodeError::Config("url cannot carry credentials".into()))?;
        }

        if let Some(db) = self.database
            && matches!(url.path(), "" | "/")
        {
            url.set_path(&format!("/{}", db));
        }

        Ok(url.to_string())
    }
}

fn parse_url_list(urls: &str) -> Vec<String> {
    urls.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builder for Redis node configuration.
#[derive(Default)]
pub struct RedisNodeConfigBuilder {
    config: RedisNodeConfig,
}

impl RedisNodeConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RedisNodeConfig::default(),
        }
    }

    /// Set the Redis URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Set the connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Set the database number.
    pub fn database(mut self, db: u8) -> Self {
        self.config.database = Some(db);
        self
    }

    /// Set the username (Redis 6+ ACL).
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Enable TLS.
    pub fn tls(mut self, enabled: bool) -> Self {
        self.config.tls = enabled;
        if enabled && self.config.url.starts_with("redis://") {
            self.config.url = self.config.url.replacen("redis://", "rediss://", 1);
        }
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RedisNodeConfig {
        self.config
    }
}

mod secs_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
