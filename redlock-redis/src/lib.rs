//! # Redlock Redis
//!
//! Redis lock store for `redlock-core`.
//!
//! Each Redis server is one independent node. Acquisition uses
//! `SET key token NX PX ttl`; release and extend run Lua scripts that compare
//! the stored token before deleting or re-expiring the key.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use redlock_core::Redsync;
//! use redlock_redis::{RedisNodeConfig, connect_all};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let configs = vec![
//!         RedisNodeConfig::new("redis://10.0.0.1:6379"),
//!         RedisNodeConfig::new("redis://10.0.0.2:6379"),
//!         RedisNodeConfig::new("redis://10.0.0.3:6379"),
//!     ];
//!
//!     let redsync = Redsync::new(connect_all(&configs).await?);
//!     let mutex = redsync.new_mutex("my-resource")?;
//!
//!     mutex.lock().await?;
//!     // Critical section
//!     mutex.unlock().await;
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod store;

pub use config::{RedisNodeConfig, RedisNodeConfigBuilder};
pub use error::{RedisNodeError, Result};
pub use store::{RedisStore, connect_all};

// Re-export redis crate for convenience
pub use redis;
