//! Redlock: distributed mutual exclusion over independent lock stores
//!
//! A lock is held only while a quorum (`N/2 + 1`) of independent,
//! uncoordinated nodes store the holder's lease token. The validity window
//! is shortened by the time acquisition took and by a clock drift allowance,
//! so a holder never believes it owns the lock past the lease's real expiry.
//!
//! ## Features
//!
//! - **Quorum voting** - Concurrent fan-out with per-node timeouts
//! - **Lease tokens** - 32 random bytes prove ownership on release/extend
//! - **Drift compensation** - Conservative validity window
//! - **Cleanup** - Partial acquisitions are released before retrying
//! - **Pluggable stores** - Any backend implementing [`LockStore`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use redlock_core::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let redsync = Redsync::new(nodes);
//!
//!     let mutex = redsync
//!         .mutex("my-resource")
//!         .expiry(Duration::from_secs(30))
//!         .build()?;
//!
//!     mutex.lock().await?;
//!
//!     // Critical section, valid until `mutex.valid_until()`
//!
//!     if !mutex.extend().await {
//!         // Lease likely lost
//!     }
//!
//!     mutex.unlock().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mutex;
pub mod node;
pub mod redsync;
pub mod stores;
pub mod token;

pub use config::{CLOCK_DRIFT_MARGIN, MAX_EXPIRY, MutexConfig, MutexConfigBuilder, quorum_for};
pub use error::{RedlockError, RedlockResult};
pub use mutex::Mutex;
pub use node::NodeSet;
pub use redsync::{MutexBuilder, Redsync};
pub use stores::{LockStore, MemoryStore};
pub use token::{OsRngTokens, TokenGenerator};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::MutexConfig;
    pub use crate::error::{RedlockError, RedlockResult};
    pub use crate::mutex::Mutex;
    pub use crate::redsync::Redsync;
    pub use crate::stores::{LockStore, MemoryStore};
}
