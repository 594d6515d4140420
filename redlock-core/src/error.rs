//! Error types for distributed mutexes

use thiserror::Error;

/// Result type for Redlock operations
pub type RedlockResult<T> = Result<T, RedlockError>;

/// Redlock errors
#[derive(Debug, Error)]
pub enum RedlockError {
    /// The random source could not produce a lease token
    #[error("Failed to generate lease token: {0}")]
    TokenGeneration(String),

    /// Quorum was not reached (or the validity window was exhausted)
    /// within the configured number of attempts
    #[error("Failed to acquire lock '{name}' after {tries} attempt(s)")]
    AcquireFailed {
        /// Lock name
        name: String,
        /// Attempts made
        tries: u32,
    },

    /// A single lock store failed to answer
    #[error("Lock store error: {0}")]
    Store(String),

    /// Invalid mutex configuration
    #[error("Redlock configuration error: {0}")]
    Config(String),

    /// Caller-supplied deadline elapsed before the lock was acquired
    #[error("Lock timeout")]
    Timeout,
}

impl RedlockError {
    /// Create a new store error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create an acquisition failure for the named lock
    pub fn acquire_failed(name: impl Into<String>, tries: u32) -> Self {
        Self::AcquireFailed {
            name: name.into(),
            tries,
        }
    }

    /// Check if this error means the lock is held elsewhere
    pub fn is_acquire_failed(&self) -> bool {
        matches!(self, Self::AcquireFailed { .. })
    }

    /// Check if this error came from a lock store
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
