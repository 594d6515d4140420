//! Redis node error types.

use redlock_core::RedlockError;
use thiserror::Error;

/// Result type for Redis node setup.
pub type Result<T> = std::result::Result<T, RedisNodeError>;

/// Redis node errors.
#[derive(Debug, Error)]
pub enum RedisNodeError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout error.
    #[error("Operation timed out")]
    Timeout,

    /// Underlying Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<RedisNodeError> for RedlockError {
    fn from(err: RedisNodeError) -> Self {
        RedlockError::store(err.to_string())
    }
}
