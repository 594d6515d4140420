//! Lease token generation

use crate::error::{RedlockError, RedlockResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::TryRngCore;
use rand::rngs::OsRng;

/// Number of random bytes in a lease token
pub const TOKEN_BYTES: usize = 32;

/// Source of lease tokens
///
/// A token proves ownership of one acquisition attempt, so it must be
/// unguessable and unique for the lifetime of the process.
pub trait TokenGenerator: Send + Sync {
    /// Produce a fresh token
    fn generate(&self) -> RedlockResult<String>;
}

/// Token generator backed by the operating system CSPRNG.
///
/// Tokens are 32 random bytes, standard base64 encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngTokens;

impl TokenGenerator for OsRngTokens {
    fn generate(&self) -> RedlockResult<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| RedlockError::TokenGeneration(e.to_string()))?;
        Ok(STANDARD.encode(bytes))
    }
}

impl<F> TokenGenerator for F
where
    F: Fn() -> RedlockResult<String> + Send + Sync,
{
    fn generate(&self) -> RedlockResult<String> {
        self()
    }
}
