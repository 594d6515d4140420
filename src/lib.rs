// Redlock - distributed mutual exclusion over independent lock stores
//
// A lock is held only while a quorum of uncoordinated nodes agree, and only
// for a validity window shortened by acquisition time and clock drift.

// Re-export core functionality
pub use redlock_core::*;

// Re-export optional crates
#[cfg(feature = "redis")]
pub use redlock_redis;

#[cfg(feature = "redis")]
pub use redlock_redis::{RedisNodeConfig, RedisNodeError, RedisStore, connect_all};

// Prelude for common imports
pub mod prelude {
    pub use redlock_core::prelude::*;

    #[cfg(feature = "redis")]
    pub use redlock_redis::{RedisNodeConfig, RedisStore, connect_all};
}
