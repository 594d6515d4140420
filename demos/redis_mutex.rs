//! Redis Redlock Example
//!
//! Acquires a lock across independent Redis nodes.
//!
//! Note: This example requires Redis to be running
//! Start Redis: docker run -p 6379:6379 redis
//!
//! Nodes are read from `REDLOCK_REDIS_URLS` (comma separated), and the mutex
//! settings from `REDLOCK_EXPIRY_MS`, `REDLOCK_TRIES` and friends.
//!
//! Run with: cargo run --example redis_mutex --features redis

use redlock::prelude::*;
use redlock::{RedisNodeConfig, connect_all};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("\n=== Redis Redlock Example ===\n");

    let mut configs = RedisNodeConfig::nodes_from_env();
    if configs.is_empty() {
        println!("REDLOCK_REDIS_URLS not set, using redis://127.0.0.1:6379");
        configs.push(RedisNodeConfig::new("redis://127.0.0.1:6379"));
    }

    println!("Connecting to {} node(s)...", configs.len());
    let nodes = connect_all(&configs).await?;

    let defaults = MutexConfig::from_env().build();
    let redsync = Redsync::with_defaults(nodes, defaults);
    let mutex = redsync.new_mutex("redlock-demo")?;

    println!("\n1. Acquiring 'redlock-demo' (quorum {})...", mutex.quorum());
    mutex.lock_timeout(Duration::from_secs(10)).await?;
    println!("   Lock acquired, value {:?}", mutex.value().await);

    println!("\n2. Doing critical work...");
    for batch in 1..=3 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        println!("   Processing batch {}...", batch);
    }

    println!("\n3. Extending lease: {}", mutex.extend().await);
    println!("\n4. Releasing lock: {}", mutex.unlock().await);

    println!("\n=== Example Complete ===\n");
    Ok(())
}
