//! In-Memory Redlock Example
//!
//! Runs several workers that contend for the same lock over five in-memory
//! nodes, one of which is offline. No Redis required.
//!
//! Run with: RUST_LOG=redlock_core=debug cargo run --example memory_mutex

use redlock::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("\n=== In-Memory Redlock Example ===\n");

    let stores: Vec<Arc<MemoryStore>> = (0..5).map(|_| Arc::new(MemoryStore::new())).collect();
    stores[4].set_online(false);
    println!("Nodes: {} (1 offline)", stores.len());

    let redsync = Redsync::new(
        stores
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn LockStore>)
            .collect(),
    );

    println!("\n1. Workers contending for 'order-processor'...");
    let mut handles = Vec::new();
    for worker in 1..=3 {
        let mutex = redsync
            .mutex("order-processor")
            .expiry(Duration::from_secs(2))
            .retry_delay(Duration::from_millis(50))
            .build()?;

        handles.push(tokio::spawn(async move {
            mutex.lock().await?;
            println!("   worker {} acquired (quorum {})", worker, mutex.quorum());
            tokio::time::sleep(Duration::from_millis(200)).await;
            let released = mutex.unlock().await;
            println!("   worker {} released: {}", worker, released);
            Ok::<_, RedlockError>(())
        }));
    }
    for handle in handles {
        handle.await??;
    }

    println!("\n2. Extending a long-running lease...");
    let mutex = redsync
        .mutex("report-generator")
        .expiry(Duration::from_secs(1))
        .build()?;
    mutex.lock().await?;
    for batch in 1..=3 {
        tokio::time::sleep(Duration::from_millis(600)).await;
        let extended = mutex.extend().await;
        println!("   batch {} done, extended: {}", batch, extended);
    }
    println!("   still held: {}", mutex.is_held().await);
    mutex.unlock().await;

    println!("\n3. Single attempt against a taken lock...");
    let holder = redsync.new_mutex("singleton")?;
    let other = redsync.new_mutex("singleton")?;
    holder.lock().await?;
    println!("   try_lock: {}", other.try_lock().await?);
    holder.unlock().await;
    println!("   try_lock after release: {}", other.try_lock().await?);
    other.unlock().await;

    println!("\n=== Example Complete ===\n");
    Ok(())
}
