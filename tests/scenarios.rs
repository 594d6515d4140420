//! Integration tests for common Redlock workflows.
//!
//! All nodes are in-memory lock stores, so these run without Redis.

use redlock::prelude::*;
use redlock::{NodeSet, TokenGenerator};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

fn stores(n: usize) -> Vec<Arc<MemoryStore>> {
    (0..n).map(|_| Arc::new(MemoryStore::new())).collect()
}

fn redsync(stores: &[Arc<MemoryStore>]) -> Redsync {
    Redsync::new(
        stores
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn LockStore>)
            .collect(),
    )
}

fn holders(stores: &[Arc<MemoryStore>], name: &str, token: &str) -> usize {
    stores
        .iter()
        .filter(|s| s.get(name).as_deref() == Some(token))
        .count()
}

/// Plant a foreign lease on every node whose bit is set; returns the number
/// of nodes left free.
fn clog(stores: &[Arc<MemoryStore>], mask: u32, name: &str) -> usize {
    let mut free = 0;
    for (i, store) in stores.iter().enumerate() {
        if mask & (1 << i) == 0 {
            free += 1;
        } else {
            store.set_raw(name, "foobar", None);
        }
    }
    free
}

// =============================================================================
// Mutual exclusion
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_mutexes_take_turns() {
    let stores = stores(8);
    let redsync = redsync(&stores);
    let active = Arc::new(AtomicUsize::new(0));
    let (order_tx, mut order_rx) = tokio::sync::mpsc::unbounded_channel();

    let mut handles = Vec::new();
    for i in 0..8 {
        let mutex = redsync
            .mutex("test-mutex")
            .tries(32)
            .retry_delay(Duration::from_millis(500))
            .build()
            .unwrap();
        let stores = stores.clone();
        let active = Arc::clone(&active);
        let order_tx = order_tx.clone();

        handles.push(tokio::spawn(async move {
            mutex.lock().await.unwrap();
            assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0, "two holders at once");

            let token = mutex.value().await.unwrap();
            assert!(holders(&stores, mutex.name(), &token) >= mutex.quorum());
            tokio::time::sleep(Duration::from_millis(100)).await;

            active.fetch_sub(1, Ordering::SeqCst);
            assert!(mutex.unlock().await);
            order_tx.send(i).unwrap();
        }));
    }
    drop(order_tx);

    for handle in handles {
        handle.await.unwrap();
    }

    let mut order = Vec::new();
    while let Some(i) = order_rx.recv().await {
        order.push(i);
    }
    order.sort_unstable();
    assert_eq!(order, (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_at_most_one_valid_holder() {
    let stores = stores(5);
    let redsync = redsync(&stores);
    let first = redsync.mutex("shared").tries(1).build().unwrap();
    let second = redsync.mutex("shared").tries(1).build().unwrap();

    assert_ok!(first.lock().await);
    assert!(second.lock().await.unwrap_err().is_acquire_failed());
    assert!(first.is_held().await);
    assert!(!second.is_held().await);

    first.unlock().await;
    assert_ok!(second.lock().await);
    assert!(!first.is_held().await);
    assert!(second.is_held().await);
}

#[tokio::test]
async fn test_different_names_are_independent() {
    let stores = stores(3);
    let redsync = redsync(&stores);
    let orders = redsync.new_mutex("orders").unwrap();
    let invoices = redsync.new_mutex("invoices").unwrap();

    assert_ok!(orders.lock().await);
    assert_ok!(invoices.lock().await);

    assert!(orders.is_held().await);
    assert!(invoices.is_held().await);
}

// =============================================================================
// Quorum
// =============================================================================

#[tokio::test]
async fn test_quorum_with_clogged_nodes() {
    let stores = stores(4);
    let redsync = redsync(&stores);

    // Two of four taken: only 2 free < quorum 3
    let mutex = redsync.mutex("partial-2").tries(1).build().unwrap();
    assert_eq!(mutex.quorum(), 3);
    clog(&stores, 0b0011, "partial-2");
    let err = assert_err!(mutex.lock().await);
    assert!(err.is_acquire_failed());

    // One of four taken: 3 free >= quorum 3
    let mutex = redsync.mutex("partial-1").tries(1).build().unwrap();
    clog(&stores, 0b0100, "partial-1");
    mutex.lock().await.unwrap();
    let token = mutex.value().await.unwrap();
    assert_eq!(holders(&stores, "partial-1", &token), 3);
}

#[tokio::test]
async fn test_quorum_every_mask() {
    let stores = stores(4);
    let redsync = redsync(&stores);

    for mask in 0u32..(1 << stores.len()) {
        let name = format!("test-mutex-partial-{}", mask);
        let mutex = redsync.mutex(&name).tries(1).build().unwrap();
        let free = clog(&stores, mask, &name);

        if free >= mutex.quorum() {
            mutex.lock().await.unwrap();
            let token = mutex.value().await.unwrap();
            assert!(holders(&stores, &name, &token) >= mutex.quorum());
        } else {
            let err = mutex.lock().await.unwrap_err();
            assert!(err.is_acquire_failed(), "mask {:04b}: {}", mask, err);
            // Nothing of ours left behind
            for store in &stores {
                assert!(matches!(store.get(&name).as_deref(), None | Some("foobar")));
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_majority_exhausts_tries() {
    let stores = stores(5);
    for store in &stores[..3] {
        store.set_online(false);
    }
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let tokens = move || -> RedlockResult<String> {
        counter.fetch_add(1, Ordering::SeqCst);
        redlock::OsRngTokens.generate()
    };

    let mutex = redsync(&stores)
        .mutex("unavailable")
        .tries(4)
        .retry_delay(Duration::from_millis(500))
        .token_generator(Arc::new(tokens))
        .build()
        .unwrap();

    let start = Instant::now();
    let err = assert_err!(mutex.lock().await);

    assert!(matches!(err, RedlockError::AcquireFailed { tries: 4, .. }));
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    // Three sleeps between four attempts
    assert!(start.elapsed() >= Duration::from_millis(1_500));
    for store in &stores[3..] {
        assert_eq!(store.get("unavailable"), None);
    }
}

#[tokio::test(start_paused = true)]
async fn test_unresponsive_node_does_not_stall_quorum() {
    let stores = vec![
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new().with_latency(Duration::from_secs(3600))),
    ];
    let mutex = redsync(&stores)
        .mutex("slow")
        .expiry(Duration::from_secs(10))
        .node_timeout(Duration::from_millis(50))
        .tries(1)
        .build()
        .unwrap();

    let start = Instant::now();
    mutex.lock().await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    let until = mutex.valid_until().await.unwrap();
    // Measured from the attempt start: 10s - 100ms drift - 2ms margin
    assert_eq!(until - start, Duration::from_millis(9_898));
}

// =============================================================================
// Release and extend
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_unlock_after_expiry_is_false() {
    let stores = stores(3);
    let mutex = redsync(&stores)
        .mutex("expiring")
        .expiry(Duration::from_millis(500))
        .tries(1)
        .build()
        .unwrap();

    mutex.lock().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(!mutex.unlock().await);

    // Reusable afterwards
    mutex.lock().await.unwrap();
    assert!(mutex.unlock().await);
}

#[tokio::test]
async fn test_unlock_does_not_touch_foreign_lease() {
    let stores = stores(3);
    let mutex = redsync(&stores).mutex("foreign").tries(1).build().unwrap();

    mutex.lock().await.unwrap();
    // Lease lost on every node and taken over by someone else
    for store in &stores {
        store.set_raw("foreign", "someone-else", None);
    }

    assert!(!mutex.unlock().await);
    for store in &stores {
        assert_eq!(store.get("foreign"), Some("someone-else".to_string()));
    }
}

#[tokio::test(start_paused = true)]
async fn test_extend_after_half_expiry() {
    let stores = stores(5);
    let expiry = Duration::from_secs(8);
    let mutex = redsync(&stores)
        .mutex("extended")
        .expiry(expiry)
        .tries(1)
        .build()
        .unwrap();

    mutex.lock().await.unwrap();
    let after_lock: Vec<_> = stores.iter().map(|s| s.pttl("extended").unwrap()).collect();

    tokio::time::sleep(expiry / 2).await;
    let before_extend: Vec<_> = stores.iter().map(|s| s.pttl("extended").unwrap()).collect();

    assert!(mutex.extend().await);
    let after_extend: Vec<_> = stores.iter().map(|s| s.pttl("extended").unwrap()).collect();

    for i in 0..stores.len() {
        assert!(after_extend[i] > before_extend[i]);
        assert!(after_extend[i] >= after_lock[i]);
    }

    // The lease now outlives the original expiry
    tokio::time::sleep(expiry * 3 / 4).await;
    assert!(mutex.is_held().await);
    assert!(mutex.unlock().await);
}

#[tokio::test(start_paused = true)]
async fn test_extend_after_expiry_fails() {
    let stores = stores(3);
    let mutex = redsync(&stores)
        .mutex("lost")
        .expiry(Duration::from_millis(200))
        .tries(1)
        .build()
        .unwrap();

    mutex.lock().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!mutex.extend().await);
    assert!(!mutex.is_held().await);
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_direct_construction() {
    let stores = stores(3);
    let nodes = NodeSet::new(
        stores
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn LockStore>)
            .collect(),
    );

    let mutex = Mutex::new("direct", nodes, MutexConfig::default()).unwrap();
    assert_eq!(mutex.quorum(), 2);
    assert_eq!(mutex.name(), "direct");
}

#[test]
fn test_config_from_env_defaults() {
    // No REDLOCK_* variables are set in the test environment
    let config = MutexConfig::from_env().build();
    assert!(config.validate(1).is_ok());
}
