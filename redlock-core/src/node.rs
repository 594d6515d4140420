//! Fixed set of independent lock stores

use crate::config::quorum_for;
use crate::error::RedlockResult;
use crate::stores::LockStore;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Ordered, immutable collection of lock store handles.
///
/// Cloning is cheap; every mutex built by one [`Redsync`](crate::Redsync)
/// shares the same set.
#[derive(Clone)]
pub struct NodeSet {
    nodes: Arc<[Arc<dyn LockStore>]>,
}

impl NodeSet {
    /// Create a node set
    pub fn new(nodes: Vec<Arc<dyn LockStore>>) -> Self {
        Self {
            nodes: nodes.into(),
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the set holds no node
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Majority quorum for this set
    pub fn quorum(&self) -> usize {
        quorum_for(self.len())
    }

    /// Iterate over the node handles in order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn LockStore>> {
        self.nodes.iter()
    }

    /// Run `op` against every node concurrently and count the `true` votes.
    ///
    /// Each call is bounded by `timeout`. Errors and timeouts count as
    /// `false`. Dropping the returned future cancels every call still in
    /// flight.
    pub async fn vote<F, Fut>(&self, timeout: Duration, op: F) -> usize
    where
        F: Fn(Arc<dyn LockStore>) -> Fut,
        Fut: Future<Output = RedlockResult<bool>>,
    {
        let calls = self.nodes.iter().enumerate().map(|(index, node)| {
            let call = op(Arc::clone(node));
            let store_type = node.store_type();
            async move {
                match tokio::time::timeout(timeout, call).await {
                    Ok(Ok(ok)) => ok,
                    Ok(Err(e)) => {
                        debug!(node = index, store = store_type, error = %e, "Lock store call failed");
                        false
                    }
                    Err(_) => {
                        debug!(node = index, store = store_type, timeout = ?timeout, "Lock store call timed out");
                        false
                    }
                }
            }
        });

        join_all(calls).await.into_iter().filter(|ok| *ok).count()
    }
}

impl std::fmt::Debug for NodeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSet")
            .field("len", &self.len())
            .field("quorum", &self.quorum())
            .finish()
    }
}

impl From<Vec<Arc<dyn LockStore>>> for NodeSet {
    fn from(nodes: Vec<Arc<dyn LockStore>>) -> Self {
        Self::new(nodes)
    }
}
