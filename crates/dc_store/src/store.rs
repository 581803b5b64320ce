//! Replicated store contract.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::StoreError;

/// One raw value under a path, as a replica delivered it.
///
/// `key` is the store-level key the value was put under; it is NOT the
/// message identity (several store keys may carry copies of one logical
/// message). Consumers derive identity from the value itself.
#[derive(Debug, Clone)]
pub struct StoreRecord {
    pub key: String,
    pub value: serde_json::Value,
}

/// Live stream of records under one path: replays everything already
/// known, then follows new writes. At-least-once, unordered.
pub type StoreSubscription = mpsc::UnboundedReceiver<StoreRecord>;

/// The external replicated graph store, reduced to the two operations the
/// chat core consumes.
pub trait ReplicatedStore: Send + Sync {
    /// Fire-and-forget write of `value` under `path`/`key`, eventually
    /// visible to all subscribers including the writer. A synchronous
    /// failure means the write was never handed to the store.
    fn put(&self, path: &str, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    /// Subscribe to every value ever put under `path`, past and future.
    fn subscribe_all(&self, path: &str) -> StoreSubscription;
}

/// Bounded read against an eventually-consistent path: scan the
/// subscription until `pick` accepts a record, for at most `wait`.
///
/// Any read against the store MUST go through a bounded wait like this
/// one — a value published by a peer may simply not have replicated yet,
/// and an unbounded block on it is a liveness bug.
pub async fn bounded_find<T>(
    store: &dyn ReplicatedStore,
    path: &str,
    wait: Duration,
    mut pick: impl FnMut(&StoreRecord) -> Option<T>,
) -> Result<T, StoreError> {
    let mut subscription = store.subscribe_all(path);
    let scan = async {
        while let Some(record) = subscription.recv().await {
            if let Some(found) = pick(&record) {
                return Ok(found);
            }
        }
        Err(StoreError::SubscriptionClosed)
    };
    match tokio::time::timeout(wait, scan).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            waited_ms: wait.as_millis() as u64,
        }),
    }
}
