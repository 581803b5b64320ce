//! In-memory replicated store for tests and local development.
//!
//! Clones share state, so each clone behaves like a replica with a fully
//! converged view. Delivery mimics the real store's rough edges where it
//! matters to consumers: subscription replay iterates a hash map (no
//! ordering guarantee), and re-putting an existing key fans out again, so
//! subscribers see duplicates exactly as a replica echo would produce them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::store::{ReplicatedStore, StoreRecord, StoreSubscription};

#[derive(Default)]
struct PathState {
    records: HashMap<String, serde_json::Value>,
    subscribers: Vec<mpsc::UnboundedSender<StoreRecord>>,
}

/// Shared-state in-memory store. Cheap to clone (Arc internally).
#[derive(Clone, Default)]
pub struct MemoryStore {
    paths: Arc<Mutex<HashMap<String, PathState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplicatedStore for MemoryStore {
    fn put(&self, path: &str, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let mut paths = self.paths.lock().expect("store state lock");
        let state = paths.entry(path.to_string()).or_default();
        state.records.insert(key.to_string(), value.clone());

        let record = StoreRecord {
            key: key.to_string(),
            value,
        };
        state
            .subscribers
            .retain(|tx| tx.send(record.clone()).is_ok());
        tracing::trace!(path, key, "memory store put");
        Ok(())
    }

    fn subscribe_all(&self, path: &str) -> StoreSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut paths = self.paths.lock().expect("store state lock");
        let state = paths.entry(path.to_string()).or_default();
        for (key, value) in &state.records {
            // Receiver is brand new and unbounded; replay cannot fail.
            let _ = tx.send(StoreRecord {
                key: key.clone(),
                value: value.clone(),
            });
        }
        state.subscribers.push(tx);
        rx
    }
}
