//! Key directory — published public keys over the replicated store.
//!
//! A peer's key record may not have replicated yet when we first need it,
//! so `resolve` races a subscription scan against a timeout and reports
//! `KeyNotFound` instead of blocking. Resolutions are cached: an identity
//! keeps one key pair for its session lifetime, so a key that resolved
//! once stays valid.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use dc_crypto::{identity, RsaPublicKey};
use dc_proto::KeyRecord;
use dc_store::{bounded_find, ReplicatedStore, StoreError};

use crate::error::SessionError;

pub struct KeyDirectory {
    store: Arc<dyn ReplicatedStore>,
    path: String,
    resolve_timeout: Duration,
    cache: Mutex<HashMap<String, RsaPublicKey>>,
}

impl KeyDirectory {
    pub fn new(
        store: Arc<dyn ReplicatedStore>,
        path: impl Into<String>,
        resolve_timeout: Duration,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            resolve_timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Publish (or republish) a user's public key. Idempotent: the record
    /// is keyed by user id and the same identity always publishes the
    /// same key within a session.
    pub fn publish(&self, user_id: &str, public_key_pem: &str) -> Result<(), SessionError> {
        let record = KeyRecord::new(user_id, public_key_pem);
        self.store.put(&self.path, user_id, record.to_value()?)?;
        tracing::debug!(user_id, "published key record");
        Ok(())
    }

    /// Resolve a user's public key, waiting at most the configured bound
    /// for the record to replicate.
    pub async fn resolve(&self, user_id: &str) -> Result<RsaPublicKey, SessionError> {
        if let Some(key) = self.cache.lock().await.get(user_id) {
            return Ok(key.clone());
        }

        let found = bounded_find(
            self.store.as_ref(),
            &self.path,
            self.resolve_timeout,
            |record| {
                let parsed = KeyRecord::from_record(&record.value).ok()?;
                if parsed.user_id != user_id {
                    return None;
                }
                match identity::public_key_from_pem(&parsed.public_key) {
                    Ok(key) => Some(key),
                    Err(err) => {
                        // A later correction of the record may still parse.
                        tracing::debug!(user_id, error = %err, "skipping unparseable key record");
                        None
                    }
                }
            },
        )
        .await;

        match found {
            Ok(key) => {
                self.cache
                    .lock()
                    .await
                    .insert(user_id.to_string(), key.clone());
                Ok(key)
            }
            Err(StoreError::Timeout { waited_ms }) => {
                tracing::debug!(user_id, waited_ms, "key resolution timed out");
                Err(SessionError::KeyNotFound {
                    user_id: user_id.to_string(),
                    waited_ms,
                })
            }
            Err(other) => Err(SessionError::Store(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_crypto::IdentityKeyPair;
    use dc_store::MemoryStore;
    use serde_json::json;

    fn directory(store: &MemoryStore, timeout_ms: u64) -> KeyDirectory {
        KeyDirectory::new(
            Arc::new(store.clone()),
            "users/keys",
            Duration::from_millis(timeout_ms),
        )
    }

    #[tokio::test]
    async fn publish_then_resolve() {
        let store = MemoryStore::new();
        let dir = directory(&store, 500);
        let keys = IdentityKeyPair::generate(1024).expect("generate");

        dir.publish("alice", &keys.public_pem().unwrap()).unwrap();
        let resolved = dir.resolve("alice").await.unwrap();
        assert_eq!(&resolved, keys.public());
    }

    #[tokio::test]
    async fn resolve_waits_for_a_late_publish() {
        let store = MemoryStore::new();
        let dir = directory(&store, 1_000);
        let keys = IdentityKeyPair::generate(1024).expect("generate");

        let publisher = directory(&store, 1_000);
        let pem = keys.public_pem().unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            publisher.publish("bob", &pem).unwrap();
        });

        let resolved = dir.resolve("bob").await.unwrap();
        assert_eq!(&resolved, keys.public());
    }

    #[tokio::test]
    async fn resolve_returns_key_not_found_within_the_bound() {
        let store = MemoryStore::new();
        let dir = directory(&store, 150);

        let started = tokio::time::Instant::now();
        let err = dir.resolve("nobody").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::KeyNotFound { ref user_id, waited_ms: 150 } if user_id == "nobody"
        ));
        // Bound plus slack, never an unbounded block.
        assert!(started.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn unparseable_record_is_skipped_until_corrected() {
        let store = MemoryStore::new();
        let dir = directory(&store, 1_000);
        let keys = IdentityKeyPair::generate(1024).expect("generate");

        store
            .put(
                "users/keys",
                "carol",
                json!({ "userId": "carol", "publicKey": "not a pem" }),
            )
            .unwrap();

        let pem = keys.public_pem().unwrap();
        let corrector = directory(&store, 1_000);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            corrector.publish("carol", &pem).unwrap();
        });

        let resolved = dir.resolve("carol").await.unwrap();
        assert_eq!(&resolved, keys.public());
    }

    #[tokio::test]
    async fn resolutions_are_cached_for_the_session() {
        let store = MemoryStore::new();
        let dir = directory(&store, 200);
        let keys = IdentityKeyPair::generate(1024).expect("generate");

        dir.publish("dave", &keys.public_pem().unwrap()).unwrap();
        let first = dir.resolve("dave").await.unwrap();

        // Even if the backing record disappears from view, the session
        // keeps resolving the key it already saw.
        let second = dir.resolve("dave").await.unwrap();
        assert_eq!(first, second);
    }
}
