//! Message feed — the deduplicating decrypt+verify ingestion pipeline.
//!
//! The replicated store hands us every envelope ever written under the
//! conversation path: duplicated, unordered, from multiple untrusted
//! replicas. Each arrival runs the same pipeline regardless of sender
//! (our own envelopes included):
//!
//!   shape-validate → resolve sender key (bounded) → decrypt+verify →
//!   atomic insert-if-absent on the delivered-id set → emit
//!
//! A failure anywhere drops that single arrival with a diagnostic; the
//! subscription itself never dies from a bad record. Arrivals are
//! processed concurrently, so delivery order is completion order — never
//! trust the envelope timestamp for anything but display.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use dc_crypto::{codec, CryptoError, IdentityKeyPair};
use dc_proto::{Envelope, PlaintextMessage};
use dc_store::{ReplicatedStore, StoreRecord};

use crate::directory::KeyDirectory;

/// Why an arrival was dropped. Diagnostics are telemetry, not messages:
/// nothing here ever reaches the UI as chat content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedDiagnostic {
    /// Record failed shape validation before any crypto work.
    MalformedRecord { store_key: String, reason: String },

    /// The sender's key record did not resolve within the bound.
    SenderKeyUnresolved {
        envelope_id: String,
        sender_id: String,
    },

    /// Ciphertext would not decrypt under the local private key. Routine
    /// for message copies sealed for the other participant.
    DecryptionFailed {
        envelope_id: String,
        sender_id: String,
    },

    /// Decryption succeeded but the signature did not verify — a
    /// potential tampering or spoofing event, distinct from the above.
    SignatureRejected {
        envelope_id: String,
        sender_id: String,
    },
}

/// Live subscription over one conversation path. Dropping the feed (or
/// the session owning it) tears the ingestion task down.
pub struct MessageFeed {
    messages: mpsc::UnboundedReceiver<PlaintextMessage>,
    diagnostics: mpsc::UnboundedReceiver<FeedDiagnostic>,
    dispatcher: JoinHandle<()>,
}

impl MessageFeed {
    /// Subscribe to `path` and start delivering verified plaintext.
    pub fn subscribe(
        store: &dyn ReplicatedStore,
        directory: Arc<KeyDirectory>,
        keys: Arc<IdentityKeyPair>,
        path: &str,
    ) -> Self {
        let mut subscription = store.subscribe_all(path);
        let (messages_tx, messages) = mpsc::unbounded_channel();
        let (diagnostics_tx, diagnostics) = mpsc::unbounded_channel();

        let worker = Arc::new(FeedWorker {
            directory,
            keys,
            delivered: Mutex::new(HashSet::new()),
            messages: messages_tx,
            diagnostics: diagnostics_tx,
        });

        let path = path.to_string();
        let dispatcher = tokio::spawn(async move {
            while let Some(record) = subscription.recv().await {
                let worker = Arc::clone(&worker);
                tokio::spawn(async move { worker.process(record).await });
            }
            tracing::info!(path, "message feed closed");
        });

        Self {
            messages,
            diagnostics,
            dispatcher,
        }
    }

    /// Next verified message, in delivery order. `None` once the feed is
    /// closed and drained.
    pub async fn next_message(&mut self) -> Option<PlaintextMessage> {
        self.messages.recv().await
    }

    /// Next drop diagnostic.
    pub async fn next_diagnostic(&mut self) -> Option<FeedDiagnostic> {
        self.diagnostics.recv().await
    }
}

impl Drop for MessageFeed {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

struct FeedWorker {
    directory: Arc<KeyDirectory>,
    keys: Arc<IdentityKeyPair>,
    delivered: Mutex<HashSet<String>>,
    messages: mpsc::UnboundedSender<PlaintextMessage>,
    diagnostics: mpsc::UnboundedSender<FeedDiagnostic>,
}

impl FeedWorker {
    async fn process(&self, record: StoreRecord) {
        let envelope = match Envelope::from_record(&record.value) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::debug!(store_key = %record.key, error = %err, "dropping malformed record");
                let _ = self.diagnostics.send(FeedDiagnostic::MalformedRecord {
                    store_key: record.key,
                    reason: err.to_string(),
                });
                return;
            }
        };

        // Cheap pre-check to skip replica echoes of delivered ids; the
        // authoritative test-and-set happens after verification.
        if self.delivered.lock().await.contains(&envelope.id) {
            return;
        }

        let sender_key = match self.directory.resolve(&envelope.sender_id).await {
            Ok(key) => key,
            Err(err) => {
                tracing::debug!(
                    envelope_id = %envelope.id,
                    sender_id = %envelope.sender_id,
                    error = %err,
                    "sender key did not resolve"
                );
                let _ = self.diagnostics.send(FeedDiagnostic::SenderKeyUnresolved {
                    envelope_id: envelope.id,
                    sender_id: envelope.sender_id,
                });
                return;
            }
        };

        let text = match codec::decrypt_and_verify(
            &envelope.ciphertext,
            &envelope.signature,
            self.keys.private(),
            &sender_key,
        ) {
            Ok(text) => text,
            Err(CryptoError::SignatureInvalid) => {
                tracing::warn!(
                    envelope_id = %envelope.id,
                    sender_id = %envelope.sender_id,
                    "signature rejected — dropping unauthenticated message"
                );
                let _ = self.diagnostics.send(FeedDiagnostic::SignatureRejected {
                    envelope_id: envelope.id,
                    sender_id: envelope.sender_id,
                });
                return;
            }
            Err(err) => {
                tracing::debug!(
                    envelope_id = %envelope.id,
                    sender_id = %envelope.sender_id,
                    error = %err,
                    "dropping undecryptable record"
                );
                let _ = self.diagnostics.send(FeedDiagnostic::DecryptionFailed {
                    envelope_id: envelope.id,
                    sender_id: envelope.sender_id,
                });
                return;
            }
        };

        // Atomic insert-if-absent: of two concurrent arrivals carrying
        // the same id, exactly one reaches the emit below.
        if !self.delivered.lock().await.insert(envelope.id.clone()) {
            return;
        }
        let _ = self
            .messages
            .send(PlaintextMessage::verified(&envelope, text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_store::MemoryStore;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    const MESSAGES: &str = "room/messages";
    const KEYS: &str = "users/keys";

    struct Rig {
        store: MemoryStore,
        feed: MessageFeed,
        local: IdentityKeyPair,
    }

    /// Feed rig for a local identity "me" with its key published.
    fn rig() -> Rig {
        let store = MemoryStore::new();
        let local = IdentityKeyPair::generate(1024).expect("generate");
        let directory = Arc::new(KeyDirectory::new(
            Arc::new(store.clone()),
            KEYS,
            Duration::from_millis(200),
        ));
        directory
            .publish("me", &local.public_pem().unwrap())
            .unwrap();
        let feed = MessageFeed::subscribe(
            &store,
            directory,
            Arc::new(local.clone()),
            MESSAGES,
        );
        Rig { store, feed, local }
    }

    fn publish_key(store: &MemoryStore, user_id: &str, keys: &IdentityKeyPair) {
        store
            .put(
                KEYS,
                user_id,
                dc_proto::KeyRecord::new(user_id, keys.public_pem().unwrap())
                    .to_value()
                    .unwrap(),
            )
            .unwrap();
    }

    /// Envelope from `sender_id` sealed for the rig's local identity.
    fn envelope_for_local(rig: &Rig, sender_id: &str, sender: &IdentityKeyPair, text: &str) -> Envelope {
        let sealed = codec::encrypt_and_sign(text, rig.local.public(), sender.private()).unwrap();
        Envelope::new(sender_id, sealed.ciphertext, sealed.signature)
    }

    async fn expect_no_message(feed: &mut MessageFeed) {
        assert!(
            timeout(Duration::from_millis(300), feed.next_message())
                .await
                .is_err(),
            "no further message expected"
        );
    }

    #[tokio::test]
    async fn delivers_a_verified_message() {
        let mut rig = rig();
        let alice = IdentityKeyPair::generate(1024).expect("generate");
        publish_key(&rig.store, "alice", &alice);

        let envelope = envelope_for_local(&rig, "alice", &alice, "hi");
        rig.store
            .put(MESSAGES, &envelope.id, envelope.to_value().unwrap())
            .unwrap();

        let message = timeout(Duration::from_secs(2), rig.feed.next_message())
            .await
            .expect("delivery")
            .expect("open feed");
        assert_eq!(message.sender_id, "alice");
        assert_eq!(message.text, "hi");
        assert!(message.verified);
    }

    #[tokio::test]
    async fn duplicate_arrivals_deliver_once() {
        let mut rig = rig();
        let alice = IdentityKeyPair::generate(1024).expect("generate");
        publish_key(&rig.store, "alice", &alice);

        let envelope = envelope_for_local(&rig, "alice", &alice, "once");
        let value = envelope.to_value().unwrap();
        rig.store.put(MESSAGES, &envelope.id, value.clone()).unwrap();
        rig.store.put(MESSAGES, &envelope.id, value.clone()).unwrap();
        rig.store.put(MESSAGES, &envelope.id, value).unwrap();

        let message = timeout(Duration::from_secs(2), rig.feed.next_message())
            .await
            .expect("delivery")
            .expect("open feed");
        assert_eq!(message.text, "once");
        expect_no_message(&mut rig.feed).await;
    }

    #[tokio::test]
    async fn malformed_record_raises_a_diagnostic_and_feed_continues() {
        let mut rig = rig();
        rig.store
            .put(MESSAGES, "junk", json!({ "id": "x" }))
            .unwrap();

        let diagnostic = timeout(Duration::from_secs(2), rig.feed.next_diagnostic())
            .await
            .expect("diagnostic")
            .expect("open feed");
        assert!(matches!(
            diagnostic,
            FeedDiagnostic::MalformedRecord { ref store_key, .. } if store_key == "junk"
        ));

        // A good record afterwards still delivers.
        let alice = IdentityKeyPair::generate(1024).expect("generate");
        publish_key(&rig.store, "alice", &alice);
        let envelope = envelope_for_local(&rig, "alice", &alice, "still alive");
        rig.store
            .put(MESSAGES, &envelope.id, envelope.to_value().unwrap())
            .unwrap();
        let message = timeout(Duration::from_secs(2), rig.feed.next_message())
            .await
            .expect("delivery")
            .expect("open feed");
        assert_eq!(message.text, "still alive");
    }

    #[tokio::test]
    async fn unknown_sender_raises_key_unresolved() {
        let mut rig = rig();
        let ghost = IdentityKeyPair::generate(1024).expect("generate");

        let envelope = envelope_for_local(&rig, "ghost", &ghost, "boo");
        rig.store
            .put(MESSAGES, &envelope.id, envelope.to_value().unwrap())
            .unwrap();

        let diagnostic = timeout(Duration::from_secs(2), rig.feed.next_diagnostic())
            .await
            .expect("diagnostic")
            .expect("open feed");
        assert!(matches!(
            diagnostic,
            FeedDiagnostic::SenderKeyUnresolved { ref sender_id, .. } if sender_id == "ghost"
        ));
        expect_no_message(&mut rig.feed).await;
    }

    #[tokio::test]
    async fn copy_sealed_for_someone_else_drops_as_decryption_failure() {
        let mut rig = rig();
        let alice = IdentityKeyPair::generate(1024).expect("generate");
        let other = IdentityKeyPair::generate(1024).expect("generate");
        publish_key(&rig.store, "alice", &alice);

        let sealed = codec::encrypt_and_sign("not for me", other.public(), alice.private()).unwrap();
        let envelope = Envelope::new("alice", sealed.ciphertext, sealed.signature);
        rig.store
            .put(MESSAGES, &envelope.id, envelope.to_value().unwrap())
            .unwrap();

        let diagnostic = timeout(Duration::from_secs(2), rig.feed.next_diagnostic())
            .await
            .expect("diagnostic")
            .expect("open feed");
        assert!(matches!(diagnostic, FeedDiagnostic::DecryptionFailed { .. }));
        expect_no_message(&mut rig.feed).await;
    }

    #[tokio::test]
    async fn forged_signature_raises_the_security_diagnostic() {
        let mut rig = rig();
        let alice = IdentityKeyPair::generate(1024).expect("generate");
        let impostor = IdentityKeyPair::generate(1024).expect("generate");
        publish_key(&rig.store, "alice", &alice);

        // Sealed for us, but signed by someone other than the claimed sender.
        let sealed =
            codec::encrypt_and_sign("spoofed", rig.local.public(), impostor.private()).unwrap();
        let envelope = Envelope::new("alice", sealed.ciphertext, sealed.signature);
        rig.store
            .put(MESSAGES, &envelope.id, envelope.to_value().unwrap())
            .unwrap();

        let diagnostic = timeout(Duration::from_secs(2), rig.feed.next_diagnostic())
            .await
            .expect("diagnostic")
            .expect("open feed");
        assert!(matches!(
            diagnostic,
            FeedDiagnostic::SignatureRejected { ref sender_id, .. } if sender_id == "alice"
        ));
        expect_no_message(&mut rig.feed).await;
    }

    #[tokio::test]
    async fn own_envelope_roundtrips_with_own_keys() {
        let mut rig = rig();

        // Local identity as both sender and receiver context.
        let sealed =
            codec::encrypt_and_sign("note to self", rig.local.public(), rig.local.private()).unwrap();
        let envelope = Envelope::new("me", sealed.ciphertext, sealed.signature);
        rig.store
            .put(MESSAGES, &envelope.id, envelope.to_value().unwrap())
            .unwrap();

        let message = timeout(Duration::from_secs(2), rig.feed.next_message())
            .await
            .expect("delivery")
            .expect("open feed");
        assert_eq!(message.sender_id, "me");
        assert_eq!(message.text, "note to self");
    }
}
