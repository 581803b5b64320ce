//! Chat session — the per-conversation façade.
//!
//! One `ChatSession` per signed-in identity and conversation peer.
//! Construction (`sign_in`) generates the identity key pair, publishes its
//! key record, and subscribes the feed; teardown (`sign_out`, or just
//! dropping the session) ends the subscription and releases the key
//! material. The session owns all of its state — nothing lives in globals.

use std::sync::Arc;

use dc_crypto::{codec, CryptoError, IdentityKeyPair};
use dc_proto::{Envelope, PlaintextMessage};
use dc_store::ReplicatedStore;

use crate::auth::SignedInUser;
use crate::config::SessionConfig;
use crate::directory::KeyDirectory;
use crate::error::SessionError;
use crate::feed::{FeedDiagnostic, MessageFeed};

pub struct ChatSession {
    user: SignedInUser,
    peer_id: String,
    keys: Arc<IdentityKeyPair>,
    store: Arc<dyn ReplicatedStore>,
    directory: Arc<KeyDirectory>,
    messages_path: String,
    feed: MessageFeed,
}

impl ChatSession {
    /// Sign in: generate a fresh identity key pair and start the session.
    pub async fn sign_in(
        store: Arc<dyn ReplicatedStore>,
        user: SignedInUser,
        peer_id: impl Into<String>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let bits = config.key_bits;
        // Keygen is CPU-bound; keep it off the async workers.
        let keys = tokio::task::spawn_blocking(move || IdentityKeyPair::generate(bits))
            .await
            .map_err(|e| SessionError::Crypto(CryptoError::KeyGeneration(e.to_string())))??;
        Self::sign_in_with_keys(store, user, peer_id, keys, config)
    }

    /// Start a session with existing key material (e.g. restored from the
    /// passphrase keystore).
    pub fn sign_in_with_keys(
        store: Arc<dyn ReplicatedStore>,
        user: SignedInUser,
        peer_id: impl Into<String>,
        keys: IdentityKeyPair,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let peer_id = peer_id.into();
        let keys = Arc::new(keys);
        let directory = Arc::new(KeyDirectory::new(
            Arc::clone(&store),
            config.key_directory_path.clone(),
            config.resolve_timeout,
        ));

        // The key record must be readable before any of our messages can
        // verify anywhere, so publish precedes the first send.
        directory.publish(&user.user_id, &keys.public_pem()?)?;

        let feed = MessageFeed::subscribe(
            store.as_ref(),
            Arc::clone(&directory),
            Arc::clone(&keys),
            &config.messages_path,
        );

        tracing::info!(
            user_id = %user.user_id,
            peer_id = %peer_id,
            messages_path = %config.messages_path,
            "chat session started"
        );
        Ok(Self {
            user,
            peer_id,
            keys,
            store,
            directory,
            messages_path: config.messages_path,
            feed,
        })
    }

    /// Encrypt, sign, and write one message. Returns the envelope id.
    ///
    /// Two records go to the store under that id: one sealed for the peer
    /// and one sealed for this identity, so both feeds round-trip the
    /// message through the same verify pipeline. Failures surface to the
    /// caller — `PeerKeyUnavailable` and `Store` errors are retryable;
    /// nothing is retried here.
    pub async fn send(&self, text: &str) -> Result<String, SessionError> {
        let peer_key = match self.directory.resolve(&self.peer_id).await {
            Ok(key) => key,
            Err(SessionError::KeyNotFound { .. }) => {
                return Err(SessionError::PeerKeyUnavailable {
                    peer_id: self.peer_id.clone(),
                })
            }
            Err(other) => return Err(other),
        };

        let to_peer = codec::encrypt_and_sign(text, &peer_key, self.keys.private())?;
        let envelope = Envelope::new(&self.user.user_id, to_peer.ciphertext, to_peer.signature);

        let to_self = codec::encrypt_and_sign(text, self.keys.public(), self.keys.private())?;
        let own_envelope = Envelope {
            ciphertext: to_self.ciphertext,
            signature: to_self.signature,
            ..envelope.clone()
        };

        self.store.put(
            &self.messages_path,
            &format!("{}:peer", envelope.id),
            envelope.to_value()?,
        )?;
        self.store.put(
            &self.messages_path,
            &format!("{}:own", envelope.id),
            own_envelope.to_value()?,
        )?;

        tracing::debug!(envelope_id = %envelope.id, peer_id = %self.peer_id, "message written");
        Ok(envelope.id)
    }

    /// Next verified message for the UI, at most one per envelope id.
    pub async fn next_message(&mut self) -> Option<PlaintextMessage> {
        self.feed.next_message().await
    }

    /// Next feed drop diagnostic (telemetry, not chat content).
    pub async fn next_diagnostic(&mut self) -> Option<FeedDiagnostic> {
        self.feed.next_diagnostic().await
    }

    pub fn user(&self) -> &SignedInUser {
        &self.user
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// This session's key material, e.g. for sealing into the keystore.
    pub fn identity(&self) -> &IdentityKeyPair {
        &self.keys
    }

    /// End the session: the feed subscription stops and key material is
    /// released with the session.
    pub fn sign_out(self) {
        tracing::info!(user_id = %self.user.user_id, "chat session ended");
    }
}
