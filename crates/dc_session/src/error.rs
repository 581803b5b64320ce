use thiserror::Error;

use dc_crypto::CryptoError;
use dc_proto::ProtoError;
use dc_store::StoreError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No public key for {user_id} within {waited_ms} ms")]
    KeyNotFound { user_id: String, waited_ms: u64 },

    #[error("Peer key unavailable for {peer_id} — retry once their key record replicates")]
    PeerKeyUnavailable { peer_id: String },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Protocol error: {0}")]
    Proto(#[from] ProtoError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
