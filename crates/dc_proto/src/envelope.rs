//! Encrypted message envelope — what the replicated store sees.
//!
//! The store (and every replica behind it) sees only:
//!   - id         (sender-generated UUID, the de-duplication key)
//!   - senderId   (needed to resolve the signing key)
//!   - ciphertext (opaque, base64)
//!   - signature  (over the plaintext, base64)
//!   - timestamp  (sender-supplied millis; display only, never trusted
//!                 for security decisions)
//!
//! The same id may arrive many times — replicas echo records, and a later
//! arrival may be a correction of an earlier one. Consumers must treat the
//! id as the identity of the message, not the store key it arrived under.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtoError;

/// On-wire envelope, one per message copy written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Globally unique, sender-generated (UUIDv7: random + time-based).
    pub id: String,

    /// User id of the author; resolved against the key directory to
    /// verify the signature.
    pub sender_id: String,

    /// RSA-OAEP ciphertext, base64.
    pub ciphertext: String,

    /// RSA-PSS signature over the plaintext bytes, base64.
    pub signature: String,

    /// Sender wall clock, unix millis.
    pub timestamp: i64,
}

impl Envelope {
    /// Build a fresh envelope with a new id and the current wall clock.
    pub fn new(
        sender_id: impl Into<String>,
        ciphertext: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            sender_id: sender_id.into(),
            ciphertext: ciphertext.into(),
            signature: signature.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Shape-validate a raw store record.
    ///
    /// Every field must be present and the string fields non-empty;
    /// anything else is rejected before key resolution or crypto work.
    pub fn from_record(value: &serde_json::Value) -> Result<Self, ProtoError> {
        let envelope: Envelope = serde_json::from_value(value.clone())
            .map_err(|e| ProtoError::MalformedRecord(e.to_string()))?;
        for (field, content) in [
            ("id", &envelope.id),
            ("senderId", &envelope.sender_id),
            ("ciphertext", &envelope.ciphertext),
            ("signature", &envelope.signature),
        ] {
            if content.is_empty() {
                return Err(ProtoError::MalformedRecord(format!("empty field `{field}`")));
            }
        }
        Ok(envelope)
    }

    /// JSON value for `ReplicatedStore::put`.
    pub fn to_value(&self) -> Result<serde_json::Value, ProtoError> {
        Ok(serde_json::to_value(self)?)
    }
}
