//! UI-facing plaintext message.

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// A message that survived decrypt+verify. This type is only constructed
/// from a verified envelope; a record that fails verification is dropped
/// at the feed and never reaches this form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaintextMessage {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    /// Sender-supplied millis, display ordering only.
    pub timestamp: i64,
    pub verified: bool,
}

impl PlaintextMessage {
    /// Promote a verified envelope to its UI form.
    pub fn verified(envelope: &Envelope, text: impl Into<String>) -> Self {
        Self {
            id: envelope.id.clone(),
            sender_id: envelope.sender_id.clone(),
            text: text.into(),
            timestamp: envelope.timestamp,
            verified: true,
        }
    }
}
