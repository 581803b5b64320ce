//! Published public key for one identity.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Key-directory record. One per identity, keyed by user id; republishing
/// overwrites, which is safe because the same identity always publishes
/// the same key for the lifetime of its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    pub user_id: String,

    /// PKCS#8 PEM.
    pub public_key: String,
}

impl KeyRecord {
    pub fn new(user_id: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            public_key: public_key.into(),
        }
    }

    /// Shape-validate a raw store record.
    pub fn from_record(value: &serde_json::Value) -> Result<Self, ProtoError> {
        let record: KeyRecord = serde_json::from_value(value.clone())
            .map_err(|e| ProtoError::MalformedRecord(e.to_string()))?;
        if record.user_id.is_empty() || record.public_key.is_empty() {
            return Err(ProtoError::MalformedRecord(
                "key record with empty field".into(),
            ));
        }
        Ok(record)
    }

    /// JSON value for `ReplicatedStore::put`.
    pub fn to_value(&self) -> Result<serde_json::Value, ProtoError> {
        Ok(serde_json::to_value(self)?)
    }
}
