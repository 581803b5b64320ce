//! Identity-provider handoff.
//!
//! Authentication itself is an external collaborator; the core only ever
//! sees the signed-in user it hands over. An identity change is handled by
//! tearing the current [`crate::ChatSession`] down (`sign_out`) and
//! constructing a new one — session construction is the re-subscription
//! trigger.

use serde::{Deserialize, Serialize};

/// The identity the provider vouches for at sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedInUser {
    pub user_id: String,
    pub display_name: String,
}

impl SignedInUser {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}
