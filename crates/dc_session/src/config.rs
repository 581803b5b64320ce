//! Session configuration.

use std::time::Duration;

use dc_crypto::identity::DEFAULT_KEY_BITS;

/// Knobs for one chat session. `Default` matches production use; tests
/// shrink the timeout and key size.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Store path the key directory lives under.
    pub key_directory_path: String,

    /// Store path this conversation's envelopes live under.
    pub messages_path: String,

    /// Bound on every key-directory read. An eventually-consistent read
    /// must never block past this.
    pub resolve_timeout: Duration,

    /// RSA modulus size for freshly generated identities.
    pub key_bits: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_directory_path: "users/keys".to_string(),
            messages_path: "chat-messages".to_string(),
            resolve_timeout: Duration::from_secs(5),
            key_bits: DEFAULT_KEY_BITS,
        }
    }
}

impl SessionConfig {
    /// Configuration for a named chat room.
    pub fn for_room(room_id: &str) -> Self {
        Self {
            messages_path: format!("chat-rooms/{room_id}/messages"),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_config_scopes_the_messages_path() {
        let config = SessionConfig::for_room("lobby");
        assert_eq!(config.messages_path, "chat-rooms/lobby/messages");
        assert_eq!(config.key_directory_path, "users/keys");
    }
}
