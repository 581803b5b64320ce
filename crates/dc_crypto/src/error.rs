use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Plaintext is {len} bytes; the receiver key accepts at most {max}")]
    MessageTooLarge { len: usize, max: usize },

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed (wrong key or corrupted payload)")]
    DecryptionFailed,

    #[error("Signature verification failed — the message may have been tampered with")]
    SignatureInvalid,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Keystore seal failed: {0}")]
    KeystoreSeal(String),

    #[error("Keystore open failed (wrong passphrase or corrupted keystore)")]
    KeystoreOpen,

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
