//! dc_crypto — dchat cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Pure transforms over key material and bytes: no network, no storage,
//!   no mutable state.
//! - A message must be proven authentic before it is trusted — decrypted
//!   text is never handed back unless its signature verifies.
//!
//! # Module layout
//! - `codec`    — encrypt+sign / decrypt+verify over message strings
//!                (RSA-OAEP-SHA256 + RSA-PSS-SHA256)
//! - `identity` — per-user RSA key pair, PEM import/export, fingerprints
//! - `keystore` — passphrase-sealed at-rest form of the private key
//!                (Argon2id + XChaCha20-Poly1305)
//! - `error`    — unified error type

pub mod codec;
pub mod error;
pub mod identity;
pub mod keystore;

// Key types cross this crate's API boundary; re-export them so dependents
// never pin a second, possibly mismatched `rsa`.
pub use rsa::{RsaPrivateKey, RsaPublicKey};

pub use codec::{decrypt_and_verify, encrypt_and_sign, max_plaintext_len, SealedMessage};
pub use error::CryptoError;
pub use identity::IdentityKeyPair;
pub use keystore::SealedKey;
