//! Identity key management
//!
//! Each signed-in user owns one RSA key pair for the lifetime of the
//! session: the public half is published to the key directory, the private
//! half never leaves the owning process except through the passphrase
//! keystore (`keystore` module). Re-deriving the pair for the same identity
//! is not supported inside a session — same identity, same keys.

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Default modulus size for freshly generated identities.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// A user's RSA key pair. The private half stays in process memory.
#[derive(Debug, Clone)]
pub struct IdentityKeyPair {
    public: RsaPublicKey,
    private: RsaPrivateKey,
}

impl IdentityKeyPair {
    /// Generate a fresh pair from the OS RNG.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        let mut rng = rand::rngs::OsRng;
        let private =
            RsaPrivateKey::new(&mut rng, bits).map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(Self::from_private(private))
    }

    /// Rebuild the pair from an existing private key.
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self { public, private }
    }

    /// Load a pair from a PKCS#8 private-key PEM.
    pub fn from_private_pem(pem: &str) -> Result<Self, CryptoError> {
        let private =
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self::from_private(private))
    }

    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Public half as PKCS#8 PEM — the wire form of a key record.
    pub fn public_pem(&self) -> Result<String, CryptoError> {
        public_key_to_pem(&self.public)
    }

    /// Private half as PKCS#8 PEM. Zeroized when the returned buffer drops.
    pub fn private_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Human-readable fingerprint of the public key for out-of-band
    /// comparison: SHA-256 of the DER encoding, truncated to 20 bytes,
    /// hex in groups of 4.
    ///
    /// Example: "a1b2 c3d4 e5f6 7890 abcd ef01 2345 6789 0abc def0"
    pub fn fingerprint(&self) -> Result<String, CryptoError> {
        let der = self
            .public
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let digest = Sha256::digest(der.as_bytes());
        let hex = hex::encode(&digest[..20]);
        Ok(hex
            .chars()
            .collect::<Vec<_>>()
            .chunks(4)
            .map(|c| c.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// Parse a peer's published public key from PEM.
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_pem(pem).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Encode a public key as PKCS#8 PEM.
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<String, CryptoError> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))
}
