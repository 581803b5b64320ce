//! Passphrase keystore — at-rest form of the identity private key.
//!
//! The wrapping key is derived from a USER-SUPPLIED passphrase with
//! Argon2id; the private key (PKCS#8 DER) is sealed with
//! XChaCha20-Poly1305. A key sealed under a public identifier (user id,
//! email) is not accepted anywhere in this crate — the passphrase must be
//! an actual secret.
//!
//! Sealed wire format, both fields base64url:
//!   salt       — 16 random bytes fed to Argon2id (not secret)
//!   ciphertext — [ nonce (24 bytes) | ciphertext + tag ]

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng, Payload},
    XChaCha20Poly1305,
};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::identity::IdentityKeyPair;

const KEYSTORE_AAD: &[u8] = b"dc-keystore-v1";
const NONCE_LEN: usize = 24;
const SALT_LEN: usize = 16;

/// Argon2id parameters — tuned for interactive unlock.
fn argon2_params() -> argon2::Params {
    argon2::Params::new(
        64 * 1024, // m_cost: 64 MiB
        3,         // t_cost: 3 iterations
        1,         // p_cost: 1 thread
        Some(32),
    )
    .expect("Static Argon2 params are always valid")
}

/// A private key sealed under a passphrase, safe to persist locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedKey {
    pub salt: String,
    pub ciphertext: String,
}

fn wrapping_key(passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params(),
    );
    let mut out = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, out.as_mut())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(out)
}

/// Seal `keys`' private half under `passphrase`.
pub fn seal(keys: &IdentityKeyPair, passphrase: &str) -> Result<SealedKey, CryptoError> {
    let der = keys
        .private()
        .to_pkcs8_der()
        .map_err(|e| CryptoError::KeystoreSeal(e.to_string()))?;

    let mut salt = [0u8; SALT_LEN];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut salt);
    let key = wrapping_key(passphrase, &salt)?;

    let cipher = XChaCha20Poly1305::new_from_slice(key.as_ref())
        .map_err(|e| CryptoError::KeystoreSeal(e.to_string()))?;
    let nonce = XChaCha20Poly1305::generate_nonce(&mut AeadOsRng);
    let sealed = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: der.as_bytes(),
                aad: KEYSTORE_AAD,
            },
        )
        .map_err(|e| CryptoError::KeystoreSeal(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);

    Ok(SealedKey {
        salt: URL_SAFE_NO_PAD.encode(salt),
        ciphertext: URL_SAFE_NO_PAD.encode(&out),
    })
}

/// Open a sealed key. Fails with [`CryptoError::KeystoreOpen`] on a wrong
/// passphrase or tampered ciphertext — never returns garbage key material.
pub fn open(sealed: &SealedKey, passphrase: &str) -> Result<IdentityKeyPair, CryptoError> {
    let salt = URL_SAFE_NO_PAD
        .decode(&sealed.salt)
        .map_err(|_| CryptoError::KeystoreOpen)?;
    let data = URL_SAFE_NO_PAD
        .decode(&sealed.ciphertext)
        .map_err(|_| CryptoError::KeystoreOpen)?;
    if salt.len() != SALT_LEN || data.len() < NONCE_LEN {
        return Err(CryptoError::KeystoreOpen);
    }

    let key = wrapping_key(passphrase, &salt)?;
    let cipher =
        XChaCha20Poly1305::new_from_slice(key.as_ref()).map_err(|_| CryptoError::KeystoreOpen)?;

    let (nonce, ct) = data.split_at(NONCE_LEN);
    let der = Zeroizing::new(
        cipher
            .decrypt(
                chacha20poly1305::XNonce::from_slice(nonce),
                Payload {
                    msg: ct,
                    aad: KEYSTORE_AAD,
                },
            )
            .map_err(|_| CryptoError::KeystoreOpen)?,
    );

    let private =
        RsaPrivateKey::from_pkcs8_der(&der).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    Ok(IdentityKeyPair::from_private(private))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let keys = IdentityKeyPair::generate(1024).expect("generate");
        let sealed = seal(&keys, "correct horse battery staple").unwrap();
        let reopened = open(&sealed, "correct horse battery staple").unwrap();
        assert_eq!(reopened.public(), keys.public());
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let keys = IdentityKeyPair::generate(1024).expect("generate");
        let sealed = seal(&keys, "right").unwrap();
        let err = open(&sealed, "wrong").unwrap_err();
        assert!(matches!(err, CryptoError::KeystoreOpen));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let keys = IdentityKeyPair::generate(1024).expect("generate");
        let sealed = seal(&keys, "pass").unwrap();

        let mut raw = URL_SAFE_NO_PAD.decode(&sealed.ciphertext).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = SealedKey {
            salt: sealed.salt.clone(),
            ciphertext: URL_SAFE_NO_PAD.encode(&raw),
        };

        let err = open(&tampered, "pass").unwrap_err();
        assert!(matches!(err, CryptoError::KeystoreOpen));
    }

    #[test]
    fn salts_are_fresh_per_seal() {
        let keys = IdentityKeyPair::generate(1024).expect("generate");
        let a = seal(&keys, "pass").unwrap();
        let b = seal(&keys, "pass").unwrap();
        assert_ne!(a.salt, b.salt);
    }
}
