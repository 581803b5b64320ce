//! Message codec — encrypt+sign on the way out, decrypt+verify on the way in.
//!
//! Confidentiality: RSA-OAEP with SHA-256 under the RECEIVER's public key.
//! Authenticity:    RSA-PSS with SHA-256 over the ORIGINAL PLAINTEXT BYTES
//!                  under the SENDER's private key (not over the ciphertext).
//!
//! Both outputs travel base64url-encoded. OAEP and PSS use randomised
//! padding, so two seals of the same plaintext are never byte-identical.
//!
//! `decrypt_and_verify` decrypts first and then verifies; the decrypted
//! text is NEVER returned unless the signature checks out.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::sha2::Sha256;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier as _};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};

use crate::error::CryptoError;

/// SHA-256 digest length in bytes, fixed by the OAEP/PSS parameter choice.
const DIGEST_LEN: usize = 32;

/// Transport-safe encrypted+signed form of one message.
#[derive(Debug, Clone)]
pub struct SealedMessage {
    /// RSA-OAEP ciphertext, base64url.
    pub ciphertext: String,
    /// RSA-PSS signature over the plaintext bytes, base64url.
    pub signature: String,
}

/// Hard ceiling on the plaintext size for `receiver_public`.
///
/// OAEP overhead is `2 * hash_len + 2` bytes of the modulus, so a
/// 2048-bit key carries at most 190 plaintext bytes.
pub fn max_plaintext_len(receiver_public: &RsaPublicKey) -> usize {
    receiver_public.size().saturating_sub(2 * DIGEST_LEN + 2)
}

/// Encrypt `plaintext` for the receiver and sign it as the sender.
///
/// Fails fast with [`CryptoError::MessageTooLarge`] before touching any
/// key material when the plaintext exceeds the OAEP payload ceiling.
/// The empty string is a valid plaintext.
pub fn encrypt_and_sign(
    plaintext: &str,
    receiver_public: &RsaPublicKey,
    sender_private: &RsaPrivateKey,
) -> Result<SealedMessage, CryptoError> {
    let msg = plaintext.as_bytes();
    let max = max_plaintext_len(receiver_public);
    if msg.len() > max {
        return Err(CryptoError::MessageTooLarge { len: msg.len(), max });
    }

    let mut rng = OsRng;
    let ciphertext = receiver_public
        .encrypt(&mut rng, Oaep::new::<Sha256>(), msg)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let signing_key = BlindedSigningKey::<Sha256>::new(sender_private.clone());
    let signature = signing_key.sign_with_rng(&mut rng, msg);

    Ok(SealedMessage {
        ciphertext: URL_SAFE_NO_PAD.encode(&ciphertext),
        signature: URL_SAFE_NO_PAD.encode(signature.to_vec()),
    })
}

/// Decrypt `ciphertext` as the receiver, then verify `signature` against
/// the decrypted bytes with the sender's public key.
///
/// [`CryptoError::DecryptionFailed`] — undecodable or wrong-key ciphertext.
/// [`CryptoError::SignatureInvalid`] — decryption succeeded but the
/// plaintext is not authentic; the plaintext is withheld.
pub fn decrypt_and_verify(
    ciphertext: &str,
    signature: &str,
    receiver_private: &RsaPrivateKey,
    sender_public: &RsaPublicKey,
) -> Result<String, CryptoError> {
    let ct = URL_SAFE_NO_PAD
        .decode(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    let plaintext = receiver_private
        .decrypt(Oaep::new::<Sha256>(), &ct)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let sig_bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| CryptoError::SignatureInvalid)?;
    let sig = Signature::try_from(sig_bytes.as_slice()).map_err(|_| CryptoError::SignatureInvalid)?;
    VerifyingKey::<Sha256>::new(sender_public.clone())
        .verify(&plaintext, &sig)
        .map_err(|_| CryptoError::SignatureInvalid)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}
