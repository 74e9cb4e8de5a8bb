//! Sealed message payloads.
//!
//! Symmetric authenticated encryption with XChaCha20-Poly1305. The AEAD
//! key is derived from the caller's shared key via HKDF-SHA256 with a
//! domain-separation info string. Random 24-byte nonces (XChaCha20
//! extended nonces are safe to generate randomly).
//!
//! Key agreement is out of scope here — callers bring a 32-byte shared
//! key from whatever exchange the host network runs.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::MeritMessageError;

/// HKDF info string for domain separation.
const HKDF_INFO: &[u8] = b"merit-message-seal-xchacha20poly1305-v1";

/// Poly1305 authentication tag length.
const TAG_LEN: usize = 16;

/// An encrypted message body.
///
/// Contains everything needed to open it with the shared key:
/// ciphertext (auth tag included) and the nonce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedContent {
    /// XChaCha20-Poly1305 ciphertext (includes 16-byte auth tag).
    pub ciphertext: Vec<u8>,
    /// 24-byte nonce.
    pub nonce: [u8; 24],
}

impl SealedContent {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MeritMessageError> {
        rmp_serde::to_vec(self).map_err(Into::into)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MeritMessageError> {
        rmp_serde::from_slice(data).map_err(Into::into)
    }
}

/// Derive the AEAD key from the shared key via HKDF-SHA256.
fn derive_key(shared_key: &[u8; 32]) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(None, shared_key);
    let mut key = [0u8; 32];
    hkdf.expand(HKDF_INFO, &mut key)
        .expect("HKDF-SHA256 expand to 32 bytes always succeeds");
    key
}

/// Encrypt `plaintext` under `shared_key`.
pub fn seal(plaintext: &[u8], shared_key: &[u8; 32]) -> Result<SealedContent, MeritMessageError> {
    use chacha20poly1305::aead::rand_core::{OsRng, RngCore};

    let key = derive_key(shared_key);
    let cipher = XChaCha20Poly1305::new(&key.into());

    let mut nonce_bytes = [0u8; 24];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from(nonce_bytes);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| MeritMessageError::Crypto(format!("encryption failed: {e}")))?;

    Ok(SealedContent {
        ciphertext,
        nonce: nonce_bytes,
    })
}

/// Decrypt a `SealedContent` under `shared_key`.
///
/// Fails hard on malformed input: ciphertext shorter than the auth tag
/// is a data-integrity error, not a negative outcome to branch on.
pub fn open(sealed: &SealedContent, shared_key: &[u8; 32]) -> Result<Vec<u8>, MeritMessageError> {
    if sealed.ciphertext.len() < TAG_LEN {
        return Err(MeritMessageError::InvalidCiphertext {
            reason: format!(
                "ciphertext {} bytes, shorter than {TAG_LEN}-byte auth tag",
                sealed.ciphertext.len()
            ),
        });
    }

    let key = derive_key(shared_key);
    let cipher = XChaCha20Poly1305::new(&key.into());

    let nonce = XNonce::from(sealed.nonce);
    cipher
        .decrypt(&nonce, sealed.ciphertext.as_ref())
        .map_err(|_| MeritMessageError::Crypto("decryption failed: authentication error".into()))
}
