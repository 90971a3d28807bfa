//! # Audio Artifact Cipher
//!
//! Authenticated symmetric encryption for audio artifacts while they sit on the
//! scratch storage. Uses AES-256-GCM, so a tampered, truncated or foreign
//! ciphertext is rejected at decrypt time instead of producing garbage audio.
//!
//! ## Artifact Layout:
//! ```text
//! [version: 1 byte][nonce: 12 bytes][ciphertext || tag: N + 16 bytes]
//! ```
//!
//! ## Key Discipline:
//! - The key is read exactly once at startup and handed to [`AudioCipher::from_key_material`]
//! - The same `AudioCipher` value is shared (behind an `Arc`) by every request
//! - Restarting with a different key makes every older artifact undecryptable;
//!   the startup log prints a key fingerprint so operators can spot that case
//!
//! ## Key Material Format:
//! Base64 (URL-safe or standard alphabet, padding optional) of exactly 32 random bytes.
//! This is the same textual shape as a Fernet key, so existing keys can be reused.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Current artifact format version (first byte of every ciphertext)
const FORMAT_VERSION: u8 = 0x01;

/// AES-256-GCM nonce size (96 bits as recommended by NIST)
const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size
const TAG_SIZE: usize = 16;

/// Raw key length for AES-256
const KEY_SIZE: usize = 32;

/// Errors produced by the audio cipher.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Key material is missing, empty or cannot become an AES-256 key. Startup-fatal.
    #[error("invalid encryption key: {0}")]
    Key(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Ciphertext is malformed, truncated, tampered with or from another key.
    #[error("decryption failed: {0}")]
    Decrypt(String),
}

/// Process-lifetime symmetric cipher for audio artifacts.
///
/// ## Thread Safety:
/// `Aes256Gcm` holds only the expanded key and is `Send + Sync`, so one instance
/// can serve unlimited concurrent encrypt/decrypt calls without locking.
#[derive(Clone)]
pub struct AudioCipher {
    cipher: Aes256Gcm,
    fingerprint: String,
}

impl std::fmt::Debug for AudioCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("AudioCipher")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl AudioCipher {
    /// Build the cipher from textual key material.
    ///
    /// ## Errors:
    /// Returns [`CipherError::Key`] when the material is absent, blank,
    /// not base64, or does not decode to exactly 32 bytes.
    pub fn from_key_material(key_material: Option<&str>) -> Result<Self, CipherError> {
        let material = key_material
            .map(str::trim)
            .ok_or_else(|| CipherError::Key("no key material configured".to_string()))?;

        if material.is_empty() {
            return Err(CipherError::Key("key material is empty".to_string()));
        }

        let raw = decode_key(material)?;
        Ok(Self::from_raw_key(&raw))
    }

    fn from_raw_key(raw: &[u8; KEY_SIZE]) -> Self {
        let digest = Sha256::digest(raw);
        let fingerprint = hex::encode(&digest[..8]);

        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(raw)),
            fingerprint,
        }
    }

    /// Short, non-secret identifier of the loaded key (first 8 bytes of SHA-256, hex).
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Encrypt a plaintext payload with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CipherError::Encrypt(e.to_string()))?;

        let mut output = Vec::with_capacity(1 + NONCE_SIZE + sealed.len());
        output.push(FORMAT_VERSION);
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&sealed);
        Ok(output)
    }

    /// Decrypt and authenticate an artifact produced by [`AudioCipher::encrypt`].
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        if ciphertext.len() < 1 + NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::Decrypt(format!(
                "ciphertext too short ({} bytes)",
                ciphertext.len()
            )));
        }

        if ciphertext[0] != FORMAT_VERSION {
            return Err(CipherError::Decrypt(format!(
                "unsupported artifact format version {:#04x}",
                ciphertext[0]
            )));
        }

        let nonce = Nonce::from_slice(&ciphertext[1..1 + NONCE_SIZE]);
        let sealed = &ciphertext[1 + NONCE_SIZE..];

        self.cipher.decrypt(nonce, sealed).map_err(|_| {
            CipherError::Decrypt(
                "authentication failed - data corrupted or encrypted under a different key"
                    .to_string(),
            )
        })
    }
}

/// Generate fresh key material suitable for `AUDIO_ENCRYPTION_KEY`.
pub fn generate_key_material() -> String {
    let mut raw = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut raw);
    general_purpose::URL_SAFE.encode(raw)
}

fn decode_key(material: &str) -> Result<[u8; KEY_SIZE], CipherError> {
    let engines = [
        &general_purpose::URL_SAFE,
        &general_purpose::URL_SAFE_NO_PAD,
        &general_purpose::STANDARD,
        &general_purpose::STANDARD_NO_PAD,
    ];

    let decoded = engines
        .iter()
        .find_map(|engine| engine.decode(material).ok())
        .ok_or_else(|| CipherError::Key("key material is not valid base64".to_string()))?;

    decoded.as_slice().try_into().map_err(|_| {
        CipherError::Key(format!(
            "key must decode to {} bytes, got {}",
            KEY_SIZE,
            decoded.len()
        ))
    })
}
