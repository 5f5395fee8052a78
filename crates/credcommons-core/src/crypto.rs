//! Envelope cipher for credentials at rest.
//!
//! Credential documents are sealed with AES-256-GCM before they reach
//! storage. The storage layer only ever sees `nonce || ciphertext || tag`.
//!
//! # Security model
//!
//! - The envelope key is 32 bytes, provisioned externally and held only in
//!   process memory. It is zeroized on drop and redacted in `Debug`.
//! - Every [`encrypt`] call draws a fresh 96-bit nonce from `OsRng`, so
//!   nonces never repeat across calls or process restarts.
//! - [`decrypt`] either returns the exact plaintext or fails. A failed
//!   authentication never yields partial output.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, KeyError};

/// Nonce length for AES-256-GCM (96 bits).
pub const NONCE_LEN: usize = 12;

/// Authentication tag appended by AES-GCM.
const TAG_LEN: usize = 16;

/// Size of an envelope key in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit envelope key that is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey([u8; KEY_LEN]);

impl EnvelopeKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create a key from a slice, rejecting anything that is not exactly 32 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Length`] for any other size.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| KeyError::Length {
            expected: "32",
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Decode a standard-base64 key as provisioned in `CREDENTIAL_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Encoding`] for invalid base64 and
    /// [`KeyError::Length`] if the decoded key is not 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let mut raw = BASE64
            .decode(encoded.trim())
            .map_err(|e| KeyError::Encoding {
                reason: e.to_string(),
            })?;
        let key = Self::from_slice(&raw);
        raw.zeroize();
        key
    }

    /// Generate a new random key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Encode the key as standard base64 for provisioning.
    ///
    /// The caller must not log the returned string.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Seal `plaintext` under `key` with a fresh random nonce.
///
/// Returns `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
pub fn encrypt(key: &EnvelopeKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = key
        .cipher()
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption {
            reason: e.to_string(),
        })?;

    let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(sealed.len()));
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&sealed);
    Ok(combined)
}

/// Open a ciphertext produced by [`encrypt`].
///
/// # Errors
///
/// - [`CryptoError::CiphertextTooShort`] if the input cannot hold a nonce and tag.
/// - [`CryptoError::Decryption`] if authentication fails (wrong key, corrupted
///   data, or tampering).
pub fn decrypt(key: &EnvelopeKey, combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let minimum = NONCE_LEN + TAG_LEN;
    if combined.len() < minimum {
        return Err(CryptoError::CiphertextTooShort {
            expected: minimum,
            actual: combined.len(),
        });
    }

    let (nonce, sealed) = combined.split_at(NONCE_LEN);
    key.cipher()
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|e| CryptoError::Decryption {
            reason: e.to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_various_sizes() {
        let key = EnvelopeKey::generate();
        for len in [0usize, 1, 15, 16, 17, 1024, 65_537] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let sealed = encrypt(&key, &plaintext).unwrap();
            assert_eq!(sealed.len(), NONCE_LEN + len + TAG_LEN);
            assert_eq!(decrypt(&key, &sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn every_bit_flip_is_detected() {
        let key = EnvelopeKey::generate();
        let sealed = encrypt(&key, b"{\"months_active\":14}").unwrap();
        for byte in 0..sealed.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered[byte] ^= 1 << bit;
                assert!(
                    matches!(
                        decrypt(&key, &tampered),
                        Err(CryptoError::Decryption { .. })
                    ),
                    "flip at byte {byte} bit {bit} was not detected"
                );
            }
        }
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let key = EnvelopeKey::generate();
        let a = encrypt(&key, b"same data").unwrap();
        let b = encrypt(&key, b"same data").unwrap();
        assert_ne!(a, b);
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = encrypt(&EnvelopeKey::generate(), b"secret").unwrap();
        let result = decrypt(&EnvelopeKey::generate(), &sealed);
        assert!(matches!(result, Err(CryptoError::Decryption { .. })));
    }

    #[test]
    fn input_shorter_than_nonce_fails() {
        let key = EnvelopeKey::generate();
        let result = decrypt(&key, &[0u8; 5]);
        assert!(matches!(
            result,
            Err(CryptoError::CiphertextTooShort {
                expected: 28,
                actual: 5
            })
        ));
    }

    #[test]
    fn truncated_tag_fails() {
        let key = EnvelopeKey::generate();
        let sealed = encrypt(&key, b"payload").unwrap();
        let result = decrypt(&key, &sealed[..sealed.len() - 1]);
        assert!(result.is_err());
    }

    #[test]
    fn key_from_slice_rejects_wrong_length() {
        assert!(matches!(
            EnvelopeKey::from_slice(&[0u8; 31]),
            Err(KeyError::Length { actual: 31, .. })
        ));
        assert!(EnvelopeKey::from_slice(&[7u8; 32]).is_ok());
    }

    #[test]
    fn key_base64_roundtrip_opens_same_ciphertext() {
        let key = EnvelopeKey::generate();
        let sealed = encrypt(&key, b"abc").unwrap();
        let restored = EnvelopeKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(decrypt(&restored, &sealed).unwrap(), b"abc");
    }

    #[test]
    fn key_from_bad_base64_fails() {
        assert!(matches!(
            EnvelopeKey::from_base64("not base64 !!"),
            Err(KeyError::Encoding { .. })
        ));
    }

    #[test]
    fn debug_redacts_key() {
        let debug = format!("{:?}", EnvelopeKey::from_bytes([0xAB; 32]));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("171"));
    }
}
