//! Presentation signer.
//!
//! Turns a decrypted credential into a compact JWT-shaped token:
//!
//! ```text
//! b64url({"alg":"EdDSA","typ":"JWT"}) . b64url({"iss":…,"vc":…}) . b64url(sig)
//! ```
//!
//! All segments are base64url without padding. The signature is Ed25519
//! over the ASCII bytes of the first two segments joined by `.`. Ed25519 is
//! deterministic, so the same key and payload always produce the same token.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{KeyError, SignError, VerifyError};

/// JOSE algorithm identifier for Ed25519.
pub const ALGORITHM: &str = "EdDSA";

/// Token type written into every header.
pub const TOKEN_TYPE: &str = "JWT";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a presentation token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationClaims {
    /// Issuer identity (DID-like).
    pub iss: String,
    /// The credential document.
    pub vc: serde_json::Value,
}

/// The issuer's Ed25519 signing key.
///
/// Does not implement `Serialize`; `Debug` shows only the public half.
pub struct IssuerKey {
    signing_key: SigningKey,
}

impl IssuerKey {
    /// Generate a new random key pair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Build a key from its 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Build a key from raw bytes: either a 32-byte seed or a 64-byte
    /// `seed || public` keypair whose halves must agree.
    ///
    /// # Errors
    ///
    /// - [`KeyError::Length`] for any other size.
    /// - [`KeyError::KeypairMismatch`] if the public half does not match.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        match bytes.len() {
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(bytes);
                let key = Self::from_seed(&seed);
                seed.zeroize();
                Ok(key)
            }
            64 => {
                let mut pair = [0u8; 64];
                pair.copy_from_slice(bytes);
                let result = SigningKey::from_keypair_bytes(&pair);
                pair.zeroize();
                result
                    .map(|signing_key| Self { signing_key })
                    .map_err(|_| KeyError::KeypairMismatch)
            }
            actual => Err(KeyError::Length {
                expected: "32 or 64",
                actual,
            }),
        }
    }

    /// Decode a standard-base64 key as provisioned in `ED25519_PRIVATE_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Encoding`] for invalid base64, otherwise the
    /// errors of [`IssuerKey::from_slice`].
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

    /// Encode as a 64-byte `seed || public` keypair in standard base64.
    ///
    /// The caller must not log the returned string.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.signing_key.to_keypair_bytes())
    }

    /// The public verification key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The public key in standard base64.
    #[must_use]
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.verifying_key().as_bytes())
    }
}

impl fmt::Debug for IssuerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerKey")
            .field("public", &hex::encode(self.verifying_key().as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Decode a standard-base64 Ed25519 public key.
///
/// # Errors
///
/// - [`KeyError::Encoding`] for invalid base64.
/// - [`KeyError::Length`] if the key is not 32 bytes.
/// - [`KeyError::InvalidPublicKey`] if the bytes are not a valid curve point.
pub fn verifying_key_from_base64(encoded: &str) -> Result<VerifyingKey, KeyError> {
    let raw = BASE64
        .decode(encoded.trim())
        .map_err(|e| KeyError::Encoding {
            reason: e.to_string(),
        })?;
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| KeyError::Length {
        expected: "32",
        actual: raw.len(),
    })?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign `payload` as the `vc` claim of a presentation issued by `issuer`.
///
/// # Errors
///
/// Returns [`SignError::Serialization`] if the header or claims cannot be
/// serialized to JSON.
pub fn sign<T: Serialize>(issuer: &str, key: &IssuerKey, payload: &T) -> Result<String, SignError> {
    let header = Header {
        alg: ALGORITHM.to_owned(),
        typ: TOKEN_TYPE.to_owned(),
    };
    let vc = serde_json::to_value(payload).map_err(|e| SignError::Serialization {
        reason: format!("payload: {e}"),
    })?;
    let claims = PresentationClaims {
        iss: issuer.to_owned(),
        vc,
    };

    let header_json = serde_json::to_vec(&header).map_err(|e| SignError::Serialization {
        reason: format!("header: {e}"),
    })?;
    let claims_json = serde_json::to_vec(&claims).map_err(|e| SignError::Serialization {
        reason: format!("claims: {e}"),
    })?;

    let unsigned = format!(
        "{}.{}",
        BASE64_URL.encode(header_json),
        BASE64_URL.encode(claims_json)
    );
    let signature = key.signing_key.sign(unsigned.as_bytes());
    Ok(format!(
        "{unsigned}.{}",
        BASE64_URL.encode(signature.to_bytes())
    ))
}

/// Verify a presentation token and return its claims.
///
/// # Errors
///
/// - [`VerifyError::Malformed`] if the token is not three decodable segments.
/// - [`VerifyError::UnsupportedAlgorithm`] if the header is not `EdDSA`.
/// - [`VerifyError::BadSignature`] if the signature does not verify.
pub fn verify(token: &str, public_key: &VerifyingKey) -> Result<PresentationClaims, VerifyError> {
    let mut segments = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(VerifyError::Malformed {
            reason: "expected three dot-separated segments".to_owned(),
        });
    };

    let header: Header = decode_json(header_b64, "header")?;
    if header.alg != ALGORITHM {
        return Err(VerifyError::UnsupportedAlgorithm { alg: header.alg });
    }

    let sig_bytes = decode_segment(sig_b64, "signature")?;
    let signature = Signature::from_slice(&sig_bytes).map_err(|e| VerifyError::Malformed {
        reason: format!("signature: {e}"),
    })?;

    // header_b64 and claims_b64 are adjacent in `token`.
    let signed_len = header_b64.len() + 1 + claims_b64.len();
    public_key
        .verify(&token.as_bytes()[..signed_len], &signature)
        .map_err(|_| VerifyError::BadSignature)?;

    decode_json(claims_b64, "claims")
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, VerifyError> {
    BASE64_URL
        .decode(segment)
        .map_err(|e| VerifyError::Malformed {
            reason: format!("{what}: {e}"),
        })
}

fn decode_json<T: serde::de::DeserializeOwned>(segment: &str, what: &str) -> Result<T, VerifyError> {
    let bytes = decode_segment(segment, what)?;
    serde_json::from_slice(&bytes).map_err(|e| VerifyError::Malformed {
        reason: format!("{what}: {e}"),
    })
}

/// Signs presentations as the service issuer.
#[derive(Debug)]
pub struct PresentationSigner {
    issuer: String,
    key: IssuerKey,
}

impl PresentationSigner {
    /// Create a signer for `issuer` using `key`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, key: IssuerKey) -> Self {
        Self {
            issuer: issuer.into(),
            key,
        }
    }

    /// The issuer identity written into `iss`.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The public key presentations verify against.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// The public key in standard base64, for publishing to verifiers.
    #[must_use]
    pub fn public_key_base64(&self) -> String {
        self.key.public_key_base64()
    }

    /// Sign a credential payload.
    ///
    /// # Errors
    ///
    /// See [`sign`].
    pub fn sign<T: Serialize>(&self, payload: &T) -> Result<String, SignError> {
        sign(&self.issuer, &self.key, payload)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    const ISSUER: &str = "did:jk:credit-commons";

    fn signer() -> PresentationSigner {
        PresentationSigner::new(ISSUER, IssuerKey::from_seed(&[0x42; 32]))
    }

    fn segment_json(token: &str, index: usize) -> serde_json::Value {
        let segment = token.split('.').nth(index).unwrap();
        serde_json::from_slice(&BASE64_URL.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn token_has_three_unpadded_segments() {
        let token = signer().sign(&json!({"a": 1})).unwrap();
        let segments: Vec<_> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| !s.is_empty() && !s.contains('=')));
    }

    #[test]
    fn header_declares_eddsa_jwt() {
        let token = signer().sign(&json!({})).unwrap();
        assert_eq!(segment_json(&token, 0), json!({"alg": "EdDSA", "typ": "JWT"}));
    }

    #[test]
    fn claims_carry_issuer_and_vc() {
        let vc = json!({"credentialSubject": {"months_active": 14}});
        let token = signer().sign(&vc).unwrap();
        let claims = segment_json(&token, 1);
        assert_eq!(claims["iss"], ISSUER);
        assert_eq!(claims["vc"], vc);
    }

    #[test]
    fn signing_is_deterministic() {
        let vc = json!({"x": [1, 2, 3]});
        assert_eq!(signer().sign(&vc).unwrap(), signer().sign(&vc).unwrap());
    }

    #[test]
    fn verify_accepts_own_token() {
        let signer = signer();
        let vc = json!({"type": ["VerifiableCredential"]});
        let token = signer.sign(&vc).unwrap();
        let claims = verify(&token, &signer.verifying_key()).unwrap();
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.vc, vc);
    }

    #[test]
    fn verify_rejects_other_key() {
        let token = signer().sign(&json!({})).unwrap();
        let other = IssuerKey::from_seed(&[0x07; 32]).verifying_key();
        assert!(matches!(verify(&token, &other), Err(VerifyError::BadSignature)));
    }

    #[test]
    fn verify_rejects_swapped_claims() {
        let signer = signer();
        let token = signer.sign(&json!({"months_active": 14})).unwrap();
        let forged_claims = BASE64_URL.encode(
            serde_json::to_vec(&json!({"iss": ISSUER, "vc": {"months_active": 99}})).unwrap(),
        );
        let parts: Vec<_> = token.split('.').collect();
        let forged = format!("{}.{forged_claims}.{}", parts[0], parts[2]);
        assert!(matches!(
            verify(&forged, &signer.verifying_key()),
            Err(VerifyError::BadSignature)
        ));
    }

    #[test]
    fn verify_rejects_wrong_segment_count() {
        let key = signer().verifying_key();
        assert!(matches!(verify("a.b", &key), Err(VerifyError::Malformed { .. })));
        assert!(matches!(verify("a.b.c.d", &key), Err(VerifyError::Malformed { .. })));
    }

    #[test]
    fn verify_rejects_other_algorithm() {
        let header = BASE64_URL.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = BASE64_URL.encode(br#"{"iss":"x","vc":{}}"#);
        let token = format!("{header}.{claims}.AAAA");
        assert!(matches!(
            verify(&token, &signer().verifying_key()),
            Err(VerifyError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn key_accepts_seed_and_keypair_forms() {
        let key = IssuerKey::from_seed(&[0x11; 32]);
        let pair = IssuerKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(pair.verifying_key(), key.verifying_key());

        let seed_only = IssuerKey::from_slice(&[0x11; 32]).unwrap();
        assert_eq!(seed_only.verifying_key(), key.verifying_key());
    }

    #[test]
    fn key_rejects_mismatched_keypair() {
        let mut pair = IssuerKey::from_seed(&[0x11; 32])
            .signing_key
            .to_keypair_bytes();
        pair[40] ^= 0xFF;
        assert!(matches!(
            IssuerKey::from_slice(&pair),
            Err(KeyError::KeypairMismatch)
        ));
    }

    #[test]
    fn key_rejects_other_lengths() {
        assert!(matches!(
            IssuerKey::from_slice(&[0u8; 48]),
            Err(KeyError::Length { actual: 48, .. })
        ));
    }

    #[test]
    fn public_key_roundtrips_through_base64() {
        let signer = signer();
        let decoded = verifying_key_from_base64(&signer.public_key_base64()).unwrap();
        assert_eq!(decoded, signer.verifying_key());
        assert!(matches!(
            verifying_key_from_base64(&BASE64.encode([1u8; 16])),
            Err(KeyError::Length { actual: 16, .. })
        ));
    }

    #[test]
    fn debug_hides_secret() {
        let debug = format!("{:?}", IssuerKey::from_seed(&[0x42; 32]));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(&hex::encode([0x42u8; 32])));
    }
}
