//! Error types for `credcommons-core`.
//!
//! Each component returns its own error enum so callers can tell a missing
//! consent from a lapsed credential from a cipher fault. Crypto errors never
//! include key material or plaintext, only operation descriptions.

use credcommons_storage::StorageError;

use crate::consent::ConsentState;

/// Errors from the envelope cipher.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// AES-256-GCM decryption failed (wrong key, corrupted ciphertext, or tampered tag).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// Ciphertext is too short to contain a nonce and tag.
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },
}

/// Errors from parsing provisioned key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The key was not valid base64.
    #[error("invalid key encoding: {reason}")]
    Encoding { reason: String },

    /// The decoded key had the wrong size.
    #[error("invalid key length: expected {expected}, got {actual} bytes")]
    Length { expected: &'static str, actual: usize },

    /// A 64-byte Ed25519 keypair whose public half does not match its seed.
    #[error("ed25519 keypair public half does not match its seed")]
    KeypairMismatch,

    /// The bytes are not a valid Ed25519 public key.
    #[error("invalid ed25519 public key")]
    InvalidPublicKey,
}

/// Errors from signing a presentation.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The token header or claims could not be serialized.
    #[error("presentation serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Errors from verifying a presentation token.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The token is not three base64url segments of JSON.
    #[error("malformed presentation: {reason}")]
    Malformed { reason: String },

    /// The header names an algorithm other than `EdDSA`.
    #[error("unsupported presentation algorithm '{alg}'")]
    UnsupportedAlgorithm { alg: String },

    /// The signature does not verify under the given public key.
    #[error("presentation signature is invalid")]
    BadSignature,
}

/// Errors from the consent lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    /// The consent request is missing a field or carries an invalid duration.
    #[error("invalid consent request: {reason}")]
    Validation { reason: String },

    /// No consent exists with this id.
    #[error("consent not found: {consent_id}")]
    NotFound { consent_id: String },

    /// The consent exists but is not currently usable.
    #[error("consent {consent_id} is {state}")]
    Inactive {
        consent_id: String,
        state: ConsentState,
    },

    /// The requesting actor is not the lender the consent was granted to.
    #[error("consent {consent_id} was granted to a different lender")]
    ActorMismatch { consent_id: String },

    /// The storage backend failed.
    #[error("consent storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from credential issuance and revocation.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// The issuance request is missing a required field.
    #[error("invalid issuance request: {reason}")]
    Validation { reason: String },

    /// The credential document could not be serialized.
    #[error("credential serialization failed: {reason}")]
    Marshal { reason: String },

    /// The envelope cipher failed to seal the payload.
    #[error("credential encryption failed: {0}")]
    Encrypt(#[source] CryptoError),

    /// No credential exists for the borrower (revocation only).
    #[error("no credential issued for borrower {borrower_reference}")]
    NotFound { borrower_reference: String },

    /// The storage backend failed.
    #[error("credential storage error: {0}")]
    Storage(#[source] StorageError),
}

/// Errors from the disclosure pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DisclosureError {
    /// Consent validation failed; the inner error says why.
    #[error(transparent)]
    Consent(#[from] ConsentError),

    /// The consent is valid but no credential was ever issued for the borrower.
    #[error("no credential issued for borrower {borrower_reference}")]
    CredentialNotFound { borrower_reference: String },

    /// The credential exists but has been revoked or has expired.
    #[error("credential for borrower {borrower_reference} is revoked or expired")]
    Gone { borrower_reference: String },

    /// The stored ciphertext could not be opened.
    #[error("credential decryption failed: {0}")]
    Decrypt(#[source] CryptoError),

    /// The decrypted payload is not valid JSON.
    #[error("credential decode failed: {reason}")]
    Decode { reason: String },

    /// The presentation could not be signed.
    #[error("presentation signing failed: {0}")]
    Sign(#[source] SignError),

    /// The storage backend failed.
    #[error("credential storage error: {0}")]
    Storage(#[source] StorageError),
}

/// Errors from audit sinks. Never surfaced to request outcomes.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// A sink failed to persist the event.
    #[error("audit sink '{name}' failed: {reason}")]
    SinkFailure { name: String, reason: String },

    /// The event could not be serialized.
    #[error("audit serialization failed: {reason}")]
    Serialization { reason: String },
}
