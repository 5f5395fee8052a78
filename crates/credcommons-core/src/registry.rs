//! Content hashing for registry integrity notes.
//!
//! The hash is recorded alongside each credential at issuance and never
//! recomputed. It is an annotation, not a lookup key or an authenticator.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a credential payload.
#[must_use]
pub fn hash_credential(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
