//! HTTP error types for the Credit Commons server.
//!
//! Maps domain errors from `credcommons-core` into HTTP responses. Every
//! response body is `{"error": "<code>"}` with an opaque, stable code. The
//! underlying cause is logged server-side and never sent to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use credcommons_core::error::{ConsentError, DisclosureError, IssuanceError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppError {
    /// Client sent invalid input.
    BadRequest(&'static str),
    /// Missing or wrong bearer token.
    Unauthorized(&'static str),
    /// Consent is not usable by this caller.
    Forbidden(&'static str),
    /// Requested resource not found.
    NotFound(&'static str),
    /// Resource existed but was revoked or has lapsed.
    Gone(&'static str),
    /// Internal fault.
    Internal(&'static str),
}

impl AppError {
    /// Log `cause` and return an opaque internal error.
    #[must_use]
    pub fn internal(code: &'static str, cause: &dyn std::error::Error) -> Self {
        error!(code, error = %cause, "request failed");
        Self::Internal(code)
    }

    /// The machine-readable code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::BadRequest(code)
            | Self::Unauthorized(code)
            | Self::Forbidden(code)
            | Self::NotFound(code)
            | Self::Gone(code)
            | Self::Internal(code) => code,
        }
    }

    /// The HTTP status for this error.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Gone(_) => StatusCode::GONE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.code() };
        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<ConsentError> for AppError {
    fn from(err: ConsentError) -> Self {
        match err {
            ConsentError::Validation { .. } => {
                warn!(error = %err, "rejected consent input");
                Self::BadRequest("missing_fields")
            }
            ConsentError::NotFound { .. } => Self::NotFound("consent_not_found"),
            ConsentError::Inactive { .. } => Self::Forbidden("consent_inactive"),
            ConsentError::ActorMismatch { .. } => Self::Forbidden("consent_lender_mismatch"),
            ConsentError::Storage(ref inner) => Self::internal("consent_store_failed", inner),
        }
    }
}

impl From<DisclosureError> for AppError {
    fn from(err: DisclosureError) -> Self {
        match err {
            DisclosureError::Consent(ConsentError::Storage(ref inner)) => {
                Self::internal("consent_lookup_failed", inner)
            }
            DisclosureError::Consent(inner) => inner.into(),
            DisclosureError::CredentialNotFound { .. } => Self::NotFound("credential_not_found"),
            DisclosureError::Gone { .. } => Self::Gone("credential_revoked_or_expired"),
            DisclosureError::Decrypt(ref inner) => {
                Self::internal("credential_decrypt_failed", inner)
            }
            DisclosureError::Decode { .. } => Self::internal("credential_decode_failed", &err),
            DisclosureError::Sign(ref inner) => Self::internal("credential_sign_failed", inner),
            DisclosureError::Storage(ref inner) => {
                Self::internal("credential_lookup_failed", inner)
            }
        }
    }
}

impl From<IssuanceError> for AppError {
    fn from(err: IssuanceError) -> Self {
        match err {
            IssuanceError::Validation { .. } => Self::BadRequest("missing_borrower_reference"),
            IssuanceError::NotFound { .. } => Self::NotFound("credential_not_found"),
            IssuanceError::Marshal { .. } => Self::internal("credential_marshal_failed", &err),
            IssuanceError::Encrypt(ref inner) => {
                Self::internal("credential_encrypt_failed", inner)
            }
            IssuanceError::Storage(ref inner) => Self::internal("credential_store_failed", inner),
        }
    }
}
