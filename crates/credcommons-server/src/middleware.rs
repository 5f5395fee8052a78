//! Request gating and caller identity.
//!
//! [`bearer_middleware`] checks the static `Authorization: Bearer` token when
//! one is configured. [`Actor`] extracts the lender identity from the
//! `X-Lender-Id` header. That identity is asserted by the caller and only
//! trusted because the bearer gate authenticated the channel.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the requesting lender's identity.
pub const LENDER_HEADER: &str = "x-lender-id";

/// Middleware that enforces the configured bearer token.
///
/// Passes everything through when no token is configured.
pub async fn bearer_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.expected_bearer.as_deref() else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = presented else {
        return AppError::Unauthorized("missing_bearer").into_response();
    };

    if !bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
        return AppError::Unauthorized("invalid_bearer").into_response();
    }

    next.run(req).await
}

/// The requesting actor from `X-Lender-Id`, empty only when the header is
/// absent.
///
/// Non-UTF-8 bytes are replaced rather than dropped, so a present header
/// always yields a non-empty actor and stays subject to lender binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(LENDER_HEADER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();
        Ok(Self(actor))
    }
}
