//! Consent routes: `/consents`.
//!
//! The granting lender is whoever sent `X-Lender-Id` on the create request.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credcommons_core::consent::ConsentRequest;

use crate::error::AppError;
use crate::middleware::Actor;
use crate::state::AppState;

/// Build the `/consents` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/consents", post(create_consent))
}

// ── Request / Response types ─────────────────────────────────────────

/// Missing fields decode to empty values and are reported as
/// `missing_fields`, not `invalid_json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateConsentRequest {
    pub borrower_reference: String,
    pub scope: Vec<String>,
    pub purpose: String,
    pub duration_days: i64,
    pub assisted_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateConsentResponse {
    pub consent_id: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Create an active consent for the calling lender.
async fn create_consent(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    body: Result<Json<CreateConsentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateConsentResponse>), AppError> {
    let Json(body) = body.map_err(|_| AppError::BadRequest("invalid_json"))?;

    let consent = state
        .consents
        .create(ConsentRequest {
            borrower_reference: body.borrower_reference,
            lender_id: actor.0,
            scope: body.scope,
            purpose: body.purpose,
            assisted_by: body.assisted_by,
            duration_days: body.duration_days,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateConsentResponse {
            consent_id: consent.id,
            status: consent.status,
            expires_at: consent.expires_at,
        }),
    ))
}
