//! Credential disclosure route: `/credentials/crc`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::Actor;
use crate::state::AppState;

/// Build the `/credentials` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/credentials/crc", get(fetch_credential))
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialQuery {
    #[serde(default)]
    pub consent_id: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub jwt_vc: String,
}

/// Return the consented credential as a signed presentation.
async fn fetch_credential(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<CredentialQuery>,
) -> Result<Json<CredentialResponse>, AppError> {
    if query.consent_id.is_empty() {
        return Err(AppError::BadRequest("missing_consent_id"));
    }

    let jwt_vc = state
        .disclosure
        .disclose(&query.consent_id, actor.as_str())
        .await?;
    Ok(Json(CredentialResponse { jwt_vc }))
}
