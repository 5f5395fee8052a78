//! Administrative credential routes: `/admin/issue/crc`, `/admin/revoke/crc`.
//!
//! Both sit behind the same bearer gate as the lender routes; there is no
//! separate admin role.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use credcommons_core::vc::CreditReadinessSubject;

use crate::error::AppError;
use crate::middleware::Actor;
use crate::state::AppState;

/// Concurrent admin requests allowed at once.
const ADMIN_CONCURRENCY: usize = 10;

/// Build the `/admin` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/issue/crc", post(issue_credential))
        .route("/admin/revoke/crc", post(revoke_credential))
        .layer(tower::limit::ConcurrencyLimitLayer::new(ADMIN_CONCURRENCY))
}

#[derive(Debug, Default, Deserialize)]
pub struct BorrowerQuery {
    #[serde(default)]
    pub borrower_reference: String,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub hash: String,
}

/// Issue (or reissue) the borrower's credit-readiness credential.
async fn issue_credential(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<BorrowerQuery>,
    body: Result<Json<CreditReadinessSubject>, JsonRejection>,
) -> Result<(StatusCode, Json<IssueResponse>), AppError> {
    let Json(subject) = body.map_err(|_| AppError::BadRequest("invalid_json"))?;

    let issued = state
        .issuance
        .issue(subject, &query.borrower_reference, actor.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(IssueResponse { hash: issued.hash })))
}

/// Revoke the borrower's credential.
async fn revoke_credential(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<BorrowerQuery>,
) -> Result<StatusCode, AppError> {
    state
        .issuance
        .revoke(&query.borrower_reference, actor.as_str())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
