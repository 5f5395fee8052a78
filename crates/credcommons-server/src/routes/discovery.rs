//! Borrower discovery route: `/discovery`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use credcommons_storage::BorrowerRecord;

use crate::error::AppError;
use crate::middleware::Actor;
use crate::state::AppState;

/// Build the `/discovery` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/discovery", get(discover))
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryQuery {
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub sector: String,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub results: Vec<BorrowerRecord>,
}

/// List borrowers by district and sector.
async fn discover(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<DiscoveryQuery>,
) -> Result<Json<DiscoveryResponse>, AppError> {
    let results = state
        .directory
        .search(&query.district, &query.sector, actor.as_str())
        .await
        .map_err(|e| AppError::internal("discovery_failed", &e))?;
    Ok(Json(DiscoveryResponse { results }))
}
