//! Public license endpoints

use axum::extract::{Path, State};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, RemainingResponse, VerifyRequest, VerifyResponse};

/// POST /api/verify
///
/// Redeems the key. Unknown, used and expired keys are answered with
/// `valid: false` and a reason, not an error status.
pub async fn verify_license(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    if request.key.trim().is_empty() {
        return Err(ApiError::bad_request("License key is required").with_param("key"));
    }

    let outcome = state.license_service.verify(&request.key).await?;

    Ok(Json(outcome.into()))
}

/// GET /api/remaining/{key}
pub async fn remaining_time(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RemainingResponse>, ApiError> {
    let remaining = state.license_service.remaining(&key).await?;
    debug!(active = remaining.is_some(), "Remaining time lookup");

    Ok(Json(remaining.into()))
}
