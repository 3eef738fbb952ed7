//! License status report for operators

use axum::extract::State;
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{AdminReportRequest, ApiError, Json};
use crate::domain::{LicenseReport, LicenseStatus};

/// POST /api/admin/licenses
///
/// Replenishes first, so the report always shows a stocked store. A wrong
/// passphrase is refused with 403 before anything is read or written.
pub async fn license_report(
    State(state): State<AppState>,
    Json(request): Json<AdminReportRequest>,
) -> Result<Json<LicenseReport>, ApiError> {
    let report = state.license_service.report(&request.password).await?;

    info!(
        categories = report.categories.len(),
        valid = report.count_with_status(LicenseStatus::Valid),
        used = report.count_with_status(LicenseStatus::Used),
        "Admin license report served"
    );

    Ok(Json(report))
}
