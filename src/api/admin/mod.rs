//! Admin API endpoints

pub mod licenses;

use axum::{routing::post, Router};

use super::state::AppState;

/// Create admin API router
pub fn create_admin_router() -> Router<AppState> {
    Router::new().route("/licenses", post(licenses::license_report))
}
