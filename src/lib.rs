//! keygate
//!
//! Issues time-limited license keys grouped into duration categories:
//! - JSON file store with periodic per-category replenishment
//! - One-shot redemption and remaining-time lookup
//! - Passphrase-protected status report
//! - Optional text generation proxy to an OpenAI-compatible upstream

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::license::{FileLicenseRepository, LicenseService};
use infrastructure::services::GenerationService;

/// Build the license service over the configured file store
pub fn create_license_service(config: &AppConfig) -> anyhow::Result<Arc<LicenseService>> {
    let repository = Arc::new(FileLicenseRepository::new(config.licenses.store_path.clone()));
    let service = LicenseService::from_config(repository, &config.licenses, &config.admin)?;

    tracing::info!(
        path = %config.licenses.store_path.display(),
        categories = service.categories().len(),
        min_per_category = service.min_per_category(),
        "License service initialized"
    );

    Ok(Arc::new(service))
}

/// Create application state from configuration
///
/// Also returns the concrete license service so the caller can drive
/// maintenance outside the request path.
pub fn create_app_state(config: &AppConfig) -> anyhow::Result<(AppState, Arc<LicenseService>)> {
    let licenses = create_license_service(config)?;
    let mut state = AppState::new(licenses.clone());

    if let Some(generation) = GenerationService::from_config(&config.generation)? {
        tracing::info!(model = generation.model(), "Text generation enabled");
        state = state.with_generation(Arc::new(generation));
    }

    Ok((state, licenses))
}
