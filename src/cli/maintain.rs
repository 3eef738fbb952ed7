//! One-shot commands - a single maintenance pass against the store

use anyhow::Context;

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Run one replenishment pass and print its summary
pub async fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    let service = crate::create_license_service(&config)?;

    let summary = service.maintain().await.context("maintenance pass failed")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// Run one pass and print the per-category report
pub async fn report() -> anyhow::Result<()> {
    let config = load_config()?;
    let service = crate::create_license_service(&config)?;

    let report = service
        .status_report()
        .await
        .context("failed to build license report")?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("invalid configuration")?;
    logging::init_logging(&config.logging);

    Ok(config)
}
