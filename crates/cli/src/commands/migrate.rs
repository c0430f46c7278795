//! Database migration command.

use shoplink::config::AppConfig;

use crate::commands::open_store;

/// Apply pending schema migrations.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let store = open_store(&config).await?;

    tracing::info!("Running migrations...");
    store.migrate().await?;
    tracing::info!("Migrations complete");
    Ok(())
}
