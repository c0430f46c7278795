//! Command implementations.
//!
//! Every command loads configuration from the environment, builds the
//! clients it needs, and reports through `tracing`; report output goes to
//! stdout.

pub mod backfill;
pub mod fulfillments;
pub mod migrate;
pub mod report;
pub mod sync;

use shoplink::config::AppConfig;
use shoplink::store::{PgStore, create_pool};

/// Load configuration and open the ledger.
pub async fn open_store(config: &AppConfig) -> Result<PgStore, Box<dyn std::error::Error>> {
    let pool = create_pool(config).await?;
    Ok(PgStore::new(pool))
}
