//! Historical backfill command.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use shoplink::config::AppConfig;
use shoplink::pipeline::{BackfillWalker, Fetcher};
use shoplink::sources::{EbayClient, ShopifyClient};
use shoplink_core::DisplayNumber;

use crate::commands::open_store;

/// Walk display numbers from `start` (or the newest order) down to `floor`.
///
/// Ctrl-C cancels cleanly between orders; everything written so far stays.
pub async fn run(start: Option<i64>, floor: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let store = open_store(&config).await?;

    let marketplace = ShopifyClient::new(&config.shopify);
    let supplier = Arc::new(EbayClient::new(&config.ebay));
    let fetcher = Fetcher::new(supplier, config.fetch.clone());
    let walker = BackfillWalker::new(&marketplace, &fetcher, &store, DisplayNumber::new(floor));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping after the current order");
            signal_token.cancel();
        }
    });

    let report = walker.run(start.map(DisplayNumber::new), &cancel).await?;
    tracing::info!(
        visited = report.visited,
        gaps = report.gaps,
        reconciled = report.reconciled,
        failures = report.failures,
        linked = report.writes.linked,
        stopped_early = report.stopped_early,
        "backfill complete"
    );
    Ok(())
}
