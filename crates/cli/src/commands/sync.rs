//! Sync commands: storefront orders and ad spend.

use std::sync::Arc;

use chrono::NaiveDate;

use shoplink::config::AppConfig;
use shoplink::pipeline::Fetcher;
use shoplink::sources::{EbayClient, MetaClient, ShopifyClient};
use shoplink::sync::{sync_orders, sync_spend};

use crate::commands::open_store;

/// Sync the newest storefront orders and reconcile supplier references.
pub async fn orders(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let store = open_store(&config).await?;

    let marketplace = ShopifyClient::new(&config.shopify);
    let supplier = Arc::new(EbayClient::new(&config.ebay));
    let fetcher = Fetcher::new(supplier, config.fetch.clone());

    let report = sync_orders(&marketplace, &fetcher, &store, limit).await?;
    tracing::info!(
        orders = report.orders_synced,
        failures = report.failures,
        created = report.writes.created,
        linked = report.writes.linked,
        conflicts = report.writes.conflicts,
        "sync complete"
    );
    Ok(())
}

/// Sync daily ad spend for an inclusive date range.
pub async fn spend(from: NaiveDate, to: NaiveDate) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let Some(meta) = &config.meta else {
        return Err("ad spend sync requires META_ACCESS_TOKEN and META_AD_ACCOUNT_ID".into());
    };
    let store = open_store(&config).await?;

    let ads = MetaClient::new(meta);
    let days = sync_spend(&ads, &store, from, to).await?;
    tracing::info!(days, "spend sync complete");
    Ok(())
}
