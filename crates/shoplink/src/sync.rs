//! Periodic sync entry points: recent orders and daily ad spend.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::pipeline::{Fetcher, WriteSummary, reconcile_order};
use crate::sources::{AdSpend, MarketplaceOrders, SourceError, SupplierOrders};
use crate::store::{LedgerStore, StoreError};

/// Errors from a sync run.
///
/// Only the listing call and persistence are fatal; per-order reconciliation
/// failures are absorbed into the report.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters from one order sync run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Storefront orders stored or refreshed.
    pub orders_synced: usize,
    /// Orders that failed to persist or reconcile and were skipped.
    pub failures: usize,
    /// Aggregate persistence counters across all orders.
    pub writes: WriteSummary,
}

/// Sync the newest storefront orders and reconcile each against the
/// supplier.
///
/// Safe to re-run at any cadence: every write is an idempotent upsert.
///
/// # Errors
///
/// Returns `SyncError::Source` if the order listing itself fails.
#[instrument(skip(marketplace, fetcher, store))]
pub async fn sync_orders<M, S, L>(
    marketplace: &M,
    fetcher: &Fetcher<S>,
    store: &L,
    limit: usize,
) -> Result<SyncReport, SyncError>
where
    M: MarketplaceOrders,
    S: SupplierOrders,
    L: LedgerStore + ?Sized,
{
    let orders = marketplace.list_orders(limit).await?;
    let mut report = SyncReport::default();

    for order in &orders {
        let result = async {
            store.upsert_storefront_order(order).await?;
            reconcile_order(store, fetcher, order).await
        }
        .await;
        match result {
            Ok(summary) => {
                report.orders_synced += 1;
                report.writes.absorb(summary);
            }
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "order skipped");
                report.failures += 1;
            }
        }
    }

    info!(
        orders = report.orders_synced,
        failures = report.failures,
        linked = report.writes.linked,
        "order sync finished"
    );
    Ok(report)
}

/// Sync daily ad spend aggregates for an inclusive date range.
///
/// Each day's aggregate replaces any stored one wholesale, so a re-sync
/// picks up late-arriving attribution adjustments.
///
/// # Errors
///
/// Returns `SyncError` on the first day that fails to fetch or persist.
#[instrument(skip(ads, store))]
pub async fn sync_spend<A, L>(
    ads: &A,
    store: &L,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<usize, SyncError>
where
    A: AdSpend,
    L: LedgerStore + ?Sized,
{
    let mut days = 0;
    let mut date = from;
    while date <= to {
        let spend = ads.daily_spend(date).await?;
        store.upsert_daily_spend(&spend).await?;
        days += 1;
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    info!(days, "spend sync finished");
    Ok(days)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use shoplink_core::{DisplayNumber, OrderId, SupplierOrderRef};

    use crate::config::FetchConfig;
    use crate::models::{
        DailySpend, FetchedSupplierOrder, Fulfillment, StorefrontOrder, SupplierOrder,
    };
    use crate::store::MemoryStore;

    struct FakeMarketplace {
        orders: Vec<StorefrontOrder>,
    }

    #[async_trait]
    impl MarketplaceOrders for FakeMarketplace {
        async fn list_orders(&self, limit: usize) -> Result<Vec<StorefrontOrder>, SourceError> {
            Ok(self.orders.iter().take(limit).cloned().collect())
        }

        async fn order_by_number(
            &self,
            number: DisplayNumber,
        ) -> Result<Option<StorefrontOrder>, SourceError> {
            Ok(self.orders.iter().find(|o| o.number == number).cloned())
        }

        async fn fulfillments(
            &self,
            _order_id: &OrderId,
        ) -> Result<Vec<Fulfillment>, SourceError> {
            Ok(Vec::new())
        }
    }

    struct FakeSupplier;

    #[async_trait]
    impl SupplierOrders for FakeSupplier {
        async fn get_order(
            &self,
            reference: &SupplierOrderRef,
        ) -> Result<Option<FetchedSupplierOrder>, SourceError> {
            Ok(Some(FetchedSupplierOrder {
                order: SupplierOrder {
                    reference: reference.clone(),
                    status: "Completed".to_string(),
                    total: dec!(20.00),
                    currency: "AUD".to_string(),
                    created_at: Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap(),
                    payment_status: "Paid".to_string(),
                    storefront_order_id: None,
                },
                items: Vec::new(),
            }))
        }
    }

    fn order(number: i64, note: Option<&str>) -> StorefrontOrder {
        StorefrontOrder {
            id: OrderId::new(format!("gid://shopify/Order/{number}")),
            number: DisplayNumber::new(number),
            email: None,
            total_price: dec!(50.00),
            currency: "AUD".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 2, 10, 1, 0, 0).unwrap(),
            tags: Vec::new(),
            note: note.map(str::to_string),
            line_items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_sync_orders_links_referenced_supplier_orders() {
        let marketplace = FakeMarketplace {
            orders: vec![order(1102, Some("12-34567-89012")), order(1101, None)],
        };
        let fetcher = Fetcher::new(Arc::new(FakeSupplier), FetchConfig::default());
        let store = MemoryStore::new();

        let report = sync_orders(&marketplace, &fetcher, &store, 50).await.unwrap();

        assert_eq!(report.orders_synced, 2);
        assert_eq!(report.failures, 0);
        assert_eq!(report.writes.created, 1);
        assert_eq!(report.writes.linked, 1);

        let stored = store
            .get_supplier_order(&"12-34567-89012".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.storefront_order_id,
            Some(OrderId::new("gid://shopify/Order/1102"))
        );
    }

    struct FakeAds;

    #[async_trait]
    impl AdSpend for FakeAds {
        async fn daily_spend(&self, date: NaiveDate) -> Result<DailySpend, SourceError> {
            Ok(DailySpend {
                date,
                spend: dec!(20.00),
                impressions: 1000,
                clicks: 40,
            })
        }
    }

    #[tokio::test]
    async fn test_sync_spend_covers_the_inclusive_range() {
        let store = MemoryStore::new();
        let from = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 2, 12).unwrap();

        let days = sync_spend(&FakeAds, &store, from, to).await.unwrap();
        assert_eq!(days, 3);

        for date in [from, NaiveDate::from_ymd_opt(2025, 2, 11).unwrap(), to] {
            let spend = store.get_daily_spend(date).await.unwrap().unwrap();
            assert_eq!(spend.spend, Decimal::new(2000, 2));
        }
    }
}
