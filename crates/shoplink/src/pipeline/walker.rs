//! Historical backfill: walk display numbers downward and reconcile each
//! order found along the way.

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use shoplink_core::DisplayNumber;

use crate::pipeline::fetch::Fetcher;
use crate::pipeline::writer::WriteSummary;
use crate::pipeline::reconcile_order;
use crate::sources::{MarketplaceOrders, SourceError, SupplierOrders};
use crate::store::LedgerStore;

/// Counters from one backfill run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    /// Display numbers examined.
    pub visited: usize,
    /// Numbers with no order behind them (deleted or never issued).
    pub gaps: usize,
    /// Orders stored and reconciled.
    pub reconciled: usize,
    /// Reconciled orders whose note carried at least one reference.
    pub with_references: usize,
    /// Orders that failed and were skipped.
    pub failures: usize,
    /// Whether the walk was cancelled before reaching the floor.
    pub stopped_early: bool,
    /// Aggregate persistence counters across all reconciled orders.
    pub writes: WriteSummary,
}

/// Walks storefront display numbers from a starting point down to a floor,
/// reconciling every order it finds.
///
/// One order failing does not stop the walk; the failure is logged and
/// counted. Gaps in the number sequence are skipped.
pub struct BackfillWalker<'a, M, S, L: ?Sized> {
    marketplace: &'a M,
    fetcher: &'a Fetcher<S>,
    store: &'a L,
    floor: DisplayNumber,
}

impl<'a, M, S, L> BackfillWalker<'a, M, S, L>
where
    M: MarketplaceOrders,
    S: SupplierOrders,
    L: LedgerStore + ?Sized,
{
    pub fn new(
        marketplace: &'a M,
        fetcher: &'a Fetcher<S>,
        store: &'a L,
        floor: DisplayNumber,
    ) -> Self {
        Self {
            marketplace,
            fetcher,
            store,
            floor,
        }
    }

    /// Run the walk from `start` (or the newest order when `None`) down to
    /// the floor, inclusive.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` only when resolving the starting point fails
    /// (the marketplace is unreachable); per-order failures are absorbed
    /// into the report, and rerunning later is safe.
    #[instrument(skip(self, cancel), fields(floor = %self.floor))]
    pub async fn run(
        &self,
        start: Option<DisplayNumber>,
        cancel: &CancellationToken,
    ) -> Result<BackfillReport, SourceError> {
        let mut report = BackfillReport::default();

        let Some(start) = self.resolve_start(start).await? else {
            info!("no orders to backfill from");
            return Ok(report);
        };

        let mut current = Some(start);
        while let Some(number) = current {
            if number < self.floor {
                break;
            }
            if cancel.is_cancelled() {
                info!(at = %number, "backfill cancelled");
                report.stopped_early = true;
                break;
            }

            report.visited += 1;
            self.visit(number, &mut report).await;
            current = number.prev();
        }

        info!(
            visited = report.visited,
            gaps = report.gaps,
            reconciled = report.reconciled,
            with_references = report.with_references,
            failures = report.failures,
            "backfill finished"
        );
        Ok(report)
    }

    async fn resolve_start(
        &self,
        start: Option<DisplayNumber>,
    ) -> Result<Option<DisplayNumber>, SourceError> {
        if start.is_some() {
            return Ok(start);
        }
        let orders = self.marketplace.list_orders(1).await?;
        Ok(orders.first().map(|o| o.number))
    }

    async fn visit(&self, number: DisplayNumber, report: &mut BackfillReport) {
        match self.marketplace.order_by_number(number).await {
            Ok(None) => {
                report.gaps += 1;
            }
            Ok(Some(order)) => {
                let result = async {
                    self.store.upsert_storefront_order(&order).await?;
                    reconcile_order(self.store, self.fetcher, &order).await
                }
                .await;
                match result {
                    Ok(summary) => {
                        report.reconciled += 1;
                        if summary.references > 0 {
                            report.with_references += 1;
                        }
                        report.writes.absorb(summary);
                    }
                    Err(err) => {
                        warn!(number = %number, error = %err, "order skipped");
                        report.failures += 1;
                    }
                }
            }
            Err(err) => {
                warn!(number = %number, error = %err, "order skipped");
                report.failures += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use shoplink_core::OrderId;

    use crate::config::FetchConfig;
    use crate::models::{
        FetchedSupplierOrder, Fulfillment, StorefrontOrder, SupplierOrder,
    };
    use crate::sources::SourceError;
    use crate::store::MemoryStore;

    struct FakeMarketplace {
        by_number: HashMap<i64, StorefrontOrder>,
    }

    #[async_trait]
    impl MarketplaceOrders for FakeMarketplace {
        async fn list_orders(&self, _limit: usize) -> Result<Vec<StorefrontOrder>, SourceError> {
            let mut orders: Vec<StorefrontOrder> = self.by_number.values().cloned().collect();
            orders.sort_by_key(|o| std::cmp::Reverse(o.number.as_i64()));
            Ok(orders)
        }

        async fn order_by_number(
            &self,
            number: DisplayNumber,
        ) -> Result<Option<StorefrontOrder>, SourceError> {
            Ok(self.by_number.get(&number.as_i64()).cloned())
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
    impl crate::sources::SupplierOrders for FakeSupplier {
        async fn get_order(
            &self,
            reference: &shoplink_core::SupplierOrderRef,
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

    fn marketplace_with_gap() -> FakeMarketplace {
        // 1101 is a gap.
        let mut by_number = HashMap::new();
        by_number.insert(1100, order(1100, Some("12-34567-89012")));
        by_number.insert(1102, order(1102, None));
        FakeMarketplace { by_number }
    }

    #[tokio::test]
    async fn test_walk_skips_gaps_and_reaches_floor() {
        let marketplace = marketplace_with_gap();
        let fetcher = Fetcher::new(Arc::new(FakeSupplier), FetchConfig::default());
        let store = MemoryStore::new();
        let walker =
            BackfillWalker::new(&marketplace, &fetcher, &store, DisplayNumber::new(1100));

        let report = walker
            .run(Some(DisplayNumber::new(1102)), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.visited, 3);
        assert_eq!(report.gaps, 1);
        assert_eq!(report.reconciled, 2);
        assert_eq!(report.with_references, 1);
        assert_eq!(report.failures, 0);
        assert!(!report.stopped_early);
        assert_eq!(report.writes.linked, 1);

        let stored = store
            .get_supplier_order(&"12-34567-89012".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.storefront_order_id,
            Some(OrderId::new("gid://shopify/Order/1100"))
        );
    }

    #[tokio::test]
    async fn test_walk_starts_from_newest_when_unspecified() {
        let marketplace = marketplace_with_gap();
        let fetcher = Fetcher::new(Arc::new(FakeSupplier), FetchConfig::default());
        let store = MemoryStore::new();
        let walker =
            BackfillWalker::new(&marketplace, &fetcher, &store, DisplayNumber::new(1100));

        let report = walker.run(None, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.visited, 3);
        assert_eq!(report.reconciled, 2);
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_walk() {
        let marketplace = marketplace_with_gap();
        let fetcher = Fetcher::new(Arc::new(FakeSupplier), FetchConfig::default());
        let store = MemoryStore::new();
        let walker =
            BackfillWalker::new(&marketplace, &fetcher, &store, DisplayNumber::new(1100));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = walker
            .run(Some(DisplayNumber::new(1102)), &cancel)
            .await
            .unwrap();

        assert!(report.stopped_early);
        assert_eq!(report.visited, 0);
    }

    #[tokio::test]
    async fn test_failing_order_does_not_stop_the_walk() {
        struct FlakyMarketplace {
            inner: FakeMarketplace,
        }

        #[async_trait]
        impl MarketplaceOrders for FlakyMarketplace {
            async fn list_orders(
                &self,
                limit: usize,
            ) -> Result<Vec<StorefrontOrder>, SourceError> {
                self.inner.list_orders(limit).await
            }

            async fn order_by_number(
                &self,
                number: DisplayNumber,
            ) -> Result<Option<StorefrontOrder>, SourceError> {
                if number.as_i64() == 1102 {
                    return Err(SourceError::Transient("boom".to_string()));
                }
                self.inner.order_by_number(number).await
            }

            async fn fulfillments(
                &self,
                order_id: &OrderId,
            ) -> Result<Vec<Fulfillment>, SourceError> {
                self.inner.fulfillments(order_id).await
            }
        }

        let marketplace = FlakyMarketplace {
            inner: marketplace_with_gap(),
        };
        let fetcher = Fetcher::new(Arc::new(FakeSupplier), FetchConfig::default());
        let store = MemoryStore::new();
        let walker =
            BackfillWalker::new(&marketplace, &fetcher, &store, DisplayNumber::new(1100));

        let report = walker
            .run(Some(DisplayNumber::new(1102)), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.reconciled, 1);
        assert_eq!(report.visited, 3);
    }
}
