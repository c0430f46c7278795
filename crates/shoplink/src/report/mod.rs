//! Profitability reporting over the ledger.
//!
//! # Architecture
//!
//! Reports run in two phases. Phase one computes the historical average
//! supplier cost across every stored supplier order with a positive total.
//! Phase two reads each day's order and spend aggregates and derives the
//! metrics, using the phase-one average to estimate a cost for orders the
//! reconciliation has not linked yet.

mod metrics;

pub use metrics::{DailyReport, ProfitMetrics, RangeReport, Totals};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::store::{LedgerStore, StoreError};

/// Computes daily and range profitability reports from the ledger.
pub struct ProfitReporter<'a, L: ?Sized> {
    store: &'a L,
}

impl<'a, L> ProfitReporter<'a, L>
where
    L: LedgerStore + ?Sized,
{
    pub const fn new(store: &'a L) -> Self {
        Self { store }
    }

    /// Report for one calendar day.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a ledger read fails.
    #[instrument(skip(self))]
    pub async fn daily(&self, date: NaiveDate) -> Result<DailyReport, StoreError> {
        let average_cost = self.store.supplier_cost_stats().await?.average();
        self.daily_with_average(date, average_cost).await
    }

    /// Report for an inclusive date range.
    ///
    /// The historical average cost is computed once and shared by every day,
    /// and the range metrics are derived from the summed totals.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a ledger read fails.
    #[instrument(skip(self))]
    pub async fn range(&self, from: NaiveDate, to: NaiveDate) -> Result<RangeReport, StoreError> {
        let average_cost = self.store.supplier_cost_stats().await?.average();

        let mut days = Vec::new();
        let mut totals = Totals::default();
        let mut date = from;
        while date <= to {
            let day = self.daily_with_average(date, average_cost).await?;
            totals.absorb(&day.totals);
            days.push(day);
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        Ok(RangeReport {
            from,
            to,
            days,
            totals,
            metrics: ProfitMetrics::from_totals(&totals),
        })
    }

    async fn daily_with_average(
        &self,
        date: NaiveDate,
        average_cost: Decimal,
    ) -> Result<DailyReport, StoreError> {
        let orders = self.store.daily_order_stats(date).await?;
        let spend = self.store.get_daily_spend(date).await?;

        let estimated_cost =
            orders.linked_cost + Decimal::from(orders.unlinked_orders) * average_cost;
        let totals = Totals {
            orders: orders.orders,
            linked_orders: orders.orders - orders.unlinked_orders,
            revenue: orders.revenue,
            actual_cost: orders.linked_cost,
            estimated_cost,
            ad_spend: spend.as_ref().map_or(Decimal::ZERO, |s| s.spend),
            impressions: spend.as_ref().map_or(0, |s| s.impressions),
            clicks: spend.as_ref().map_or(0, |s| s.clicks),
        };

        Ok(DailyReport {
            date,
            totals,
            metrics: ProfitMetrics::from_totals(&totals),
        })
    }
}
