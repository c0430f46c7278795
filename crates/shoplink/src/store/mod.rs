//! Persistent ledger of storefront orders, supplier orders, and ad spend.
//!
//! # Architecture
//!
//! All writes are idempotent upserts keyed on natural identifiers, so every
//! sync and backfill can be re-run safely. [`LedgerStore`] is the seam: the
//! pipeline and the profitability aggregator depend on the trait, with
//! [`PgStore`] backing production and [`MemoryStore`] backing tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shoplink_core::{OrderId, SupplierOrderRef};

use crate::config::AppConfig;
use crate::models::{DailySpend, FetchedSupplierOrder, StorefrontOrder, SupplierOrder};

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result of an idempotent upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed for the natural key.
    Created,
    /// An existing row was refreshed in place.
    Updated,
}

/// Result of linking a supplier order to a storefront order.
///
/// Linking is monotonic: once a supplier order points at a storefront order
/// it never changes, so re-running a sync can only confirm or conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The supplier order was unlinked and now points at the given order.
    Linked,
    /// The supplier order already pointed at this same storefront order.
    AlreadyLinked,
    /// The supplier order points at a different storefront order; the
    /// existing link is kept.
    Conflict { existing: OrderId },
}

/// Sum and count of supplier order totals, for the historical average cost.
///
/// Only orders with a positive total participate; free or zero-total rows
/// would drag the average toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CostStats {
    pub total: Decimal,
    pub count: i64,
}

impl CostStats {
    /// Average supplier cost per order, or zero when no orders qualify.
    #[must_use]
    pub fn average(&self) -> Decimal {
        if self.count == 0 {
            Decimal::ZERO
        } else {
            self.total / Decimal::from(self.count)
        }
    }
}

/// Per-day order aggregates read by the profitability aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DailyOrderStats {
    /// Storefront orders created on the day.
    pub orders: i64,
    /// Sum of their totals.
    pub revenue: Decimal,
    /// Sum of supplier totals linked to the day's orders.
    pub linked_cost: Decimal,
    /// Orders with no linked supplier order.
    pub unlinked_orders: i64,
}

/// The ledger every pipeline stage writes to and the aggregator reads from.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert or refresh a storefront order and its line items.
    async fn upsert_storefront_order(
        &self,
        order: &StorefrontOrder,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Insert or refresh a supplier order and its items.
    ///
    /// On update the stored `storefront_order_id` is preserved; only
    /// [`LedgerStore::link_supplier_order`] may set it.
    async fn upsert_supplier_order(
        &self,
        fetched: &FetchedSupplierOrder,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Point a supplier order at a storefront order, if not already linked.
    async fn link_supplier_order(
        &self,
        reference: &SupplierOrderRef,
        order_id: &OrderId,
    ) -> Result<LinkOutcome, StoreError>;

    /// Look up one supplier order by reference.
    async fn get_supplier_order(
        &self,
        reference: &SupplierOrderRef,
    ) -> Result<Option<SupplierOrder>, StoreError>;

    /// Replace the spend aggregate for a date.
    async fn upsert_daily_spend(&self, spend: &DailySpend) -> Result<(), StoreError>;

    /// Spend aggregate for a date, if synced.
    async fn get_daily_spend(&self, date: NaiveDate) -> Result<Option<DailySpend>, StoreError>;

    /// Sum and count of positive supplier order totals across all history.
    async fn supplier_cost_stats(&self) -> Result<CostStats, StoreError>;

    /// Order count, revenue, linked cost, and unlinked count for one date.
    async fn daily_order_stats(&self, date: NaiveDate) -> Result<DailyOrderStats, StoreError>;
}

/// Create a `PostgreSQL` connection pool from application configuration.
///
/// # Errors
///
/// Returns `StoreError::Database` if the pool cannot connect.
pub async fn create_pool(config: &AppConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url.expose_secret())
        .await?;
    Ok(pool)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_stats_average() {
        let stats = CostStats {
            total: Decimal::new(6000, 2),
            count: 3,
        };
        assert_eq!(stats.average(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_cost_stats_average_empty_is_zero() {
        assert_eq!(CostStats::default().average(), Decimal::ZERO);
    }
}
