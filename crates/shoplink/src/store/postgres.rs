//! `PostgreSQL`-backed ledger.
//!
//! Uses runtime-checked queries so the crate builds without a live database.
//! Upserts run inside a transaction per aggregate (order plus its items).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::instrument;

use shoplink_core::{DisplayNumber, OrderId, SupplierOrderRef};

use crate::models::{DailySpend, FetchedSupplierOrder, StorefrontOrder, SupplierOrder};
use crate::store::{
    CostStats, DailyOrderStats, LedgerStore, LinkOutcome, StoreError, UpsertOutcome,
};

/// `PostgreSQL` implementation of [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Migration` if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    #[instrument(skip(self, order), fields(order_id = %order.id, number = %order.number))]
    async fn upsert_storefront_order(
        &self,
        order: &StorefrontOrder,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existed: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM storefront_order WHERE id = $1)")
                .bind(order.id.as_str())
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            r"
            INSERT INTO storefront_order
                (id, number, email, total_price, currency, created_at, tags, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                email       = EXCLUDED.email,
                total_price = EXCLUDED.total_price,
                currency    = EXCLUDED.currency,
                tags        = EXCLUDED.tags,
                note        = EXCLUDED.note
            ",
        )
        .bind(order.id.as_str())
        .bind(order.number.as_i64())
        .bind(order.email.as_deref())
        .bind(order.total_price)
        .bind(&order.currency)
        .bind(order.created_at)
        .bind(&order.tags)
        .bind(order.note.as_deref())
        .execute(&mut *tx)
        .await?;

        // Line items are replaced wholesale; the marketplace is the source
        // of truth for them.
        sqlx::query("DELETE FROM storefront_line_item WHERE order_id = $1")
            .bind(order.id.as_str())
            .execute(&mut *tx)
            .await?;
        for (position, item) in order.line_items.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO storefront_line_item
                    (order_id, position, title, quantity, unit_price, currency,
                     sku, variant_id, variant_sku, variant_title)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(order.id.as_str())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(&item.title)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(&item.currency)
            .bind(item.sku.as_deref())
            .bind(item.variant_id.as_deref())
            .bind(item.variant_sku.as_deref())
            .bind(item.variant_title.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }

    #[instrument(skip(self, fetched), fields(reference = %fetched.order.reference))]
    async fn upsert_supplier_order(
        &self,
        fetched: &FetchedSupplierOrder,
    ) -> Result<UpsertOutcome, StoreError> {
        let order = &fetched.order;
        let mut tx = self.pool.begin().await?;

        let existed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM supplier_order WHERE reference = $1)",
        )
        .bind(order.reference.as_str())
        .fetch_one(&mut *tx)
        .await?;

        // created_at and storefront_order_id are write-once; the refresh
        // only touches the volatile columns.
        sqlx::query(
            r"
            INSERT INTO supplier_order
                (reference, status, total, currency, created_at, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (reference) DO UPDATE SET
                status         = EXCLUDED.status,
                total          = EXCLUDED.total,
                currency       = EXCLUDED.currency,
                payment_status = EXCLUDED.payment_status
            ",
        )
        .bind(order.reference.as_str())
        .bind(&order.status)
        .bind(order.total)
        .bind(&order.currency)
        .bind(order.created_at)
        .bind(&order.payment_status)
        .execute(&mut *tx)
        .await?;

        // The item list mirrors the latest supplier payload; replace it
        // wholesale so rows the supplier no longer reports do not linger.
        sqlx::query("DELETE FROM supplier_order_item WHERE order_reference = $1")
            .bind(order.reference.as_str())
            .execute(&mut *tx)
            .await?;

        for item in &fetched.items {
            sqlx::query(
                r"
                INSERT INTO supplier_order_item
                    (order_reference, item_id, title, unit_price, quantity,
                     seller_id, transaction_id, shipping_cost, actual_shipping_cost)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(item.reference.as_str())
            .bind(&item.item_id)
            .bind(&item.title)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(&item.seller_id)
            .bind(&item.transaction_id)
            .bind(item.shipping_cost)
            .bind(item.actual_shipping_cost)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }

    #[instrument(skip(self), fields(reference = %reference, order_id = %order_id))]
    async fn link_supplier_order(
        &self,
        reference: &SupplierOrderRef,
        order_id: &OrderId,
    ) -> Result<LinkOutcome, StoreError> {
        let updated = sqlx::query(
            r"
            UPDATE supplier_order
            SET storefront_order_id = $2
            WHERE reference = $1 AND storefront_order_id IS NULL
            ",
        )
        .bind(reference.as_str())
        .bind(order_id.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(LinkOutcome::Linked);
        }

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT storefront_order_id FROM supplier_order WHERE reference = $1",
        )
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

        match existing {
            Some(id) if id == order_id.as_str() => Ok(LinkOutcome::AlreadyLinked),
            Some(id) => Ok(LinkOutcome::Conflict {
                existing: OrderId::new(id),
            }),
            // Lost a race with another writer between UPDATE and SELECT.
            None => Ok(LinkOutcome::Linked),
        }
    }

    async fn get_supplier_order(
        &self,
        reference: &SupplierOrderRef,
    ) -> Result<Option<SupplierOrder>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT reference, status, total, currency, created_at,
                   payment_status, storefront_order_id
            FROM supplier_order
            WHERE reference = $1
            ",
        )
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let created_at: DateTime<Utc> = row.try_get("created_at")?;
            Ok(SupplierOrder {
                reference: row.try_get("reference")?,
                status: row.try_get("status")?,
                total: row.try_get("total")?,
                currency: row.try_get("currency")?,
                created_at,
                payment_status: row.try_get("payment_status")?,
                storefront_order_id: row
                    .try_get::<Option<String>, _>("storefront_order_id")?
                    .map(OrderId::new),
            })
        })
        .transpose()
        .map_err(StoreError::Database)
    }

    async fn upsert_daily_spend(&self, spend: &DailySpend) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO daily_spend (date, spend, impressions, clicks)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (date) DO UPDATE SET
                spend       = EXCLUDED.spend,
                impressions = EXCLUDED.impressions,
                clicks      = EXCLUDED.clicks
            ",
        )
        .bind(spend.date)
        .bind(spend.spend)
        .bind(spend.impressions)
        .bind(spend.clicks)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_daily_spend(&self, date: NaiveDate) -> Result<Option<DailySpend>, StoreError> {
        let row = sqlx::query(
            "SELECT date, spend, impressions, clicks FROM daily_spend WHERE date = $1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(DailySpend {
                date: row.try_get("date")?,
                spend: row.try_get("spend")?,
                impressions: row.try_get("impressions")?,
                clicks: row.try_get("clicks")?,
            })
        })
        .transpose()
        .map_err(StoreError::Database)
    }

    async fn supplier_cost_stats(&self) -> Result<CostStats, StoreError> {
        let row = sqlx::query(
            r"
            SELECT COALESCE(SUM(total), 0) AS total, COUNT(*) AS count
            FROM supplier_order
            WHERE total > 0
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CostStats {
            total: row.try_get::<Decimal, _>("total")?,
            count: row.try_get::<i64, _>("count")?,
        })
    }

    async fn daily_order_stats(&self, date: NaiveDate) -> Result<DailyOrderStats, StoreError> {
        // Days are UTC calendar days, matching the spend aggregates.
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*)                       AS orders,
                COALESCE(SUM(o.total_price), 0) AS revenue,
                COUNT(*) FILTER (
                    WHERE NOT EXISTS (
                        SELECT 1 FROM supplier_order s
                        WHERE s.storefront_order_id = o.id
                    )
                ) AS unlinked_orders
            FROM storefront_order o
            WHERE (o.created_at AT TIME ZONE 'UTC')::date = $1
            ",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        let linked_cost: Decimal = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(s.total), 0)
            FROM supplier_order s
            JOIN storefront_order o ON o.id = s.storefront_order_id
            WHERE (o.created_at AT TIME ZONE 'UTC')::date = $1
            ",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(DailyOrderStats {
            orders: row.try_get::<i64, _>("orders")?,
            revenue: row.try_get::<Decimal, _>("revenue")?,
            linked_cost,
            unlinked_orders: row.try_get::<i64, _>("unlinked_orders")?,
        })
    }
}

/// Lookup by display number, used by the storefront sync to resolve an
/// order id without round-tripping to the marketplace.
impl PgStore {
    /// Storefront order id for a display number, if stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on query failure.
    pub async fn order_id_by_number(
        &self,
        number: DisplayNumber,
    ) -> Result<Option<OrderId>, StoreError> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM storefront_order WHERE number = $1")
                .bind(number.as_i64())
                .fetch_optional(&self.pool)
                .await?;
        Ok(id.map(OrderId::new))
    }
}
