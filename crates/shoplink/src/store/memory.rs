//! In-memory ledger used by unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use shoplink_core::{OrderId, SupplierOrderRef};

use crate::models::{
    DailySpend, FetchedSupplierOrder, StorefrontOrder, SupplierOrder, SupplierOrderItem,
};
use crate::store::{
    CostStats, DailyOrderStats, LedgerStore, LinkOutcome, StoreError, UpsertOutcome,
};

/// Hash-map backed [`LedgerStore`] with the same upsert and linking semantics
/// as the `PostgreSQL` implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    storefront_orders: HashMap<OrderId, StorefrontOrder>,
    supplier_orders: HashMap<SupplierOrderRef, SupplierOrder>,
    supplier_items: HashMap<SupplierOrderRef, Vec<SupplierOrderItem>>,
    daily_spend: HashMap<NaiveDate, DailySpend>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a test already panicked; propagate the state.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn upsert_storefront_order(
        &self,
        order: &StorefrontOrder,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.lock();
        let outcome = match inner.storefront_orders.get(&order.id) {
            Some(existing) => {
                let mut refreshed = order.clone();
                // created_at is immutable once stored.
                refreshed.created_at = existing.created_at;
                inner.storefront_orders.insert(order.id.clone(), refreshed);
                UpsertOutcome::Updated
            }
            None => {
                inner.storefront_orders.insert(order.id.clone(), order.clone());
                UpsertOutcome::Created
            }
        };
        Ok(outcome)
    }

    async fn upsert_supplier_order(
        &self,
        fetched: &FetchedSupplierOrder,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.lock();
        let reference = fetched.order.reference.clone();

        let outcome = match inner.supplier_orders.get(&reference) {
            Some(existing) => {
                let mut refreshed = fetched.order.clone();
                // Linkage and created_at survive refreshes.
                refreshed.storefront_order_id = existing.storefront_order_id.clone();
                refreshed.created_at = existing.created_at;
                inner.supplier_orders.insert(reference.clone(), refreshed);
                UpsertOutcome::Updated
            }
            None => {
                inner
                    .supplier_orders
                    .insert(reference.clone(), fetched.order.clone());
                UpsertOutcome::Created
            }
        };
        inner.supplier_items.insert(reference, fetched.items.clone());
        Ok(outcome)
    }

    async fn link_supplier_order(
        &self,
        reference: &SupplierOrderRef,
        order_id: &OrderId,
    ) -> Result<LinkOutcome, StoreError> {
        let mut inner = self.lock();
        let Some(order) = inner.supplier_orders.get_mut(reference) else {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        };

        match &order.storefront_order_id {
            None => {
                order.storefront_order_id = Some(order_id.clone());
                Ok(LinkOutcome::Linked)
            }
            Some(existing) if existing == order_id => Ok(LinkOutcome::AlreadyLinked),
            Some(existing) => Ok(LinkOutcome::Conflict {
                existing: existing.clone(),
            }),
        }
    }

    async fn get_supplier_order(
        &self,
        reference: &SupplierOrderRef,
    ) -> Result<Option<SupplierOrder>, StoreError> {
        Ok(self.lock().supplier_orders.get(reference).cloned())
    }

    async fn upsert_daily_spend(&self, spend: &DailySpend) -> Result<(), StoreError> {
        self.lock().daily_spend.insert(spend.date, spend.clone());
        Ok(())
    }

    async fn get_daily_spend(&self, date: NaiveDate) -> Result<Option<DailySpend>, StoreError> {
        Ok(self.lock().daily_spend.get(&date).cloned())
    }

    async fn supplier_cost_stats(&self) -> Result<CostStats, StoreError> {
        let inner = self.lock();
        let mut stats = CostStats::default();
        for order in inner.supplier_orders.values() {
            if order.total > Decimal::ZERO {
                stats.total += order.total;
                stats.count += 1;
            }
        }
        Ok(stats)
    }

    async fn daily_order_stats(&self, date: NaiveDate) -> Result<DailyOrderStats, StoreError> {
        let inner = self.lock();
        let mut stats = DailyOrderStats::default();

        for order in inner.storefront_orders.values() {
            if order.created_at.date_naive() != date {
                continue;
            }
            stats.orders += 1;
            stats.revenue += order.total_price;

            let linked: Vec<&SupplierOrder> = inner
                .supplier_orders
                .values()
                .filter(|s| s.storefront_order_id.as_ref() == Some(&order.id))
                .collect();
            if linked.is_empty() {
                stats.unlinked_orders += 1;
            } else {
                stats.linked_cost += linked.iter().map(|s| s.total).sum::<Decimal>();
            }
        }
        Ok(stats)
    }
}
