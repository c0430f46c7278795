//! Shared fakes and builders for shoplink integration tests.
//!
//! The fakes implement the source traits over in-memory data so end-to-end
//! flows run without network access or a database.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)] // test support code

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use shoplink::models::{
    DailySpend, FetchedSupplierOrder, Fulfillment, StorefrontOrder, SupplierOrder,
};
use shoplink::sources::{
    AdSpend, MarketplaceOrders, SourceError, SupplierOrders,
};
use shoplink_core::{DisplayNumber, OrderId, SupplierOrderRef};

/// Midday on a fixed test date, so every order lands on the same UTC day.
#[must_use]
pub fn test_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 10, 12, 0, 0).unwrap()
}

/// Build a storefront order with the given note.
#[must_use]
pub fn storefront_order(number: i64, total: Decimal, note: Option<&str>) -> StorefrontOrder {
    StorefrontOrder {
        id: OrderId::new(format!("gid://shopify/Order/{number}")),
        number: DisplayNumber::new(number),
        email: Some("buyer@example.com".to_string()),
        total_price: total,
        currency: "AUD".to_string(),
        created_at: test_instant(),
        tags: Vec::new(),
        note: note.map(str::to_string),
        line_items: Vec::new(),
    }
}

/// Build a supplier order fetch result.
#[must_use]
pub fn supplier_order(reference: &str, total: Decimal) -> FetchedSupplierOrder {
    FetchedSupplierOrder {
        order: SupplierOrder {
            reference: reference.parse().unwrap(),
            status: "Completed".to_string(),
            total,
            currency: "AUD".to_string(),
            created_at: test_instant(),
            payment_status: "Paid".to_string(),
            storefront_order_id: None,
        },
        items: Vec::new(),
    }
}

/// Marketplace fake backed by a display-number map.
#[derive(Default)]
pub struct FakeMarketplace {
    by_number: HashMap<i64, StorefrontOrder>,
}

impl FakeMarketplace {
    #[must_use]
    pub fn with_orders(orders: Vec<StorefrontOrder>) -> Self {
        Self {
            by_number: orders.into_iter().map(|o| (o.number.as_i64(), o)).collect(),
        }
    }
}

#[async_trait]
impl MarketplaceOrders for FakeMarketplace {
    async fn list_orders(&self, limit: usize) -> Result<Vec<StorefrontOrder>, SourceError> {
        let mut orders: Vec<StorefrontOrder> = self.by_number.values().cloned().collect();
        orders.sort_by_key(|o| std::cmp::Reverse(o.number.as_i64()));
        orders.truncate(limit);
        Ok(orders)
    }

    async fn order_by_number(
        &self,
        number: DisplayNumber,
    ) -> Result<Option<StorefrontOrder>, SourceError> {
        Ok(self.by_number.get(&number.as_i64()).cloned())
    }

    async fn fulfillments(&self, _order_id: &OrderId) -> Result<Vec<Fulfillment>, SourceError> {
        Ok(Vec::new())
    }
}

/// What the scripted supplier does for one reference.
pub enum SupplierScript {
    /// Return this order.
    Order(FetchedSupplierOrder),
    /// Report the order as missing.
    Missing,
    /// Fail transiently this many times, then return the order.
    FlakyThenOrder(usize, FetchedSupplierOrder),
}

/// Supplier fake scripted per reference; unscripted references are missing.
#[derive(Default)]
pub struct ScriptedSupplier {
    scripts: HashMap<SupplierOrderRef, SupplierScript>,
    attempts: HashMap<SupplierOrderRef, AtomicUsize>,
    pub calls: AtomicUsize,
}

impl ScriptedSupplier {
    #[must_use]
    pub fn new(scripts: Vec<(SupplierOrderRef, SupplierScript)>) -> Self {
        let attempts = scripts
            .iter()
            .map(|(r, _)| (r.clone(), AtomicUsize::new(0)))
            .collect();
        Self {
            scripts: scripts.into_iter().collect(),
            attempts,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SupplierOrders for ScriptedSupplier {
    async fn get_order(
        &self,
        reference: &SupplierOrderRef,
    ) -> Result<Option<FetchedSupplierOrder>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(reference) {
            None | Some(SupplierScript::Missing) => Ok(None),
            Some(SupplierScript::Order(fetched)) => Ok(Some(fetched.clone())),
            Some(SupplierScript::FlakyThenOrder(failures, fetched)) => {
                let attempt = self.attempts[reference].fetch_add(1, Ordering::SeqCst);
                if attempt < *failures {
                    Err(SourceError::Transient("connection reset".to_string()))
                } else {
                    Ok(Some(fetched.clone()))
                }
            }
        }
    }
}

/// Ad spend fake returning a fixed aggregate for every date it knows about
/// and zeros for the rest.
#[derive(Default)]
pub struct FakeAds {
    by_date: HashMap<chrono::NaiveDate, DailySpend>,
}

impl FakeAds {
    #[must_use]
    pub fn with_days(days: Vec<DailySpend>) -> Self {
        Self {
            by_date: days.into_iter().map(|d| (d.date, d)).collect(),
        }
    }
}

#[async_trait]
impl AdSpend for FakeAds {
    async fn daily_spend(&self, date: chrono::NaiveDate) -> Result<DailySpend, SourceError> {
        Ok(self.by_date.get(&date).cloned().unwrap_or(DailySpend {
            date,
            spend: Decimal::ZERO,
            impressions: 0,
            clicks: 0,
        }))
    }
}
