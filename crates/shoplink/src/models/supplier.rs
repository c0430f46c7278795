//! Supplier order models, fetched from the drop-ship supplier.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shoplink_core::{OrderId, SupplierOrderRef};

/// Linkage state of a supplier order.
///
/// The only transition is `Pending -> Linked`; the pipeline never clears an
/// established link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierOrderState {
    /// Fetched and stored, not yet attributed to a storefront order.
    Pending,
    /// Attributed to the storefront order whose note referenced it.
    Linked,
}

/// An order placed with the drop-ship supplier.
///
/// Keyed by [`SupplierOrderRef`], the supplier-assigned natural key. On
/// re-fetch, `status`, `total`, and `payment_status` are overwritten in
/// place; `reference` and `created_at` never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierOrder {
    pub reference: SupplierOrderRef,
    pub status: String,
    /// Total cost charged by the supplier - the cost basis for profitability.
    pub total: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub payment_status: String,
    /// Weak reference to the storefront order this supplier order fulfills.
    /// Many supplier orders may point at one storefront order.
    pub storefront_order_id: Option<OrderId>,
}

impl SupplierOrder {
    /// Current linkage state.
    #[must_use]
    pub const fn state(&self) -> SupplierOrderState {
        if self.storefront_order_id.is_some() {
            SupplierOrderState::Linked
        } else {
            SupplierOrderState::Pending
        }
    }
}

/// An item within a supplier order, keyed by `(reference, item_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierOrderItem {
    pub reference: SupplierOrderRef,
    pub item_id: String,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub seller_id: String,
    pub transaction_id: String,
    /// Shipping charged to the buyer, when the supplier reports it.
    pub shipping_cost: Option<Decimal>,
    /// Shipping actually paid, when the supplier reports it.
    pub actual_shipping_cost: Option<Decimal>,
}

/// A supplier order with its items, as returned by a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSupplierOrder {
    pub order: SupplierOrder,
    pub items: Vec<SupplierOrderItem>,
}
