//! Storefront order models, synced from the marketplace.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shoplink_core::{DisplayNumber, OrderId};

/// An order placed on the retail storefront.
///
/// Created and refreshed by the periodic marketplace sync; never deleted by
/// this subsystem. `created_at` is immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorefrontOrder {
    /// Source-assigned unique id.
    pub id: OrderId,
    /// Customer-facing display number (`#1102` -> `1102`).
    pub number: DisplayNumber,
    pub email: Option<String>,
    pub total_price: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Free-text note; the supplier references live in here.
    pub note: Option<String>,
    /// Ordered line items as reported by the marketplace.
    pub line_items: Vec<LineItem>,
}

/// A line item on a storefront order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub currency: String,
    pub sku: Option<String>,
    pub variant_id: Option<String>,
    pub variant_sku: Option<String>,
    pub variant_title: Option<String>,
}

/// A fulfillment record for a storefront order.
///
/// Fetched live from the marketplace; not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub order_id: OrderId,
    pub fulfillment_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
}
