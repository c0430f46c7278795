//! Domain models persisted by the ledger store.
//!
//! Monetary amounts are `rust_decimal::Decimal` in the currency's standard
//! unit; currencies are ISO 4217 codes as reported by the sources.

mod order;
mod spend;
mod supplier;

pub use order::{Fulfillment, LineItem, StorefrontOrder};
pub use spend::DailySpend;
pub use supplier::{FetchedSupplierOrder, SupplierOrder, SupplierOrderItem, SupplierOrderState};
