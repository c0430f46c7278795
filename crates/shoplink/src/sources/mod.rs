//! External data sources: marketplace, supplier, and ad platform clients.
//!
//! # Architecture
//!
//! Each collaborator is a trait so the pipeline can run against fakes in
//! tests. The concrete clients pin one response-schema contract each; the
//! reconciliation core never sees a raw API response.
//!
//! - [`MarketplaceOrders`] - storefront orders ([`ShopifyClient`])
//! - [`SupplierOrders`] - drop-ship supplier orders ([`EbayClient`])
//! - [`AdSpend`] - daily advertising spend ([`MetaClient`])

mod ebay;
mod meta;
mod shopify;

pub use ebay::EbayClient;
pub use meta::MetaClient;
pub use shopify::ShopifyClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use shoplink_core::{DisplayNumber, OrderId, SupplierOrderRef};

use crate::models::{DailySpend, FetchedSupplierOrder, Fulfillment, StorefrontOrder};

/// Errors that can occur when calling an external source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connectivity, timeout, or 5xx-class failure. Retryable.
    #[error("transient network error: {0}")]
    Transient(String),

    /// The source has no such resource. Terminal; never retried.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response could not be parsed into the data model. Terminal for
    /// the affected identifier; logged and treated as absent.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Whether the retry policy applies to this error.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            // Timeouts, connection failures, and request errors are all
            // retryable from the caller's point of view.
            Self::Transient(err.to_string())
        }
    }
}

/// The storefront marketplace (collaborator boundary, spec'd read-only).
#[async_trait]
pub trait MarketplaceOrders: Send + Sync {
    /// List the newest orders, newest first.
    async fn list_orders(&self, limit: usize) -> Result<Vec<StorefrontOrder>, SourceError>;

    /// Exact display-number lookup. `None` when the number is a gap.
    async fn order_by_number(
        &self,
        number: DisplayNumber,
    ) -> Result<Option<StorefrontOrder>, SourceError>;

    /// Fulfillment records for an order; empty when none exist yet.
    async fn fulfillments(&self, order_id: &OrderId) -> Result<Vec<Fulfillment>, SourceError>;
}

/// The drop-ship supplier's order API.
#[async_trait]
pub trait SupplierOrders: Send + Sync {
    /// Fetch one supplier order with its items.
    ///
    /// `Ok(None)` means the supplier has no such order (terminal).
    /// `Err(Transient)` is eligible for retry per the orchestrator's policy.
    async fn get_order(
        &self,
        reference: &SupplierOrderRef,
    ) -> Result<Option<FetchedSupplierOrder>, SourceError>;
}

/// The advertising platform's daily spend aggregate.
#[async_trait]
pub trait AdSpend: Send + Sync {
    /// Spend, impressions, and clicks for one date. A day with no delivery
    /// yields a zero aggregate, not an error.
    async fn daily_spend(&self, date: NaiveDate) -> Result<DailySpend, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = SourceError::NotFound("12-34567-89012".to_string());
        assert_eq!(err.to_string(), "not found: 12-34567-89012");

        let err = SourceError::Transient("connection reset".to_string());
        assert_eq!(err.to_string(), "transient network error: connection reset");
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(SourceError::Transient("timeout".into()).is_transient());
        assert!(!SourceError::NotFound("x".into()).is_transient());
        assert!(!SourceError::Malformed("bad json".into()).is_transient());
    }
}
