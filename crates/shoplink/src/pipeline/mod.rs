//! Reconciliation pipeline: extract references, fetch supplier orders,
//! persist and link.
//!
//! # Architecture
//!
//! Each storefront order flows through three stages:
//!
//! 1. Reference extraction from the order note
//!    ([`shoplink_core::extract_references`])
//! 2. Concurrent supplier fetch with retry ([`Fetcher`])
//! 3. Idempotent persistence and linking ([`persist_outcomes`])
//!
//! [`reconcile_order`] wires the stages together for one order; the periodic
//! sync and the [`BackfillWalker`] both drive it.

mod fetch;
mod walker;
mod writer;

pub use fetch::{FetchOutcome, Fetcher, RefOutcome};
pub use walker::{BackfillReport, BackfillWalker};
pub use writer::{WriteSummary, persist_outcomes};

use tracing::debug;

use shoplink_core::extract_references;

use crate::models::StorefrontOrder;
use crate::sources::SupplierOrders;
use crate::store::{LedgerStore, StoreError};

/// Reconcile one storefront order against the supplier.
///
/// Extracts supplier references from the order note, fetches each one, and
/// persists and links the results. An order with no note or no references is
/// a no-op returning an empty summary.
///
/// # Errors
///
/// Returns `StoreError` if persistence fails. Fetch failures do not error;
/// they are counted in the returned [`WriteSummary`].
pub async fn reconcile_order<S, L>(
    store: &L,
    fetcher: &Fetcher<S>,
    order: &StorefrontOrder,
) -> Result<WriteSummary, StoreError>
where
    S: SupplierOrders,
    L: LedgerStore + ?Sized,
{
    let references = order
        .note
        .as_deref()
        .map(extract_references)
        .unwrap_or_default();

    if references.is_empty() {
        debug!(order_id = %order.id, "no supplier references in note");
        return Ok(WriteSummary::default());
    }

    let outcomes = fetcher.fetch_all(&references).await;
    persist_outcomes(store, &order.id, outcomes).await
}
