//! Persistence of fetch outcomes: idempotent upserts plus linking.

use tracing::{instrument, warn};

use shoplink_core::OrderId;

use crate::pipeline::fetch::{FetchOutcome, RefOutcome};
use crate::store::{LedgerStore, LinkOutcome, StoreError, UpsertOutcome};

/// Counters from persisting one order's fetch outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// References processed (every outcome, whatever it was).
    pub references: usize,
    /// Supplier orders stored for the first time.
    pub created: usize,
    /// Supplier orders refreshed in place.
    pub updated: usize,
    /// References the supplier had no order for.
    pub absent: usize,
    /// References whose fetch failed after every retry.
    pub failed: usize,
    /// Links established this run.
    pub linked: usize,
    /// Links that already pointed at this order.
    pub already_linked: usize,
    /// References already linked to a different order; their links were kept.
    pub conflicts: usize,
}

impl WriteSummary {
    /// Merge another summary into this one.
    pub fn absorb(&mut self, other: Self) {
        self.references += other.references;
        self.created += other.created;
        self.updated += other.updated;
        self.absent += other.absent;
        self.failed += other.failed;
        self.linked += other.linked;
        self.already_linked += other.already_linked;
        self.conflicts += other.conflicts;
    }
}

/// Persist fetch outcomes for one storefront order and link each stored
/// supplier order to it.
///
/// Linking never steals: a supplier order already pointing at a different
/// storefront order keeps its link, and the conflict is logged and counted.
///
/// # Errors
///
/// Returns `StoreError` if an upsert or link write fails.
#[instrument(skip(store, outcomes), fields(order_id = %order_id, outcomes = outcomes.len()))]
pub async fn persist_outcomes<L>(
    store: &L,
    order_id: &OrderId,
    outcomes: Vec<RefOutcome>,
) -> Result<WriteSummary, StoreError>
where
    L: LedgerStore + ?Sized,
{
    let mut summary = WriteSummary::default();

    for RefOutcome { reference, outcome } in outcomes {
        summary.references += 1;
        match outcome {
            FetchOutcome::Fetched(fetched) => {
                match store.upsert_supplier_order(&fetched).await? {
                    UpsertOutcome::Created => summary.created += 1,
                    UpsertOutcome::Updated => summary.updated += 1,
                }
                match store.link_supplier_order(&reference, order_id).await? {
                    LinkOutcome::Linked => summary.linked += 1,
                    LinkOutcome::AlreadyLinked => summary.already_linked += 1,
                    LinkOutcome::Conflict { existing } => {
                        warn!(
                            reference = %reference,
                            existing = %existing,
                            "reference already linked to a different order; keeping existing link"
                        );
                        summary.conflicts += 1;
                    }
                }
            }
            FetchOutcome::Absent => summary.absent += 1,
            FetchOutcome::Failed(err) => {
                warn!(reference = %reference, error = %err, "fetch failed; will retry next sync");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use shoplink_core::SupplierOrderRef;

    use crate::models::{FetchedSupplierOrder, SupplierOrder};
    use crate::sources::SourceError;
    use crate::store::MemoryStore;

    fn reference() -> SupplierOrderRef {
        "12-34567-89012".parse().unwrap()
    }

    fn fetched() -> FetchedSupplierOrder {
        FetchedSupplierOrder {
            order: SupplierOrder {
                reference: reference(),
                status: "Completed".to_string(),
                total: dec!(20.00),
                currency: "AUD".to_string(),
                created_at: Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap(),
                payment_status: "Paid".to_string(),
                storefront_order_id: None,
            },
            items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_persist_is_idempotent() {
        let store = MemoryStore::new();
        let order_id = OrderId::new("gid://shopify/Order/1");

        let outcomes = || {
            vec![RefOutcome {
                reference: reference(),
                outcome: FetchOutcome::Fetched(fetched()),
            }]
        };

        let first = persist_outcomes(&store, &order_id, outcomes()).await.unwrap();
        assert_eq!(first.created, 1);
        assert_eq!(first.linked, 1);

        let second = persist_outcomes(&store, &order_id, outcomes()).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 1);
        assert_eq!(second.linked, 0);
        assert_eq!(second.already_linked, 1);
    }

    #[tokio::test]
    async fn test_conflicting_link_is_kept_and_counted() {
        let store = MemoryStore::new();
        let first_order = OrderId::new("gid://shopify/Order/1");
        let second_order = OrderId::new("gid://shopify/Order/2");

        let outcome = |o: FetchOutcome| {
            vec![RefOutcome {
                reference: reference(),
                outcome: o,
            }]
        };

        persist_outcomes(&store, &first_order, outcome(FetchOutcome::Fetched(fetched())))
            .await
            .unwrap();
        let summary = persist_outcomes(
            &store,
            &second_order,
            outcome(FetchOutcome::Fetched(fetched())),
        )
        .await
        .unwrap();

        assert_eq!(summary.conflicts, 1);
        let stored = store.get_supplier_order(&reference()).await.unwrap().unwrap();
        assert_eq!(stored.storefront_order_id, Some(first_order));
    }

    #[tokio::test]
    async fn test_absent_and_failed_store_nothing() {
        let store = MemoryStore::new();
        let order_id = OrderId::new("gid://shopify/Order/1");

        let summary = persist_outcomes(
            &store,
            &order_id,
            vec![
                RefOutcome {
                    reference: reference(),
                    outcome: FetchOutcome::Absent,
                },
                RefOutcome {
                    reference: "99-00000-11111".parse().unwrap(),
                    outcome: FetchOutcome::Failed(SourceError::Transient("timeout".into())),
                },
            ],
        )
        .await
        .unwrap();

        assert_eq!(summary.absent, 1);
        assert_eq!(summary.failed, 1);
        assert!(store.get_supplier_order(&reference()).await.unwrap().is_none());
    }
}
