//! End-to-end reconciliation: sync, retry, backfill, and idempotent re-runs.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use shoplink::config::FetchConfig;
use shoplink::pipeline::{BackfillWalker, Fetcher};
use shoplink::store::{LedgerStore, MemoryStore};
use shoplink::sync::sync_orders;
use shoplink_core::{DisplayNumber, OrderId, SupplierOrderRef};

use shoplink_integration_tests::{
    FakeMarketplace, ScriptedSupplier, SupplierScript, storefront_order, supplier_order,
};

fn reference(value: &str) -> SupplierOrderRef {
    value.parse().unwrap()
}

fn fast_retries() -> FetchConfig {
    FetchConfig {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        multiplier: 2,
        concurrency: 10,
    }
}

#[tokio::test]
async fn sync_links_references_and_rerun_changes_nothing() {
    let marketplace = FakeMarketplace::with_orders(vec![
        storefront_order(1102, dec!(100.00), Some("shipped via 12-34567-89012")),
        storefront_order(1103, dec!(75.00), None),
    ]);
    let supplier = Arc::new(ScriptedSupplier::new(vec![(
        reference("12-34567-89012"),
        SupplierScript::Order(supplier_order("12-34567-89012", dec!(40.00))),
    )]));
    let fetcher = Fetcher::new(Arc::clone(&supplier), fast_retries());
    let store = MemoryStore::new();

    let first = sync_orders(&marketplace, &fetcher, &store, 50).await.unwrap();
    assert_eq!(first.orders_synced, 2);
    assert_eq!(first.writes.created, 1);
    assert_eq!(first.writes.linked, 1);

    let stored = store
        .get_supplier_order(&reference("12-34567-89012"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.storefront_order_id,
        Some(OrderId::new("gid://shopify/Order/1102"))
    );

    // The second run refreshes in place and confirms the existing link.
    let second = sync_orders(&marketplace, &fetcher, &store, 50).await.unwrap();
    assert_eq!(second.writes.created, 0);
    assert_eq!(second.writes.updated, 1);
    assert_eq!(second.writes.already_linked, 1);
}

#[tokio::test]
async fn transient_supplier_failures_recover_within_one_sync() {
    let marketplace = FakeMarketplace::with_orders(vec![storefront_order(
        1102,
        dec!(100.00),
        Some("12-34567-89012"),
    )]);
    let supplier = Arc::new(ScriptedSupplier::new(vec![(
        reference("12-34567-89012"),
        SupplierScript::FlakyThenOrder(2, supplier_order("12-34567-89012", dec!(40.00))),
    )]));
    let fetcher = Fetcher::new(Arc::clone(&supplier), fast_retries());
    let store = MemoryStore::new();

    let report = sync_orders(&marketplace, &fetcher, &store, 50).await.unwrap();

    assert_eq!(report.writes.linked, 1);
    assert_eq!(report.writes.failed, 0);
    assert_eq!(supplier.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn missing_references_stay_candidates_without_storing_anything() {
    let marketplace = FakeMarketplace::with_orders(vec![storefront_order(
        1102,
        dec!(100.00),
        Some("12-34567-89012 and 99-00000-11111"),
    )]);
    let supplier = Arc::new(ScriptedSupplier::new(vec![
        (
            reference("12-34567-89012"),
            SupplierScript::Order(supplier_order("12-34567-89012", dec!(40.00))),
        ),
        (reference("99-00000-11111"), SupplierScript::Missing),
    ]));
    let fetcher = Fetcher::new(Arc::clone(&supplier), fast_retries());
    let store = MemoryStore::new();

    let report = sync_orders(&marketplace, &fetcher, &store, 50).await.unwrap();

    assert_eq!(report.writes.linked, 1);
    assert_eq!(report.writes.absent, 1);
    assert!(
        store
            .get_supplier_order(&reference("99-00000-11111"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn backfill_walks_gaps_and_is_resumable() {
    // 1101 is a gap in the display-number sequence.
    let marketplace = FakeMarketplace::with_orders(vec![
        storefront_order(1100, dec!(50.00), Some("12-34567-89012")),
        storefront_order(1102, dec!(60.00), Some("12-34567-89013")),
    ]);
    let supplier = Arc::new(ScriptedSupplier::new(vec![
        (
            reference("12-34567-89012"),
            SupplierScript::Order(supplier_order("12-34567-89012", dec!(20.00))),
        ),
        (
            reference("12-34567-89013"),
            SupplierScript::Order(supplier_order("12-34567-89013", dec!(25.00))),
        ),
    ]));
    let fetcher = Fetcher::new(Arc::clone(&supplier), fast_retries());
    let store = MemoryStore::new();
    let walker = BackfillWalker::new(&marketplace, &fetcher, &store, DisplayNumber::new(1100));

    let report = walker.run(None, &CancellationToken::new()).await.unwrap();
    assert_eq!(report.visited, 3);
    assert_eq!(report.gaps, 1);
    assert_eq!(report.reconciled, 2);
    assert_eq!(report.writes.linked, 2);

    // Rerunning the same walk only confirms what is already stored.
    let rerun = walker.run(None, &CancellationToken::new()).await.unwrap();
    assert_eq!(rerun.writes.linked, 0);
    assert_eq!(rerun.writes.already_linked, 2);
}
