//! Shoplink - links storefront orders to the drop-ship supplier orders that
//! fulfill them, and reports day-by-day profitability.
//!
//! # Pipeline
//!
//! The reconciliation pipeline runs in four stages per storefront order:
//!
//! 1. [`shoplink_core::extract_references`] pulls supplier order references
//!    out of the free-text order note.
//! 2. [`pipeline::Fetcher`] fetches the referenced supplier orders
//!    concurrently with bounded retry.
//! 3. [`pipeline::persist_outcomes`] upserts the fetched orders and items by
//!    natural key and links them to the originating storefront order.
//! 4. [`pipeline::BackfillWalker`] drives 1-3 over a display-number range,
//!    newest first, tolerating gaps and per-order failures.
//!
//! [`report::ProfitReporter`] later reads the persisted linkage graph and
//! combines it with ad spend into daily and range-level metrics.
//!
//! All writes are idempotent upserts over natural keys, so an interrupted
//! backfill can be rerun from the same or an earlier display number.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod store;
pub mod sync;
