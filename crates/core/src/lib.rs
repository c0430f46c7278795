//! Shoplink Core - Shared types library.
//!
//! This crate provides common types used across all Shoplink components:
//! - `shoplink` - Reconciliation pipeline, store, and reporting library
//! - `cli` - Command-line driver for sync, backfill, and reports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for order ids, display numbers, and the
//!   supplier order reference (including the note extractor)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
