//! Shared newtype wrappers.
//!
//! These exist so that storefront order ids, display numbers, and supplier
//! order references cannot be mixed up or passed around as bare strings.

mod id;
mod reference;

pub use id::{DisplayNumber, OrderId};
pub use reference::{ReferenceError, SupplierOrderRef, extract_references};
