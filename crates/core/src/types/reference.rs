//! Supplier order references and the note extractor.
//!
//! Supplier order ids have the shape `\d{2}-\d{5}-\d{5}` (e.g.
//! `12-34567-89012`). Customers' order notes carry them as free text;
//! [`extract_references`] pulls them out in order of first occurrence.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Word-bounded so a longer digit run does not yield a spurious match.
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a literal, checked by tests
    Regex::new(r"\b\d{2}-\d{5}-\d{5}\b").unwrap()
});

/// Error returned when a string is not a well-formed supplier order reference.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("not a supplier order reference: {0:?}")]
pub struct ReferenceError(pub String);

/// A supplier-assigned order identifier - the natural key for supplier
/// orders.
///
/// Always in `##-#####-#####` form. A well-formed reference is not guaranteed
/// to exist at the supplier; it is only a candidate until a fetch succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierOrderRef(String);

impl SupplierOrderRef {
    /// Get the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SupplierOrderRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_well_formed(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ReferenceError(s.to_string()))
        }
    }
}

impl std::fmt::Display for SupplierOrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_well_formed(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    matches!(parts.as_slice(),
        [a, b, c] if a.len() == 2 && b.len() == 5 && c.len() == 5
            && parts.iter().all(|p| p.bytes().all(|ch| ch.is_ascii_digit())))
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for SupplierOrderRef {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SupplierOrderRef {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<'_, sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for SupplierOrderRef {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'_, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Extract supplier order references from free text, in order of first
/// occurrence.
///
/// Duplicates are kept: the same reference pasted twice into a note comes
/// back twice. Downstream upserts are idempotent, so re-processing a
/// duplicate is harmless. No existence check is performed here.
#[must_use]
pub fn extract_references(note: &str) -> Vec<SupplierOrderRef> {
    REFERENCE_PATTERN
        .find_iter(note)
        .map(|m| SupplierOrderRef(m.as_str().to_string()))
        .collect()
}
