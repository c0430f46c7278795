//! Advertising spend models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily advertising spend aggregate for one date.
///
/// An external aggregate written by the ad-spend sync and read by the
/// profitability aggregator; this subsystem never mutates a stored day other
/// than replacing it wholesale on re-sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySpend {
    pub date: NaiveDate,
    pub spend: Decimal,
    pub impressions: i64,
    pub clicks: i64,
}
