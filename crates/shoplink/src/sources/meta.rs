//! Meta (Facebook/Instagram) ad spend client.
//!
//! Reads the Insights API at account level with a single-day time range.
//! Days with no ad delivery come back as an empty `data` array, which we
//! report as a zero aggregate rather than an error.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use crate::config::MetaConfig;
use crate::models::DailySpend;
use crate::sources::{AdSpend, SourceError};

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";

/// Client for the ad platform's daily insights.
#[derive(Clone)]
pub struct MetaClient {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
    ad_account_id: String,
}

impl MetaClient {
    /// Create a new insights client.
    #[must_use]
    pub fn new(config: &MetaConfig) -> Self {
        Self::with_base(config, GRAPH_API_BASE)
    }

    fn with_base(config: &MetaConfig, api_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.expose_secret().to_string(),
            ad_account_id: config.ad_account_id.clone(),
        }
    }
}

#[async_trait::async_trait]
impl AdSpend for MetaClient {
    #[instrument(skip(self), fields(date = %date))]
    async fn daily_spend(&self, date: NaiveDate) -> Result<DailySpend, SourceError> {
        let url = format!("{}/{}/insights", self.api_base, self.ad_account_id);
        let day = date.format("%Y-%m-%d").to_string();
        let time_range = format!("{{\"since\":\"{day}\",\"until\":\"{day}\"}}");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("fields", "spend,impressions,clicks"),
                ("time_range", time_range.as_str()),
                ("level", "account"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(SourceError::Transient(format!(
                "ad platform returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Malformed(format!(
                "ad platform returned {status}"
            )));
        }

        let body: InsightsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        convert_insights(date, body)
    }
}

// =============================================================================
// Pinned response shape
// =============================================================================

#[derive(Debug, Deserialize)]
struct InsightsResponse {
    #[serde(default)]
    data: Vec<InsightsRow>,
}

#[derive(Debug, Deserialize)]
struct InsightsRow {
    #[serde(default)]
    spend: Option<String>,
    #[serde(default)]
    impressions: Option<String>,
    #[serde(default)]
    clicks: Option<String>,
}

fn convert_insights(date: NaiveDate, body: InsightsResponse) -> Result<DailySpend, SourceError> {
    let mut aggregate = DailySpend {
        date,
        spend: Decimal::ZERO,
        impressions: 0,
        clicks: 0,
    };

    // Account-level insights return at most one row per day, but sum anyway
    // in case the API splits by attribution window.
    for row in body.data {
        if let Some(raw) = &row.spend {
            aggregate.spend += Decimal::from_str(raw)
                .map_err(|_| SourceError::Malformed(format!("unparseable spend: {raw:?}")))?;
        }
        aggregate.impressions += parse_count(row.impressions.as_deref())?;
        aggregate.clicks += parse_count(row.clicks.as_deref())?;
    }

    Ok(aggregate)
}

fn parse_count(raw: Option<&str>) -> Result<i64, SourceError> {
    match raw {
        None => Ok(0),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| SourceError::Malformed(format!("unparseable count: {raw:?}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 10).unwrap()
    }

    #[test]
    fn test_convert_insights_row() {
        let body: InsightsResponse = serde_json::from_value(json!({
            "data": [{
                "spend": "20.00",
                "impressions": "15000",
                "clicks": "320",
                "date_start": "2025-02-10",
                "date_stop": "2025-02-10"
            }]
        }))
        .unwrap();

        let spend = convert_insights(day(), body).unwrap();
        assert_eq!(spend.date, day());
        assert_eq!(spend.spend, Decimal::new(2000, 2));
        assert_eq!(spend.impressions, 15000);
        assert_eq!(spend.clicks, 320);
    }

    #[test]
    fn test_empty_data_is_zero_aggregate() {
        let body: InsightsResponse = serde_json::from_value(json!({ "data": [] })).unwrap();

        let spend = convert_insights(day(), body).unwrap();
        assert_eq!(spend.spend, Decimal::ZERO);
        assert_eq!(spend.impressions, 0);
        assert_eq!(spend.clicks, 0);
    }

    #[test]
    fn test_bad_spend_is_malformed() {
        let body: InsightsResponse = serde_json::from_value(json!({
            "data": [{ "spend": "a lot" }]
        }))
        .unwrap();

        let err = convert_insights(day(), body).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
