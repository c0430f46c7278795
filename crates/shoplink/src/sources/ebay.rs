//! eBay supplier order client.
//!
//! One pinned response contract: the purchase-order endpoint. The supplier
//! API has several endpoints returning different layouts for "the same"
//! order; the reconciliation core only ever sees [`FetchedSupplierOrder`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, instrument};

use shoplink_core::SupplierOrderRef;

use crate::config::EbayConfig;
use crate::models::{FetchedSupplierOrder, SupplierOrder, SupplierOrderItem};
use crate::sources::{SourceError, SupplierOrders};

/// Client for the supplier's order lookup API.
#[derive(Clone)]
pub struct EbayClient {
    client: reqwest::Client,
    api_base: String,
    oauth_token: String,
}

impl EbayClient {
    /// Create a new supplier API client.
    #[must_use]
    pub fn new(config: &EbayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            oauth_token: config.oauth_token.expose_secret().to_string(),
        }
    }
}

#[async_trait::async_trait]
impl SupplierOrders for EbayClient {
    #[instrument(skip(self), fields(reference = %reference))]
    async fn get_order(
        &self,
        reference: &SupplierOrderRef,
    ) -> Result<Option<FetchedSupplierOrder>, SourceError> {
        let url = format!(
            "{}/buy/order/v2/purchase_order/{}",
            self.api_base,
            reference.as_str()
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.oauth_token)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            debug!("supplier has no such order");
            return Ok(None);
        }
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(SourceError::Transient(format!("supplier returned {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Malformed(format!("supplier returned {status}")));
        }

        let body: PurchaseOrderResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        Ok(Some(convert_purchase_order(reference.clone(), body)?))
    }
}

// =============================================================================
// Pinned response shape
// =============================================================================

#[derive(Debug, Deserialize)]
struct PurchaseOrderResponse {
    #[serde(rename = "orderStatus")]
    order_status: String,
    #[serde(rename = "total")]
    total: MoneyValue,
    #[serde(rename = "creationDate")]
    creation_date: DateTime<Utc>,
    #[serde(rename = "paymentStatus", default = "default_payment_status")]
    payment_status: String,
    #[serde(rename = "lineItems", default)]
    line_items: Vec<PurchaseOrderItem>,
}

fn default_payment_status() -> String {
    "Completed".to_string()
}

#[derive(Debug, Deserialize)]
struct MoneyValue {
    value: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct PurchaseOrderItem {
    #[serde(rename = "itemId")]
    item_id: String,
    title: String,
    #[serde(rename = "price")]
    price: MoneyValue,
    #[serde(default = "default_quantity")]
    quantity: i32,
    #[serde(rename = "sellerId", default)]
    seller_id: Option<String>,
    #[serde(rename = "transactionId", default)]
    transaction_id: Option<String>,
    #[serde(rename = "shippingCost", default)]
    shipping_cost: Option<MoneyValue>,
    #[serde(rename = "actualShippingCost", default)]
    actual_shipping_cost: Option<MoneyValue>,
}

const fn default_quantity() -> i32 {
    1
}

// =============================================================================
// Conversions
// =============================================================================

fn convert_purchase_order(
    reference: SupplierOrderRef,
    body: PurchaseOrderResponse,
) -> Result<FetchedSupplierOrder, SourceError> {
    let items = body
        .line_items
        .into_iter()
        .map(|item| convert_item(&reference, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FetchedSupplierOrder {
        order: SupplierOrder {
            reference,
            status: body.order_status,
            total: parse_value(&body.total)?,
            currency: body.total.currency,
            created_at: body.creation_date,
            payment_status: body.payment_status,
            // Linkage is established by the writer, never by the source.
            storefront_order_id: None,
        },
        items,
    })
}

fn convert_item(
    reference: &SupplierOrderRef,
    item: PurchaseOrderItem,
) -> Result<SupplierOrderItem, SourceError> {
    let shipping_cost = item.shipping_cost.as_ref().map(parse_value).transpose()?;
    let actual_shipping_cost = item
        .actual_shipping_cost
        .as_ref()
        .map(parse_value)
        .transpose()?;

    Ok(SupplierOrderItem {
        reference: reference.clone(),
        item_id: item.item_id,
        title: item.title,
        unit_price: parse_value(&item.price)?,
        quantity: item.quantity,
        seller_id: item.seller_id.unwrap_or_else(|| "unknown".to_string()),
        transaction_id: item.transaction_id.unwrap_or_default(),
        shipping_cost,
        actual_shipping_cost,
    })
}

fn parse_value(money: &MoneyValue) -> Result<Decimal, SourceError> {
    Decimal::from_str(&money.value)
        .map_err(|_| SourceError::Malformed(format!("unparseable amount: {:?}", money.value)))
}
