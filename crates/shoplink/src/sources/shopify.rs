//! Shopify Admin GraphQL client for storefront orders.
//!
//! Hand-written queries with pinned response shapes; everything is converted
//! into [`StorefrontOrder`]/[`Fulfillment`] at this boundary so the
//! reconciliation core stays independent of the API schema.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use shoplink_core::{DisplayNumber, OrderId};

use crate::config::ShopifyConfig;
use crate::models::{Fulfillment, LineItem, StorefrontOrder};
use crate::sources::{MarketplaceOrders, SourceError};

const ORDERS_QUERY: &str = r"
query ($first: Int!, $query: String) {
    orders(first: $first, query: $query, sortKey: ID, reverse: true) {
        edges {
            node {
                id
                name
                email
                createdAt
                totalPriceSet { shopMoney { amount currencyCode } }
                tags
                note
                lineItems(first: 50) {
                    edges {
                        node {
                            title
                            quantity
                            originalUnitPriceSet { shopMoney { amount currencyCode } }
                            sku
                            variant { id sku title }
                        }
                    }
                }
            }
        }
    }
}
";

const FULFILLMENTS_QUERY: &str = r"
query ($id: ID!) {
    order(id: $id) {
        id
        fulfillments {
            id
            createdAt
            trackingInfo { number url }
        }
    }
}
";

/// Client for the Shopify Admin GraphQL API.
#[derive(Clone)]
pub struct ShopifyClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl ShopifyClient {
    /// Create a new Admin API client.
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        let endpoint = format!(
            "https://{}/admin/api/{}/graphql.json",
            config.store, config.api_version
        );

        Self {
            client: reqwest::Client::new(),
            endpoint,
            access_token: config.access_token.expose_secret().to_string(),
        }
    }

    /// Execute a GraphQL query and return the `data` payload.
    async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, SourceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(SourceError::Transient(format!(
                "marketplace returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Malformed(format!(
                "marketplace returned {status}"
            )));
        }

        let body: GraphQLResponse = response.json().await?;

        if let Some(errors) = body.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(SourceError::Malformed(format!(
                "GraphQL errors: {}",
                messages.join("; ")
            )));
        }

        body.data
            .ok_or_else(|| SourceError::Malformed("GraphQL response had no data".to_string()))
    }
}

#[async_trait::async_trait]
impl MarketplaceOrders for ShopifyClient {
    #[instrument(skip(self))]
    async fn list_orders(&self, limit: usize) -> Result<Vec<StorefrontOrder>, SourceError> {
        let data = self
            .execute(ORDERS_QUERY, json!({ "first": limit, "query": null }))
            .await?;

        let orders = parse_orders(data)?;
        debug!(count = orders.len(), "listed marketplace orders");
        Ok(orders)
    }

    #[instrument(skip(self), fields(number = %number))]
    async fn order_by_number(
        &self,
        number: DisplayNumber,
    ) -> Result<Option<StorefrontOrder>, SourceError> {
        // Display-number lookup uses Shopify's name query (`name:#1102`).
        let data = self
            .execute(
                ORDERS_QUERY,
                json!({ "first": 1, "query": format!("name:{number}") }),
            )
            .await?;

        // The name query is a prefix search in some API versions; insist on
        // an exact display-number match.
        Ok(parse_orders(data)?
            .into_iter()
            .find(|order| order.number == number))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn fulfillments(&self, order_id: &OrderId) -> Result<Vec<Fulfillment>, SourceError> {
        let data = self
            .execute(FULFILLMENTS_QUERY, json!({ "id": order_id.as_str() }))
            .await?;

        let parsed: FulfillmentsData = serde_json::from_value(data)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        let Some(order) = parsed.order else {
            return Err(SourceError::NotFound(order_id.to_string()));
        };

        Ok(order
            .fulfillments
            .into_iter()
            .map(|node| {
                let tracking = node.tracking_info.into_iter().next();
                Fulfillment {
                    order_id: OrderId::new(&order.id),
                    fulfillment_id: node.id,
                    created_at: node.created_at,
                    tracking_number: tracking.as_ref().and_then(|t| t.number.clone()),
                    tracking_url: tracking.and_then(|t| t.url),
                }
            })
            .collect())
    }
}

// =============================================================================
// Pinned response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphQLErrorBody>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OrdersData {
    orders: OrderConnection,
}

#[derive(Debug, Deserialize)]
struct OrderConnection {
    edges: Vec<OrderEdge>,
}

#[derive(Debug, Deserialize)]
struct OrderEdge {
    node: OrderNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderNode {
    id: String,
    name: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
    total_price_set: MoneyBag,
    #[serde(default)]
    tags: Vec<String>,
    note: Option<String>,
    line_items: LineItemConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyBag {
    shop_money: Money,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Money {
    amount: String,
    currency_code: String,
}

#[derive(Debug, Deserialize)]
struct LineItemConnection {
    edges: Vec<LineItemEdge>,
}

#[derive(Debug, Deserialize)]
struct LineItemEdge {
    node: LineItemNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItemNode {
    title: String,
    quantity: i32,
    original_unit_price_set: MoneyBag,
    sku: Option<String>,
    variant: Option<VariantNode>,
}

#[derive(Debug, Deserialize)]
struct VariantNode {
    id: String,
    sku: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FulfillmentsData {
    order: Option<FulfillmentOrderNode>,
}

#[derive(Debug, Deserialize)]
struct FulfillmentOrderNode {
    id: String,
    #[serde(default)]
    fulfillments: Vec<FulfillmentNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FulfillmentNode {
    id: String,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    tracking_info: Vec<TrackingInfo>,
}

#[derive(Debug, Deserialize)]
struct TrackingInfo {
    number: Option<String>,
    url: Option<String>,
}

// =============================================================================
// Conversions
// =============================================================================

fn parse_orders(data: serde_json::Value) -> Result<Vec<StorefrontOrder>, SourceError> {
    let parsed: OrdersData =
        serde_json::from_value(data).map_err(|e| SourceError::Malformed(e.to_string()))?;

    parsed
        .orders
        .edges
        .into_iter()
        .map(|edge| convert_order(edge.node))
        .collect()
}

fn convert_order(node: OrderNode) -> Result<StorefrontOrder, SourceError> {
    let number = parse_display_number(&node.name)?;
    let money = node.total_price_set.shop_money;

    let line_items = node
        .line_items
        .edges
        .into_iter()
        .map(|edge| convert_line_item(edge.node))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StorefrontOrder {
        id: OrderId::new(node.id),
        number,
        email: node.email,
        total_price: parse_amount(&money.amount)?,
        currency: money.currency_code,
        created_at: node.created_at,
        tags: node.tags,
        note: node.note,
        line_items,
    })
}

fn convert_line_item(node: LineItemNode) -> Result<LineItem, SourceError> {
    let money = node.original_unit_price_set.shop_money;
    let variant = node.variant;

    Ok(LineItem {
        title: node.title,
        quantity: node.quantity,
        unit_price: parse_amount(&money.amount)?,
        currency: money.currency_code,
        sku: node.sku,
        variant_id: variant.as_ref().map(|v| v.id.clone()),
        variant_sku: variant.as_ref().and_then(|v| v.sku.clone()),
        variant_title: variant.and_then(|v| v.title),
    })
}

/// Display names look like `#1102`; the number is what we walk over.
fn parse_display_number(name: &str) -> Result<DisplayNumber, SourceError> {
    name.trim_start_matches('#')
        .parse::<i64>()
        .map(DisplayNumber::new)
        .map_err(|_| SourceError::Malformed(format!("unparseable order name: {name:?}")))
}

fn parse_amount(amount: &str) -> Result<Decimal, SourceError> {
    Decimal::from_str(amount)
        .map_err(|_| SourceError::Malformed(format!("unparseable amount: {amount:?}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orders_fixture() -> serde_json::Value {
        json!({
            "orders": {
                "edges": [{
                    "node": {
                        "id": "gid://shopify/Order/123",
                        "name": "#1102",
                        "email": "buyer@example.com",
                        "createdAt": "2025-03-01T10:30:00Z",
                        "totalPriceSet": { "shopMoney": { "amount": "49.95", "currencyCode": "AUD" } },
                        "tags": ["vip"],
                        "note": "fulfilled via 12-34567-89012",
                        "lineItems": {
                            "edges": [{
                                "node": {
                                    "title": "Ceramic Mug",
                                    "quantity": 2,
                                    "originalUnitPriceSet": { "shopMoney": { "amount": "19.95", "currencyCode": "AUD" } },
                                    "sku": "MUG-1",
                                    "variant": { "id": "gid://shopify/ProductVariant/9", "sku": "MUG-1-BLUE", "title": "Blue" }
                                }
                            }]
                        }
                    }
                }]
            }
        })
    }

    #[test]
    fn test_parse_orders_fixture() {
        let orders = parse_orders(orders_fixture()).unwrap();
        assert_eq!(orders.len(), 1);

        let order = &orders[0];
        assert_eq!(order.id.as_str(), "gid://shopify/Order/123");
        assert_eq!(order.number, DisplayNumber::new(1102));
        assert_eq!(order.total_price, Decimal::new(4995, 2));
        assert_eq!(order.currency, "AUD");
        assert_eq!(order.note.as_deref(), Some("fulfilled via 12-34567-89012"));

        let item = &order.line_items[0];
        assert_eq!(item.title, "Ceramic Mug");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.variant_sku.as_deref(), Some("MUG-1-BLUE"));
    }

    #[test]
    fn test_parse_orders_rejects_bad_amount() {
        let mut fixture = orders_fixture();
        fixture["orders"]["edges"][0]["node"]["totalPriceSet"]["shopMoney"]["amount"] =
            json!("not-a-number");

        let err = parse_orders(fixture).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn test_parse_display_number() {
        assert_eq!(
            parse_display_number("#1102").unwrap(),
            DisplayNumber::new(1102)
        );
        assert_eq!(
            parse_display_number("1102").unwrap(),
            DisplayNumber::new(1102)
        );
        assert!(parse_display_number("#EXCHANGE").is_err());
    }
}
