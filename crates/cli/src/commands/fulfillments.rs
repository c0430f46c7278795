//! Fulfillment lookup command.

use shoplink::config::AppConfig;
use shoplink::sources::{MarketplaceOrders, ShopifyClient};
use shoplink_core::DisplayNumber;

/// Print fulfillment records for the order with the given display number.
pub async fn run(number: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let marketplace = ShopifyClient::new(&config.shopify);

    let number = DisplayNumber::new(number);
    let Some(order) = marketplace.order_by_number(number).await? else {
        return Err(format!("no order with number {number}").into());
    };

    let fulfillments = marketplace.fulfillments(&order.id).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{number} ({})", order.id);
        if fulfillments.is_empty() {
            println!("  no fulfillments yet");
        }
        for f in &fulfillments {
            let created = f
                .created_at
                .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());
            println!(
                "  {}  created {}  tracking {} {}",
                f.fulfillment_id,
                created,
                f.tracking_number.as_deref().unwrap_or("-"),
                f.tracking_url.as_deref().unwrap_or(""),
            );
        }
    }
    Ok(())
}
