//! Order placement and tracking.
//!
//! # Order file
//!
//! ```json
//! {
//!   "items": [{ "product_id": 3, "quantity": 2 }],
//!   "customer": {
//!     "first_name": "Ada", "last_name": "Obi",
//!     "email": "ada@example.com", "phone": "08012345678"
//!   },
//!   "delivery": {
//!     "address": "12 Marina Rd", "city": "Lagos", "state": "LA",
//!     "zip_code": "101001", "instructions": "Call on arrival"
//!   }
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use chophouse_core::{CustomerInfo, DeliveryInfo, OrderId, OrderLine};
use chophouse_storefront::payment::{
    Gateways, PaystackGateway, RedirectHandler, RedirectOutcome, StripeGateway,
};
use chophouse_storefront::{ApiClient, Storefront, StorefrontConfig};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use super::{CliError, output};

#[derive(Debug, Deserialize)]
struct OrderFile {
    items: Vec<OrderLine>,
    customer: CustomerInfo,
    delivery: DeliveryInfo,
}

/// Paystack redirect completed by pasting the reference back on stdin.
struct StdinRedirect;

#[async_trait]
impl RedirectHandler for StdinRedirect {
    async fn authorize(&self, authorization_url: &Url, reference: &str) -> RedirectOutcome {
        output::line(&format!("Complete payment at: {authorization_url}"));
        output::line(&format!(
            "Then paste the reference ({reference}) and press Enter, or press Enter to cancel:"
        ));

        let mut input = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut input).await {
            Ok(_) if input.trim().is_empty() => RedirectOutcome::Cancelled,
            Ok(_) => RedirectOutcome::Completed {
                reference: input.trim().to_string(),
            },
            Err(e) => RedirectOutcome::Failed {
                message: format!("Could not read the payment reference: {e}"),
            },
        }
    }
}

/// Check out the cart described in `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a product cannot be
/// loaded, a checkout form is incomplete, or the order is not placed.
pub async fn place(
    api: &ApiClient,
    config: &StorefrontConfig,
    path: &Path,
    card_token: String,
) -> Result<(), CliError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let file: OrderFile = serde_json::from_str(&text)?;

    let stripe = config
        .stripe
        .as_ref()
        .map(|stripe| StripeGateway::new(stripe, card_token))
        .transpose()?;
    let paystack = config
        .paystack
        .as_ref()
        .map(|_| PaystackGateway::new(StdinRedirect));
    let mut store = Storefront::new(api.clone(), Gateways::new(stripe, paystack), api.currency());

    for line in &file.items {
        let product = api.get_product(line.product_id).await?;
        if !product.is_available {
            tracing::warn!(product_id = %product.id, "Ordering a product marked unavailable");
        }
        store.add_to_cart(&product, line.quantity);
    }

    store.begin_checkout()?;
    if let Some(session) = store.checkout_mut() {
        session.customer_info = file.customer;
        session.delivery_info = file.delivery;
    }
    store.next_step()?;
    store.next_step()?;

    output::line(&format!(
        "Placing order for {} item(s), total {}",
        store.cart().item_count(),
        store.cart_total()
    ));

    let result = store.place_order().await;
    if !result.success {
        return Err(CliError::Rejected(result.message));
    }
    output::line(&result.message);
    output::json(&result)
}

/// Show an order's status and lines.
///
/// # Errors
///
/// Returns an error if the order does not exist or the request fails.
pub async fn status(api: &ApiClient, id: OrderId) -> Result<(), CliError> {
    let order = api.order(id).await?;
    output::line(&format!(
        "Order #{} for {} {}: {} ({})",
        order.id,
        order.first_name,
        order.last_name,
        order.status,
        chophouse_core::Price::new(order.total_amount, api.currency())
    ));
    for item in &order.items {
        output::line(&format!(
            "  {} x {} @ {}",
            item.quantity, item.product_name, item.price
        ));
    }
    Ok(())
}
