//! Order creation and payment confirmation.
//!
//! Creating an order also opens a payment with the gateway on the backend;
//! the response carries the authorization the client needs to collect the
//! payment. The backend marks the order paid only after
//! [`OrderApi::confirm_payment`].

use async_trait::async_trait;
use chophouse_core::{
    Cart, CheckoutError, CheckoutSession, Email, OrderId, OrderLine, OrderStatus, ProductId,
    validate_customer_info, validate_delivery_info,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use super::{ApiClient, ApiError};

// =============================================================================
// Trait
// =============================================================================

/// The two order endpoints the payment flow depends on.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Create a pending order and open a payment for it.
    async fn create_order(&self, order: &NewOrder) -> Result<CreatedOrder, ApiError>;

    /// Tell the backend the gateway accepted `transaction_id` for `order_id`.
    /// Returns the backend's confirmation message.
    async fn confirm_payment(
        &self,
        order_id: OrderId,
        transaction_id: &str,
    ) -> Result<String, ApiError>;
}

// =============================================================================
// Wire types
// =============================================================================

/// Body of `POST /api/orders/`.
///
/// `total_amount` is informational; the backend prices each line itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub delivery_instructions: Option<String>,
    pub total_amount: Decimal,
    pub items: Vec<OrderLine>,
}

impl NewOrder {
    /// Build an order from a checkout session and the cart it is paying for.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] if the cart is empty or either form is
    /// incomplete.
    pub fn from_checkout(session: &CheckoutSession, cart: &Cart) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let customer = &session.customer_info;
        let delivery = &session.delivery_info;
        validate_customer_info(customer)?;
        validate_delivery_info(delivery)?;

        Ok(Self {
            first_name: customer.first_name.trim().to_string(),
            last_name: customer.last_name.trim().to_string(),
            email: customer.email()?,
            phone: customer.phone.trim().to_string(),
            address: delivery.address.trim().to_string(),
            city: delivery.city.trim().to_string(),
            state: delivery.state.trim().to_string(),
            zip_code: delivery.zip_code.trim().to_string(),
            delivery_instructions: delivery.instructions().map(str::to_string),
            total_amount: cart.total().round_dp(2),
            items: cart.order_lines(),
        })
    }
}

/// A line of a stored order, priced by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductId,
    #[serde(default)]
    pub product_name: String,
    pub quantity: u32,
    pub price: Decimal,
}

/// An order as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// What the client needs to collect payment for a new order.
#[derive(Clone)]
pub enum PaymentAuthorization {
    /// Confirm a Stripe `PaymentIntent` client-side.
    Stripe {
        client_secret: SecretString,
        /// Key the backend created the intent under, if it said.
        publishable_key: Option<String>,
    },
    /// Send the customer to Paystack's hosted checkout.
    Paystack {
        authorization_url: Url,
        reference: String,
    },
}

impl PaymentAuthorization {
    /// Stripe `PaymentIntent` id (`pi_...`), taken from the client secret.
    #[must_use]
    pub fn payment_intent_id(&self) -> Option<&str> {
        match self {
            Self::Stripe { client_secret, .. } => client_secret
                .expose_secret()
                .split_once("_secret_")
                .map(|(id, _)| id),
            Self::Paystack { .. } => None,
        }
    }
}

impl std::fmt::Debug for PaymentAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stripe {
                publishable_key, ..
            } => f
                .debug_struct("Stripe")
                .field("client_secret", &"[REDACTED]")
                .field("publishable_key", publishable_key)
                .finish(),
            Self::Paystack {
                authorization_url,
                reference,
            } => f
                .debug_struct("Paystack")
                .field("authorization_url", &authorization_url.as_str())
                .field("reference", reference)
                .finish(),
        }
    }
}

/// Response of `POST /api/orders/`.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order: Order,
    pub authorization: PaymentAuthorization,
}

#[derive(Debug, Deserialize)]
struct CreatedOrderBody {
    order: Order,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    publishable_key: Option<String>,
    #[serde(default)]
    authorization_url: Option<Url>,
    #[serde(default)]
    reference: Option<String>,
}

impl TryFrom<CreatedOrderBody> for CreatedOrder {
    type Error = ApiError;

    fn try_from(body: CreatedOrderBody) -> Result<Self, Self::Error> {
        let authorization = match (body.client_secret, body.authorization_url, body.reference) {
            (Some(secret), _, _) if !secret.is_empty() => PaymentAuthorization::Stripe {
                client_secret: SecretString::from(secret),
                publishable_key: body.publishable_key.filter(|k| !k.is_empty()),
            },
            (_, Some(authorization_url), Some(reference)) => PaymentAuthorization::Paystack {
                authorization_url,
                reference,
            },
            _ => {
                return Err(ApiError::Parse(format!(
                    "order {} was created without a payment authorization",
                    body.order.id
                )));
            }
        };
        Ok(Self {
            order: body.order,
            authorization,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ConfirmationBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// =============================================================================
// Endpoints
// =============================================================================

#[async_trait]
impl OrderApi for ApiClient {
    #[instrument(skip(self, order), fields(email = %order.email, total = %order.total_amount, lines = order.items.len()))]
    async fn create_order(&self, order: &NewOrder) -> Result<CreatedOrder, ApiError> {
        let body: CreatedOrderBody = self.post_json("api/orders/", order).await?;
        let created = CreatedOrder::try_from(body)?;
        tracing::info!(order_id = %created.order.id, "Order created");
        Ok(created)
    }

    #[instrument(skip(self, transaction_id), fields(order_id = %order_id))]
    async fn confirm_payment(
        &self,
        order_id: OrderId,
        transaction_id: &str,
    ) -> Result<String, ApiError> {
        let body: ConfirmationBody = self
            .post_json(
                &format!("api/orders/{order_id}/confirm_payment/"),
                &serde_json::json!({ "payment_intent_id": transaction_id }),
            )
            .await?;

        if !body.success {
            return Err(ApiError::Api {
                status: 200,
                message: body
                    .error
                    .or(body.message)
                    .unwrap_or_else(|| "Payment not completed".to_string()),
            });
        }

        tracing::info!("Payment confirmed by backend");
        Ok(body
            .message
            .unwrap_or_else(|| "Payment confirmed and order placed successfully!".to_string()))
    }
}

impl ApiClient {
    /// Look up an order for tracking.
    ///
    /// # Errors
    ///
    /// Returns an error if the order does not exist or the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.get_json(&format!("api/orders/{id}/"), &[]).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chophouse_core::{CartItem, CustomerInfo, DeliveryInfo};

    use super::*;

    fn order_json() -> serde_json::Value {
        serde_json::json!({
            "id": 41, "first_name": "Ada", "last_name": "Obi", "email": "ada@example.com",
            "phone": "08012345678", "address": "12 Marina Rd", "city": "Lagos",
            "state": "LA", "zip_code": "101001", "delivery_instructions": null,
            "total_amount": "25.00", "status": "pending",
            "items": [{"id": 1, "product": 1, "product_name": "Puff Puff", "quantity": 2, "price": "10.00"}],
            "created_at": "2025-05-01T18:30:00Z"
        })
    }

    #[test]
    fn test_stripe_authorization() {
        let body: CreatedOrderBody = serde_json::from_value(serde_json::json!({
            "order": order_json(),
            "client_secret": "pi_3Nx_secret_abc",
            "publishable_key": "pk_test_123"
        }))
        .unwrap();
        let created = CreatedOrder::try_from(body).unwrap();

        assert_eq!(created.order.id, OrderId::new(41));
        assert_eq!(created.order.status, OrderStatus::Pending);
        assert_eq!(created.authorization.payment_intent_id(), Some("pi_3Nx"));
        assert!(!format!("{:?}", created.authorization).contains("secret_abc"));
    }

    #[test]
    fn test_paystack_authorization() {
        let body: CreatedOrderBody = serde_json::from_value(serde_json::json!({
            "order": order_json(),
            "authorization_url": "https://checkout.paystack.com/abc",
            "reference": "CHOPHOUSE_41"
        }))
        .unwrap();
        let created = CreatedOrder::try_from(body).unwrap();
        assert!(matches!(
            created.authorization,
            PaymentAuthorization::Paystack { ref reference, .. } if reference == "CHOPHOUSE_41"
        ));
    }

    #[test]
    fn test_missing_authorization_is_a_parse_error() {
        let body: CreatedOrderBody =
            serde_json::from_value(serde_json::json!({ "order": order_json() })).unwrap();
        assert!(matches!(
            CreatedOrder::try_from(body),
            Err(ApiError::Parse(_))
        ));
    }

    #[test]
    fn test_new_order_from_checkout() {
        let mut cart = Cart::new();
        cart.add_item(
            &CartItem {
                product_id: ProductId::new(1),
                name: "Puff Puff".to_string(),
                unit_price: Decimal::from(10),
                quantity: 1,
            },
            2,
        );
        let mut session = CheckoutSession::new();
        session.customer_info = CustomerInfo {
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            email: "Ada@Example.com".to_string(),
            phone: "08012345678".to_string(),
        };
        session.delivery_info = DeliveryInfo {
            address: "12 Marina Rd".to_string(),
            city: "Lagos".to_string(),
            state: "LA".to_string(),
            zip_code: "101001".to_string(),
            instructions: Some("Call on arrival".to_string()),
        };

        let order = NewOrder::from_checkout(&session, &cart).unwrap();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["total_amount"], "20");
        assert_eq!(json["delivery_instructions"], "Call on arrival");
        assert_eq!(
            json["items"],
            serde_json::json!([{"product_id": 1, "quantity": 2}])
        );

        assert_eq!(
            NewOrder::from_checkout(&session, &Cart::new()),
            Err(CheckoutError::EmptyCart)
        );
    }
}
