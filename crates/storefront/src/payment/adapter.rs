//! Order submission: create, pay, confirm.
//!
//! Each stage is a separate round trip with its own failure variant. The
//! flow never retries and never touches the cart; the caller clears it
//! only after [`PaymentAdapter::submit`] succeeds.

use chophouse_core::{
    Cart, CheckoutError, CheckoutSession, CurrencyCode, OrderId, OrderSummary, Price,
};
use thiserror::Error;
use tracing::instrument;

use super::{BillingDetails, GatewayError, PaymentGateway};
use crate::api::ApiError;
use crate::api::orders::{NewOrder, OrderApi};
use crate::error::add_breadcrumb;

/// Which stage of a submission failed.
#[derive(Debug, Error)]
pub enum StageFailure {
    /// The session was not ready to pay.
    #[error("checkout not ready for payment: {0}")]
    Checkout(#[from] CheckoutError),

    /// The backend did not create the order.
    #[error("order creation failed: {0}")]
    OrderCreation(#[source] ApiError),

    /// The gateway did not accept the payment.
    #[error("payment failed: {0}")]
    Payment(#[source] GatewayError),

    /// The customer paid but the backend did not mark the order paid.
    #[error("order {order_id} was paid ({transaction_id}) but not confirmed: {source}")]
    BackendConfirmation {
        order_id: OrderId,
        transaction_id: String,
        source: ApiError,
    },
}

impl StageFailure {
    /// True when money moved and a human has to reconcile the order.
    #[must_use]
    pub const fn requires_support(&self) -> bool {
        matches!(self, Self::BackendConfirmation { .. })
    }

    /// Message safe to show a customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Checkout(err) => err.to_string(),
            Self::OrderCreation(ApiError::Api { message, .. }) => message.clone(),
            Self::OrderCreation(_) => {
                "We couldn't create your order. Please try again.".to_string()
            }
            Self::Payment(err) => err.user_message(),
            Self::BackendConfirmation {
                order_id,
                transaction_id,
                ..
            } => format!(
                "Your payment was received but we could not confirm order #{order_id}. \
                 Please contact support with payment reference {transaction_id}."
            ),
        }
    }
}

/// A paid and confirmed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub summary: OrderSummary,
    pub transaction_id: String,
    /// Confirmation text from the backend.
    pub message: String,
}

/// Runs the three-stage submission against an order API and a gateway.
#[derive(Debug, Clone)]
pub struct PaymentAdapter<O, G> {
    orders: O,
    gateway: G,
    currency: CurrencyCode,
}

impl<O: OrderApi, G: PaymentGateway> PaymentAdapter<O, G> {
    #[must_use]
    pub const fn new(orders: O, gateway: G, currency: CurrencyCode) -> Self {
        Self {
            orders,
            gateway,
            currency,
        }
    }

    #[must_use]
    pub const fn orders(&self) -> &O {
        &self.orders
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Submit the order for `session` and `cart`.
    ///
    /// On success the session is at `Complete`. On any stage failure after
    /// the lock is taken, the session is `Failed` at `Payment` with the
    /// customer-facing message recorded.
    ///
    /// # Errors
    ///
    /// Returns the [`StageFailure`] of the first stage that failed.
    #[instrument(skip_all, fields(session_id = %session.id(), lines = cart.len()))]
    pub async fn submit(
        &self,
        session: &mut CheckoutSession,
        cart: &Cart,
    ) -> Result<PlacedOrder, StageFailure> {
        session.start_payment(cart)?;
        add_breadcrumb("checkout", "Payment submitted", None);

        match self.run(session, cart).await {
            Ok(placed) => {
                session.complete_payment()?;
                let order_id = placed.summary.id.to_string();
                add_breadcrumb(
                    "checkout",
                    "Order placed",
                    Some(&[("order_id", order_id.as_str())]),
                );
                tracing::info!(
                    order_id = %placed.summary.id,
                    total = %placed.summary.total,
                    "Order placed"
                );
                Ok(placed)
            }
            Err(failure) => {
                if let Err(err) = session.fail_payment(failure.user_message()) {
                    tracing::error!(error = %err, "Checkout session lost its payment lock");
                }
                if failure.requires_support() {
                    let event_id = sentry::capture_error(&failure);
                    tracing::error!(
                        error = %failure,
                        sentry_event_id = %event_id,
                        "Paid order was not confirmed"
                    );
                } else {
                    tracing::warn!(error = %failure, "Order submission failed");
                }
                Err(failure)
            }
        }
    }

    async fn run(&self, session: &CheckoutSession, cart: &Cart) -> Result<PlacedOrder, StageFailure> {
        let new_order = NewOrder::from_checkout(session, cart)?;
        let billing = BillingDetails::from_session(session)?;

        let created = self
            .orders
            .create_order(&new_order)
            .await
            .map_err(StageFailure::OrderCreation)?;
        let order_id = created.order.id;
        let total = created.order.total_amount;
        add_breadcrumb(
            "checkout",
            "Order created",
            Some(&[("order_id", order_id.to_string().as_str())]),
        );

        let confirmation = self
            .gateway
            .confirm(
                &created.authorization,
                &billing,
                Price::new(total, self.currency),
            )
            .await
            .map_err(StageFailure::Payment)?;

        let message = self
            .orders
            .confirm_payment(order_id, &confirmation.transaction_id)
            .await
            .map_err(|source| StageFailure::BackendConfirmation {
                order_id,
                transaction_id: confirmation.transaction_id.clone(),
                source,
            })?;

        Ok(PlacedOrder {
            summary: OrderSummary { id: order_id, total },
            transaction_id: confirmation.transaction_id,
            message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chophouse_core::{
        CartItem, CheckoutStep, CustomerInfo, DeliveryInfo, PaymentState, ProductId,
    };
    use rust_decimal::Decimal;

    use super::*;
    use crate::payment::testing::{InMemoryOrderApi, ScriptedGateway};

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_item(
            &CartItem {
                product_id: ProductId::new(1),
                name: "Jollof Rice".to_string(),
                unit_price: Decimal::from(10),
                quantity: 1,
            },
            2,
        );
        cart
    }

    fn session_at_payment(cart: &Cart) -> CheckoutSession {
        let mut session = CheckoutSession::new();
        session.begin(cart).unwrap();
        session.customer_info = CustomerInfo {
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            email: "ada@example.com".to_string(),
            phone: "08012345678".to_string(),
        };
        session.next_step().unwrap();
        session.delivery_info = DeliveryInfo {
            address: "12 Marina Rd".to_string(),
            city: "Lagos".to_string(),
            state: "LA".to_string(),
            zip_code: "101001".to_string(),
            instructions: None,
        };
        session.next_step().unwrap();
        session
    }

    fn adapter() -> (
        PaymentAdapter<InMemoryOrderApi, ScriptedGateway>,
        InMemoryOrderApi,
        ScriptedGateway,
    ) {
        let orders = InMemoryOrderApi::new();
        let gateway = ScriptedGateway::new();
        (
            PaymentAdapter::new(orders.clone(), gateway.clone(), CurrencyCode::NGN),
            orders,
            gateway,
        )
    }

    #[tokio::test]
    async fn test_successful_submission() {
        let (adapter, orders, gateway) = adapter();
        let cart = cart();
        let mut session = session_at_payment(&cart);

        let placed = adapter.submit(&mut session, &cart).await.unwrap();

        assert_eq!(placed.summary.total, Decimal::from(20));
        assert_eq!(session.step(), CheckoutStep::Complete);
        assert_eq!(session.payment_state(), PaymentState::Succeeded);
        assert_eq!(gateway.charged(), vec![Decimal::from(20)]);
        assert_eq!(
            orders.confirmed(),
            vec![(placed.summary.id, placed.transaction_id.clone())]
        );
    }

    #[tokio::test]
    async fn test_order_creation_failure_shows_server_message() {
        let (adapter, _, gateway) = adapter();
        adapter.orders().set_create_error(400, Some("Product 9 is unavailable"));
        let cart = cart();
        let mut session = session_at_payment(&cart);

        let failure = adapter.submit(&mut session, &cart).await.unwrap_err();

        assert!(matches!(failure, StageFailure::OrderCreation(_)));
        assert_eq!(session.step(), CheckoutStep::Payment);
        assert_eq!(session.payment_state(), PaymentState::Failed);
        assert_eq!(session.error_message(), Some("Product 9 is unavailable"));
        assert!(gateway.charged().is_empty());
    }

    #[tokio::test]
    async fn test_order_creation_server_error_uses_fallback() {
        let (adapter, _, _) = adapter();
        adapter.orders().set_create_error(500, None);
        let cart = cart();
        let mut session = session_at_payment(&cart);

        let failure = adapter.submit(&mut session, &cart).await.unwrap_err();
        assert_eq!(
            failure.user_message(),
            "We couldn't create your order. Please try again."
        );
    }

    #[tokio::test]
    async fn test_gateway_decline_is_verbatim() {
        let (adapter, orders, gateway) = adapter();
        gateway.set_decline_with("Your card has insufficient funds.");
        let cart = cart();
        let mut session = session_at_payment(&cart);

        let failure = adapter.submit(&mut session, &cart).await.unwrap_err();

        assert!(matches!(failure, StageFailure::Payment(_)));
        assert_eq!(
            session.error_message(),
            Some("Your card has insufficient funds.")
        );
        assert!(orders.confirmed().is_empty());
    }

    #[tokio::test]
    async fn test_backend_confirmation_failure_requires_support() {
        let (adapter, orders, _) = adapter();
        orders.set_fail_on_confirm(true);
        let cart = cart();
        let mut session = session_at_payment(&cart);

        let failure = adapter.submit(&mut session, &cart).await.unwrap_err();

        assert!(failure.requires_support());
        assert!(failure.user_message().contains("contact support"));
        assert_eq!(session.payment_state(), PaymentState::Failed);
        assert_eq!(session.step(), CheckoutStep::Payment);
    }

    #[tokio::test]
    async fn test_submission_requires_payment_step() {
        let (adapter, orders, _) = adapter();
        let cart = cart();
        let mut session = CheckoutSession::new();
        session.begin(&cart).unwrap();

        let failure = adapter.submit(&mut session, &cart).await.unwrap_err();

        assert!(matches!(
            failure,
            StageFailure::Checkout(CheckoutError::NotAtPayment(CheckoutStep::CustomerInfo))
        ));
        assert!(orders.created().is_empty());
    }

    #[tokio::test]
    async fn test_retry_after_failure_is_allowed() {
        let (adapter, _, gateway) = adapter();
        gateway.set_decline_with("Declined");
        let cart = cart();
        let mut session = session_at_payment(&cart);
        adapter.submit(&mut session, &cart).await.unwrap_err();

        let (retry_adapter, _, _) = self::adapter();
        retry_adapter.submit(&mut session, &cart).await.unwrap();
        assert_eq!(session.step(), CheckoutStep::Complete);
    }
}
