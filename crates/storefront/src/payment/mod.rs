//! Payment gateways and the order submission flow.
//!
//! The backend opens a payment when it creates an order and hands back a
//! [`PaymentAuthorization`]. A [`PaymentGateway`] turns that authorization
//! into a confirmed transaction; [`PaymentAdapter`] sequences order
//! creation, gateway confirmation, and backend confirmation.
//!
//! - [`stripe`] - Card confirmation against a Stripe `PaymentIntent`
//! - [`paystack`] - Authorize-and-redirect through Paystack checkout
//! - [`adapter`] - The three-stage submission flow

pub mod adapter;
pub mod paystack;
pub mod stripe;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use chophouse_core::{CheckoutError, CheckoutSession, Email, PaymentProvider, Price};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::api::orders::PaymentAuthorization;

pub use adapter::{PaymentAdapter, PlacedOrder, StageFailure};
pub use paystack::{PaystackGateway, RedirectHandler, RedirectOutcome};
pub use stripe::StripeGateway;

// =============================================================================
// Errors
// =============================================================================

/// Errors reported while confirming a payment with a gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway refused the payment and said why.
    #[error("{0}")]
    Declined(String),

    /// The customer abandoned the payment.
    #[error("Payment was cancelled.")]
    Cancelled,

    /// The payment needs a step this client cannot perform.
    #[error("Payment is not complete (status: {0})")]
    Incomplete(String),

    /// The gateway could not be reached.
    #[error("Gateway HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The authorization names a gateway this client has no setup for.
    #[error("{0} payments are not configured")]
    NotConfigured(PaymentProvider),

    /// The amount cannot be expressed in minor units.
    #[error("Invalid payment amount: {0}")]
    InvalidAmount(Decimal),

    /// The gateway answered with something unexpected.
    #[error("Unexpected gateway response: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Message safe to show a customer. Gateway decline reasons are shown
    /// verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Declined(message) => message.clone(),
            Self::Cancelled => self.to_string(),
            Self::Incomplete(_) => {
                "Your payment could not be completed. Please try again or use another card."
                    .to_string()
            }
            Self::Http(_) => {
                "We couldn't reach the payment provider. Please try again.".to_string()
            }
            Self::NotConfigured(_) | Self::InvalidAmount(_) | Self::Parse(_) => {
                "Payment could not be processed. Please try again.".to_string()
            }
        }
    }
}

// =============================================================================
// Gateway contract
// =============================================================================

/// Customer details forwarded to the gateway with a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingDetails {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: BillingAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingAddress {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl BillingDetails {
    /// Billing details from a completed checkout form.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidEmail`] if the email does not parse.
    pub fn from_session(session: &CheckoutSession) -> Result<Self, CheckoutError> {
        let customer = &session.customer_info;
        let delivery = &session.delivery_info;
        Ok(Self {
            name: customer.full_name(),
            email: customer.email()?,
            phone: customer.phone.trim().to_string(),
            address: BillingAddress {
                line1: delivery.address.trim().to_string(),
                city: delivery.city.trim().to_string(),
                state: delivery.state.trim().to_string(),
                postal_code: delivery.zip_code.trim().to_string(),
            },
        })
    }
}

/// A payment the gateway accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Id the backend verifies with the gateway (intent id or reference).
    pub transaction_id: String,
}

/// Client-side confirmation with a payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Confirm the payment the backend opened for an order.
    ///
    /// `amount` is the order total the backend reported.
    async fn confirm(
        &self,
        authorization: &PaymentAuthorization,
        billing: &BillingDetails,
        amount: Price,
    ) -> Result<PaymentConfirmation, GatewayError>;
}

/// Minor units for a gateway call, rejecting non-positive amounts.
pub(crate) fn minor_units(amount: Price) -> Result<i64, GatewayError> {
    amount
        .to_minor_units()
        .filter(|units| *units > 0)
        .ok_or(GatewayError::InvalidAmount(amount.amount))
}

// =============================================================================
// Routing
// =============================================================================

/// Routes each authorization to the gateway it was issued for.
///
/// The backend decides the gateway per order, so the host configures
/// whichever gateways it supports and lets the authorization pick.
pub struct Gateways<R> {
    stripe: Option<StripeGateway>,
    paystack: Option<PaystackGateway<R>>,
}

impl<R> Gateways<R> {
    #[must_use]
    pub const fn new(stripe: Option<StripeGateway>, paystack: Option<PaystackGateway<R>>) -> Self {
        Self { stripe, paystack }
    }
}

#[async_trait]
impl<R: RedirectHandler> PaymentGateway for Gateways<R> {
    async fn confirm(
        &self,
        authorization: &PaymentAuthorization,
        billing: &BillingDetails,
        amount: Price,
    ) -> Result<PaymentConfirmation, GatewayError> {
        match authorization {
            PaymentAuthorization::Stripe { .. } => {
                let gateway = self
                    .stripe
                    .as_ref()
                    .ok_or(GatewayError::NotConfigured(PaymentProvider::Stripe))?;
                gateway.confirm(authorization, billing, amount).await
            }
            PaymentAuthorization::Paystack { .. } => {
                let gateway = self
                    .paystack
                    .as_ref()
                    .ok_or(GatewayError::NotConfigured(PaymentProvider::Paystack))?;
                gateway.confirm(authorization, billing, amount).await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chophouse_core::{CurrencyCode, CustomerInfo, DeliveryInfo};
    use secrecy::SecretString;

    use super::testing::ScriptedRedirect;
    use super::*;

    #[test]
    fn test_billing_details_from_session() {
        let mut session = CheckoutSession::new();
        session.customer_info = CustomerInfo {
            first_name: " Ada ".to_string(),
            last_name: "Obi".to_string(),
            email: "ADA@example.com".to_string(),
            phone: "08012345678".to_string(),
        };
        session.delivery_info = DeliveryInfo {
            address: "12 Marina Rd".to_string(),
            city: "Lagos".to_string(),
            state: "LA".to_string(),
            zip_code: "101001".to_string(),
            instructions: None,
        };

        let billing = BillingDetails::from_session(&session).unwrap();
        assert_eq!(billing.name, "Ada Obi");
        assert_eq!(billing.email.as_str(), "ada@example.com");
        assert_eq!(billing.address.postal_code, "101001");
    }

    #[test]
    fn test_minor_units_rejects_zero() {
        assert_eq!(
            minor_units(Price::new(Decimal::new(250_050, 2), CurrencyCode::NGN)).unwrap(),
            250_050
        );
        assert!(matches!(
            minor_units(Price::zero(CurrencyCode::NGN)),
            Err(GatewayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_declined_message_is_verbatim() {
        let err = GatewayError::Declined("Your card has insufficient funds.".to_string());
        assert_eq!(err.user_message(), "Your card has insufficient funds.");
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_is_reported() {
        let gateways: Gateways<ScriptedRedirect> = Gateways::new(None, None);
        let authorization = PaymentAuthorization::Stripe {
            client_secret: SecretString::from("pi_1_secret_2".to_string()),
            publishable_key: None,
        };
        let billing = BillingDetails {
            name: "Ada Obi".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            phone: String::new(),
            address: BillingAddress {
                line1: "12 Marina Rd".to_string(),
                city: "Lagos".to_string(),
                state: "LA".to_string(),
                postal_code: "101001".to_string(),
            },
        };

        let err = gateways
            .confirm(
                &authorization,
                &billing,
                Price::new(Decimal::from(20), CurrencyCode::NGN),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::NotConfigured(PaymentProvider::Stripe)
        ));
    }
}
