//! Paystack authorize-and-redirect.
//!
//! The backend initializes the transaction and returns a hosted checkout
//! URL plus a reference. Sending the customer there and waiting for them
//! to come back is the host's job, expressed as a [`RedirectHandler`].

use async_trait::async_trait;
use chophouse_core::{PaymentProvider, Price};
use tracing::instrument;
use url::Url;

use super::{BillingDetails, GatewayError, PaymentConfirmation, PaymentGateway, minor_units};
use crate::api::orders::PaymentAuthorization;

/// How a hosted-checkout redirect ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Paystack redirected back with this transaction reference.
    Completed { reference: String },
    /// The customer closed the checkout.
    Cancelled,
    /// Paystack reported a failure.
    Failed { message: String },
}

/// Host capability that sends the customer to a hosted checkout page.
#[async_trait]
pub trait RedirectHandler: Send + Sync {
    /// Open `authorization_url` and wait for the customer to finish.
    async fn authorize(&self, authorization_url: &Url, reference: &str) -> RedirectOutcome;
}

/// Paystack gateway driven by a host redirect handler.
#[derive(Debug, Clone)]
pub struct PaystackGateway<R> {
    handler: R,
}

impl<R> PaystackGateway<R> {
    #[must_use]
    pub const fn new(handler: R) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<R: RedirectHandler> PaymentGateway for PaystackGateway<R> {
    #[instrument(skip_all, fields(reference = tracing::field::Empty, amount = %amount))]
    async fn confirm(
        &self,
        authorization: &PaymentAuthorization,
        _billing: &BillingDetails,
        amount: Price,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let PaymentAuthorization::Paystack {
            authorization_url,
            reference,
        } = authorization
        else {
            return Err(GatewayError::NotConfigured(PaymentProvider::Stripe));
        };
        tracing::Span::current().record("reference", reference.as_str());
        minor_units(amount)?;

        match self.handler.authorize(authorization_url, reference).await {
            RedirectOutcome::Completed { reference: returned } if returned == *reference => {
                tracing::info!("Paystack checkout completed");
                Ok(PaymentConfirmation {
                    transaction_id: returned,
                })
            }
            RedirectOutcome::Completed { reference: returned } => {
                tracing::warn!(returned = %returned, "Paystack returned a different reference");
                Err(GatewayError::Parse(format!(
                    "expected reference {reference}, got {returned}"
                )))
            }
            RedirectOutcome::Cancelled => {
                tracing::info!("Paystack checkout cancelled");
                Err(GatewayError::Cancelled)
            }
            RedirectOutcome::Failed { message } => {
                tracing::warn!(message = %message, "Paystack checkout failed");
                Err(GatewayError::Declined(message))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chophouse_core::{CurrencyCode, Email};
    use rust_decimal::Decimal;

    use super::*;
    use crate::payment::BillingAddress;
    use crate::payment::testing::ScriptedRedirect;

    fn authorization() -> PaymentAuthorization {
        PaymentAuthorization::Paystack {
            authorization_url: Url::parse("https://checkout.paystack.com/abc").unwrap(),
            reference: "CHOPHOUSE_41".to_string(),
        }
    }

    fn billing() -> BillingDetails {
        BillingDetails {
            name: "Ada Obi".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            phone: String::new(),
            address: BillingAddress {
                line1: "12 Marina Rd".to_string(),
                city: "Lagos".to_string(),
                state: "LA".to_string(),
                postal_code: "101001".to_string(),
            },
        }
    }

    fn amount() -> Price {
        Price::new(Decimal::from(2500), CurrencyCode::NGN)
    }

    #[tokio::test]
    async fn test_completed_redirect_confirms() {
        let gateway = PaystackGateway::new(ScriptedRedirect::new(RedirectOutcome::Completed {
            reference: "CHOPHOUSE_41".to_string(),
        }));
        let confirmation = gateway
            .confirm(&authorization(), &billing(), amount())
            .await
            .unwrap();
        assert_eq!(confirmation.transaction_id, "CHOPHOUSE_41");
        assert_eq!(
            gateway.handler.visited(),
            vec!["https://checkout.paystack.com/abc".to_string()]
        );
    }

    #[tokio::test]
    async fn test_cancelled_redirect() {
        let gateway = PaystackGateway::new(ScriptedRedirect::new(RedirectOutcome::Cancelled));
        assert!(matches!(
            gateway.confirm(&authorization(), &billing(), amount()).await,
            Err(GatewayError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_mismatched_reference_is_rejected() {
        let gateway = PaystackGateway::new(ScriptedRedirect::new(RedirectOutcome::Completed {
            reference: "SOMETHING_ELSE".to_string(),
        }));
        assert!(matches!(
            gateway.confirm(&authorization(), &billing(), amount()).await,
            Err(GatewayError::Parse(_))
        ));
    }
}
