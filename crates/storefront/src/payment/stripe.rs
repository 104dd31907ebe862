//! Stripe `PaymentIntent` confirmation.
//!
//! Confirms the intent the backend created using the publishable key, the
//! same call Stripe.js makes for `confirmCardPayment`. The card is supplied
//! as a token (`tok_...`) minted by the host.

use async_trait::async_trait;
use chophouse_core::{PaymentProvider, Price};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::{BillingDetails, GatewayError, PaymentConfirmation, PaymentGateway, minor_units};
use crate::api::orders::PaymentAuthorization;
use crate::config::{StripeConfig, normalize_base_url};

/// Longest slice of a Stripe response body written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Stripe gateway authenticated with a publishable key.
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: Url,
    publishable_key: String,
    card_token: String,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_base", &self.api_base.as_str())
            .field("card_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct IntentBody {
    id: String,
    status: String,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    last_payment_error: Option<StripeErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    /// Create a Stripe gateway that pays with `card_token`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig, card_token: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chophouse-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: normalize_base_url(config.api_base.clone()),
            publishable_key: config.publishable_key.clone(),
            card_token: card_token.into(),
        })
    }

    fn confirm_url(&self, intent_id: &str) -> Result<Url, GatewayError> {
        self.api_base
            .join(&format!("v1/payment_intents/{intent_id}/confirm"))
            .map_err(|e| GatewayError::Parse(format!("invalid confirm URL: {e}")))
    }
}

/// Form fields for the confirm call, in Stripe's bracketed notation.
fn confirm_params(
    client_secret: &str,
    card_token: &str,
    billing: &BillingDetails,
) -> Vec<(&'static str, String)> {
    vec![
        ("client_secret", client_secret.to_string()),
        ("payment_method_data[type]", "card".to_string()),
        ("payment_method_data[card][token]", card_token.to_string()),
        ("payment_method_data[billing_details][name]", billing.name.clone()),
        (
            "payment_method_data[billing_details][email]",
            billing.email.to_string(),
        ),
        ("payment_method_data[billing_details][phone]", billing.phone.clone()),
        (
            "payment_method_data[billing_details][address][line1]",
            billing.address.line1.clone(),
        ),
        (
            "payment_method_data[billing_details][address][city]",
            billing.address.city.clone(),
        ),
        (
            "payment_method_data[billing_details][address][state]",
            billing.address.state.clone(),
        ),
        (
            "payment_method_data[billing_details][address][postal_code]",
            billing.address.postal_code.clone(),
        ),
    ]
}

/// Turn a confirm response into a confirmation or a gateway error.
fn interpret(
    status: StatusCode,
    body: &str,
    expected_minor_units: i64,
) -> Result<PaymentConfirmation, GatewayError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or_else(|| format!("Stripe returned HTTP {}", status.as_u16()));
        return Err(GatewayError::Declined(message));
    }

    let intent: IntentBody =
        serde_json::from_str(body).map_err(|e| GatewayError::Parse(e.to_string()))?;

    if let Some(amount) = intent.amount
        && amount != expected_minor_units
    {
        tracing::warn!(
            intent_id = %intent.id,
            intent_amount = amount,
            order_amount = expected_minor_units,
            "PaymentIntent amount differs from order total"
        );
    }

    // The backend confirms only `succeeded` intents; `processing` falls through.
    match intent.status.as_str() {
        "succeeded" => Ok(PaymentConfirmation {
            transaction_id: intent.id,
        }),
        "requires_payment_method" => Err(GatewayError::Declined(
            intent
                .last_payment_error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Your card was declined.".to_string()),
        )),
        "canceled" => Err(GatewayError::Cancelled),
        other => Err(GatewayError::Incomplete(other.to_string())),
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip_all, fields(intent_id = tracing::field::Empty, amount = %amount))]
    async fn confirm(
        &self,
        authorization: &PaymentAuthorization,
        billing: &BillingDetails,
        amount: Price,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let PaymentAuthorization::Stripe {
            client_secret,
            publishable_key,
        } = authorization
        else {
            return Err(GatewayError::NotConfigured(PaymentProvider::Paystack));
        };
        let intent_id = authorization
            .payment_intent_id()
            .ok_or_else(|| GatewayError::Parse("malformed client secret".to_string()))?;
        tracing::Span::current().record("intent_id", intent_id);

        let expected = minor_units(amount)?;
        let key = publishable_key.as_deref().unwrap_or(&self.publishable_key);

        let response = self
            .client
            .post(self.confirm_url(intent_id)?)
            .bearer_auth(key)
            .form(&confirm_params(
                client_secret.expose_secret(),
                &self.card_token,
                billing,
            ))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let outcome = interpret(status, &body, expected);
        match &outcome {
            Ok(_) => tracing::info!("PaymentIntent confirmed"),
            Err(err) => tracing::warn!(
                error = %err,
                status = %status,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "PaymentIntent confirmation failed"
            ),
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chophouse_core::Email;

    use super::*;
    use crate::payment::BillingAddress;

    #[test]
    fn test_succeeded_intent() {
        let body = r#"{"id": "pi_123", "status": "succeeded", "amount": 2000}"#;
        let confirmation = interpret(StatusCode::OK, body, 2000).unwrap();
        assert_eq!(confirmation.transaction_id, "pi_123");
    }

    #[test]
    fn test_requires_action_is_incomplete() {
        let body = r#"{"id": "pi_123", "status": "requires_action"}"#;
        assert!(matches!(
            interpret(StatusCode::OK, body, 2000),
            Err(GatewayError::Incomplete(status)) if status == "requires_action"
        ));
    }

    #[test]
    fn test_processing_intent_is_not_confirmed() {
        let body = r#"{"id": "pi_123", "status": "processing", "amount": 2000}"#;
        let err = interpret(StatusCode::OK, body, 2000).unwrap_err();
        assert!(matches!(err, GatewayError::Incomplete(ref status) if status == "processing"));
        assert_eq!(
            err.user_message(),
            "Your payment could not be completed. Please try again or use another card."
        );
    }

    #[test]
    fn test_card_error_message_is_verbatim() {
        let body = r#"{"error": {"type": "card_error", "code": "card_declined", "message": "Your card was declined."}}"#;
        let err = interpret(StatusCode::PAYMENT_REQUIRED, body, 2000).unwrap_err();
        assert_eq!(err.user_message(), "Your card was declined.");
    }

    #[test]
    fn test_confirm_params_carry_billing_details() {
        let billing = BillingDetails {
            name: "Ada Obi".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            phone: "08012345678".to_string(),
            address: BillingAddress {
                line1: "12 Marina Rd".to_string(),
                city: "Lagos".to_string(),
                state: "LA".to_string(),
                postal_code: "101001".to_string(),
            },
        };
        let params = confirm_params("pi_1_secret_2", "tok_visa", &billing);
        assert!(params.contains(&("client_secret", "pi_1_secret_2".to_string())));
        assert!(params.contains(&("payment_method_data[card][token]", "tok_visa".to_string())));
        assert!(params.contains(&(
            "payment_method_data[billing_details][email]",
            "ada@example.com".to_string()
        )));
    }
}
