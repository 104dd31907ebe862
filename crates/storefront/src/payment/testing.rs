//! In-memory order API and gateway doubles for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chophouse_core::{OrderId, OrderStatus, Price};
use rust_decimal::Decimal;
use secrecy::SecretString;
use url::Url;

use super::{
    BillingDetails, GatewayError, PaymentConfirmation, PaymentGateway, RedirectHandler,
    RedirectOutcome,
};
use crate::api::ApiError;
use crate::api::orders::{CreatedOrder, NewOrder, Order, OrderApi, PaymentAuthorization};

// =============================================================================
// Order API
// =============================================================================

#[derive(Debug, Default)]
struct InMemoryOrderState {
    created: Vec<NewOrder>,
    confirmed: Vec<(OrderId, String)>,
    next_id: i64,
    create_error: Option<(u16, Option<String>)>,
    fail_on_confirm: bool,
}

/// Order API that keeps orders in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderApi {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_order` fail with `status`, and `message` as the body's error.
    pub fn set_create_error(&self, status: u16, message: Option<&str>) {
        self.state.write().unwrap().create_error = Some((status, message.map(str::to_string)));
    }

    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.state.write().unwrap().fail_on_confirm = fail;
    }

    pub fn created(&self) -> Vec<NewOrder> {
        self.state.read().unwrap().created.clone()
    }

    pub fn confirmed(&self) -> Vec<(OrderId, String)> {
        self.state.read().unwrap().confirmed.clone()
    }
}

#[async_trait]
impl OrderApi for InMemoryOrderApi {
    async fn create_order(&self, order: &NewOrder) -> Result<CreatedOrder, ApiError> {
        let mut state = self.state.write().unwrap();

        if let Some((status, message)) = state.create_error.clone() {
            return Err(message.map_or(ApiError::Status { status }, |message| {
                ApiError::Api { status, message }
            }));
        }

        state.next_id += 1;
        let id = OrderId::new(state.next_id);
        state.created.push(order.clone());

        Ok(CreatedOrder {
            order: Order {
                id,
                first_name: order.first_name.clone(),
                last_name: order.last_name.clone(),
                email: order.email.to_string(),
                phone: order.phone.clone(),
                address: order.address.clone(),
                city: order.city.clone(),
                state: order.state.clone(),
                zip_code: order.zip_code.clone(),
                delivery_instructions: order.delivery_instructions.clone(),
                total_amount: order.total_amount,
                status: OrderStatus::Pending,
                items: Vec::new(),
                created_at: None,
            },
            authorization: PaymentAuthorization::Stripe {
                client_secret: SecretString::from(format!("pi_{id}_secret_test")),
                publishable_key: Some("pk_test_double".to_string()),
            },
        })
    }

    async fn confirm_payment(
        &self,
        order_id: OrderId,
        transaction_id: &str,
    ) -> Result<String, ApiError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_confirm {
            return Err(ApiError::Api {
                status: 400,
                message: "Payment not completed".to_string(),
            });
        }

        state.confirmed.push((order_id, transaction_id.to_string()));
        Ok("Payment confirmed and order placed successfully!".to_string())
    }
}

// =============================================================================
// Gateway
// =============================================================================

#[derive(Debug, Default)]
struct ScriptedGatewayState {
    decline_with: Option<String>,
    charged: Vec<Decimal>,
}

/// Gateway that approves every payment unless told to decline.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<RwLock<ScriptedGatewayState>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_decline_with(&self, message: &str) {
        self.state.write().unwrap().decline_with = Some(message.to_string());
    }

    pub fn charged(&self) -> Vec<Decimal> {
        self.state.read().unwrap().charged.clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn confirm(
        &self,
        authorization: &PaymentAuthorization,
        _billing: &BillingDetails,
        amount: Price,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let mut state = self.state.write().unwrap();

        if let Some(message) = state.decline_with.clone() {
            return Err(GatewayError::Declined(message));
        }

        state.charged.push(amount.amount);
        let transaction_id = authorization
            .payment_intent_id()
            .unwrap_or("ref_test")
            .to_string();
        Ok(PaymentConfirmation { transaction_id })
    }
}

// =============================================================================
// Redirect
// =============================================================================

/// Redirect handler that returns a fixed outcome and records visited URLs.
#[derive(Debug, Clone)]
pub struct ScriptedRedirect {
    outcome: RedirectOutcome,
    visited: Arc<RwLock<Vec<String>>>,
}

impl ScriptedRedirect {
    pub fn new(outcome: RedirectOutcome) -> Self {
        Self {
            outcome,
            visited: Arc::default(),
        }
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.read().unwrap().clone()
    }
}

#[async_trait]
impl RedirectHandler for ScriptedRedirect {
    async fn authorize(&self, authorization_url: &Url, _reference: &str) -> RedirectOutcome {
        self.visited
            .write()
            .unwrap()
            .push(authorization_url.to_string());
        self.outcome.clone()
    }
}
