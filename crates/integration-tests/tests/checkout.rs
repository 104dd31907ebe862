//! End-to-end checkout against the stub backend and stub Stripe.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chophouse_core::{
    CheckoutStep, CustomerInfo, DeliveryInfo, OrderId, PaymentState, ProductId,
};
use chophouse_integration_tests::{
    CSRF_TOKEN, CreateBehavior, PUBLISHABLE_KEY, StripeBehavior, StubBackend,
};
use chophouse_storefront::payment::{
    Gateways, PaystackGateway, RedirectHandler, RedirectOutcome, StripeGateway,
};
use chophouse_storefront::{ApiClient, Storefront};
use rust_decimal::Decimal;
use url::Url;

/// Completes every Paystack redirect with the reference it was given.
#[derive(Clone, Default)]
struct ReturningRedirect {
    visited: Arc<Mutex<Vec<Url>>>,
}

#[async_trait]
impl RedirectHandler for ReturningRedirect {
    async fn authorize(&self, authorization_url: &Url, reference: &str) -> RedirectOutcome {
        self.visited.lock().unwrap().push(authorization_url.clone());
        RedirectOutcome::Completed {
            reference: reference.to_string(),
        }
    }
}

type Store = Storefront<ApiClient, Gateways<ReturningRedirect>>;

fn storefront(stub: &StubBackend, redirect: ReturningRedirect) -> (ApiClient, Store) {
    let config = stub.config();
    let api = ApiClient::new(&config).unwrap();
    let stripe = StripeGateway::new(config.stripe.as_ref().unwrap(), "tok_visa").unwrap();
    let gateways = Gateways::new(Some(stripe), Some(PaystackGateway::new(redirect)));
    let store = Storefront::new(api.clone(), gateways, api.currency());
    (api, store)
}

/// Fill the cart with 2x Jollof Rice and 1x Zobo, and walk to payment.
async fn ready_for_payment(api: &ApiClient, store: &mut Store) {
    let jollof = api.get_product(ProductId::new(1)).await.unwrap();
    let zobo = api.get_product(ProductId::new(2)).await.unwrap();
    store.add_to_cart(&jollof, 2);
    store.add_to_cart(&zobo, 1);

    store.begin_checkout().unwrap();
    let session = store.checkout_mut().unwrap();
    session.customer_info = CustomerInfo {
        first_name: "Ada".to_string(),
        last_name: "Obi".to_string(),
        email: "ada@example.com".to_string(),
        phone: "08012345678".to_string(),
    };
    session.delivery_info = DeliveryInfo {
        address: "12 Marina Rd".to_string(),
        city: "Lagos".to_string(),
        state: "LA".to_string(),
        zip_code: "101001".to_string(),
        instructions: Some("Call on arrival".to_string()),
    };
    store.next_step().unwrap();
    assert_eq!(store.next_step().unwrap(), CheckoutStep::Payment);
}

#[tokio::test]
async fn test_stripe_checkout_places_order() {
    let stub = StubBackend::start().await;
    let (api, mut store) = storefront(&stub, ReturningRedirect::default());
    ready_for_payment(&api, &mut store).await;

    let result = store.place_order().await;

    assert!(result.success, "{}", result.message);
    let summary = result.order.unwrap();
    assert_eq!(summary.id, OrderId::new(1));
    assert_eq!(summary.total, Decimal::new(580_000, 2));
    assert!(store.cart().is_empty());
    assert_eq!(store.checkout().unwrap().step(), CheckoutStep::Cart);

    let created = stub.posts_to("/api/orders/");
    assert_eq!(created.len(), 1);
    let body = &created[0].body;
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["delivery_instructions"], "Call on arrival");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let stripe = stub.posts_to("/v1/payment_intents/pi_stub1/confirm");
    assert_eq!(stripe.len(), 1);
    assert_eq!(
        stripe[0].authorization.as_deref(),
        Some(format!("Bearer {PUBLISHABLE_KEY}").as_str())
    );
    assert_eq!(stripe[0].body["client_secret"], "pi_stub1_secret_abc");

    assert_eq!(
        stub.state().confirmed_orders,
        vec![(1, "pi_stub1".to_string())]
    );
}

#[tokio::test]
async fn test_backend_posts_carry_csrf_token() {
    let stub = StubBackend::start().await;
    let (api, mut store) = storefront(&stub, ReturningRedirect::default());
    ready_for_payment(&api, &mut store).await;

    store.place_order().await;

    let backend_posts: Vec<_> = stub
        .state()
        .posts
        .iter()
        .filter(|post| post.path.starts_with("/api/"))
        .cloned()
        .collect();
    assert_eq!(backend_posts.len(), 2);
    for post in backend_posts {
        assert_eq!(post.csrf_token.as_deref(), Some(CSRF_TOKEN), "{}", post.path);
    }
}

#[tokio::test]
async fn test_server_error_on_create_keeps_cart() {
    let stub = StubBackend::start().await;
    stub.state().create_behavior = CreateBehavior::ServerError;
    let (api, mut store) = storefront(&stub, ReturningRedirect::default());
    ready_for_payment(&api, &mut store).await;

    let result = store.place_order().await;

    assert!(!result.success);
    assert_eq!(
        result.message,
        "We couldn't create your order. Please try again."
    );
    assert_eq!(store.cart().item_count(), 3);
    let session = store.checkout().unwrap();
    assert_eq!(session.step(), CheckoutStep::Payment);
    assert_eq!(session.payment_state(), PaymentState::Failed);
    assert!(stub.posts_to("/v1/payment_intents/pi_stub1/confirm").is_empty());
}

#[tokio::test]
async fn test_validation_error_on_create_is_shown() {
    let stub = StubBackend::start().await;
    stub.state().create_behavior = CreateBehavior::RejectInvalid;
    let (api, mut store) = storefront(&stub, ReturningRedirect::default());
    ready_for_payment(&api, &mut store).await;

    let result = store.place_order().await;

    assert!(!result.success);
    assert_eq!(result.message, "phone: This field may not be blank.");
}

#[tokio::test]
async fn test_declined_card_reports_stripe_message() {
    let stub = StubBackend::start().await;
    stub.state().stripe_behavior = StripeBehavior::Decline;
    let (api, mut store) = storefront(&stub, ReturningRedirect::default());
    ready_for_payment(&api, &mut store).await;

    let result = store.place_order().await;

    assert!(!result.success);
    assert_eq!(result.message, "Your card was declined.");
    assert!(stub.state().confirmed_orders.is_empty());
    assert!(!store.cart().is_empty());
}

#[tokio::test]
async fn test_intent_needing_action_is_not_confirmed() {
    let stub = StubBackend::start().await;
    stub.state().stripe_behavior = StripeBehavior::RequireAction;
    let (api, mut store) = storefront(&stub, ReturningRedirect::default());
    ready_for_payment(&api, &mut store).await;

    let result = store.place_order().await;

    assert!(!result.success);
    assert!(stub.posts_to("/api/orders/1/confirm_payment/").is_empty());
}

#[tokio::test]
async fn test_backend_confirmation_failure_points_to_support() {
    let stub = StubBackend::start().await;
    stub.state().fail_confirm = true;
    let (api, mut store) = storefront(&stub, ReturningRedirect::default());
    ready_for_payment(&api, &mut store).await;

    let result = store.place_order().await;

    assert!(!result.success);
    assert!(result.message.contains("order #1"), "{}", result.message);
    assert!(result.message.contains("pi_stub1"), "{}", result.message);
    assert_eq!(store.cart().item_count(), 3);
}

#[tokio::test]
async fn test_failed_submission_can_be_retried() {
    let stub = StubBackend::start().await;
    stub.state().stripe_behavior = StripeBehavior::Decline;
    let (api, mut store) = storefront(&stub, ReturningRedirect::default());
    ready_for_payment(&api, &mut store).await;

    assert!(!store.place_order().await.success);

    stub.state().stripe_behavior = StripeBehavior::Succeed;
    let retry = store.place_order().await;

    assert!(retry.success, "{}", retry.message);
    assert_eq!(retry.order.unwrap().id, OrderId::new(2));
    assert!(store.cart().is_empty());
}

#[tokio::test]
async fn test_paystack_checkout_confirms_with_reference() {
    let stub = StubBackend::start().await;
    stub.state().paystack = true;
    let redirect = ReturningRedirect::default();
    let (api, mut store) = storefront(&stub, redirect.clone());
    ready_for_payment(&api, &mut store).await;

    let result = store.place_order().await;

    assert!(result.success, "{}", result.message);
    assert_eq!(
        redirect.visited.lock().unwrap().as_slice(),
        [Url::parse("https://checkout.paystack.com/CHOPHOUSE_1").unwrap()]
    );
    assert_eq!(
        stub.state().confirmed_orders,
        vec![(1, "CHOPHOUSE_1".to_string())]
    );
}
