//! Integration test support for Chophouse.
//!
//! [`StubBackend`] serves the slice of the REST API and the Stripe confirm
//! endpoint the storefront talks to, on an ephemeral local port. Tests
//! point a [`StorefrontConfig`] at it, drive the real client, and inspect
//! what the stub recorded.
//!
//! ```rust,ignore
//! let stub = StubBackend::start().await;
//! let api = ApiClient::new(&stub.config())?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chophouse_storefront::StorefrontConfig;
use chophouse_storefront::api::CsrfToken;
use chophouse_storefront::config::StripeConfig;
use serde_json::{Value, json};
use url::Url;

/// CSRF token the stub expects on every POST to the REST API.
pub const CSRF_TOKEN: &str = "stub-csrf-token";

/// Publishable key the stub hands out with each order.
pub const PUBLISHABLE_KEY: &str = "pk_test_stub";

/// How the stub answers `POST /api/orders/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CreateBehavior {
    #[default]
    Accept,
    /// 400 with a DRF field error.
    RejectInvalid,
    /// 500 with an HTML body.
    ServerError,
}

/// How the stub answers the Stripe confirm call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StripeBehavior {
    #[default]
    Succeed,
    Decline,
    RequireAction,
}

/// A POST the stub received.
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub path: String,
    pub csrf_token: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct StubState {
    pub create_behavior: CreateBehavior,
    pub stripe_behavior: StripeBehavior,
    pub fail_confirm: bool,
    /// Hand out Paystack authorizations instead of Stripe client secrets.
    pub paystack: bool,
    pub posts: Vec<RecordedPost>,
    pub confirmed_orders: Vec<(i64, String)>,
    pub reviewed: BTreeSet<(i64, String)>,
    pub wishlist: BTreeSet<(String, i64)>,
    /// Email to active flag.
    pub subscribers: HashMap<String, bool>,
    pub product_requests: usize,
    next_order_id: i64,
}

type Shared = Arc<Mutex<StubState>>;

/// A running stub backend.
pub struct StubBackend {
    addr: SocketAddr,
    state: Shared,
}

impl StubBackend {
    /// Bind `127.0.0.1:0` and serve in the background.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub listener");
        let addr = listener.local_addr().expect("Stub listener has no address");

        let app = router(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Stub server error");
        });

        Self { addr, state }
    }

    /// Base URL of the stub.
    ///
    /// # Panics
    ///
    /// Panics if the bound address does not form a URL.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("Stub address is not a URL")
    }

    /// Storefront configuration pointing the REST client and Stripe at the stub.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        let mut config = StorefrontConfig::new(self.url());
        config.csrf_token = Some(CsrfToken::new(CSRF_TOKEN));
        config.stripe = Some(StripeConfig {
            publishable_key: "pk_test_config".to_string(),
            api_base: self.url(),
        });
        config
    }

    /// Lock the recorded state for setup or assertions.
    ///
    /// # Panics
    ///
    /// Panics if a handler panicked while holding the lock.
    pub fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().expect("Stub state poisoned")
    }

    /// POSTs received for `path`.
    #[must_use]
    pub fn posts_to(&self, path: &str) -> Vec<RecordedPost> {
        self.state()
            .posts
            .iter()
            .filter(|post| post.path == path)
            .cloned()
            .collect()
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, StubState> {
    state.lock().expect("Stub state poisoned")
}

fn record(state: &mut StubState, path: String, headers: &HeaderMap, body: Value) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.posts.push(RecordedPost {
        path,
        csrf_token: header("x-csrftoken"),
        authorization: header("authorization"),
        body,
    });
}

/// 403 unless the Django CSRF header matches.
fn csrf_rejection(headers: &HeaderMap) -> Option<Response> {
    let ok = headers
        .get("x-csrftoken")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|token| token == CSRF_TOKEN);
    (!ok).then(|| {
        (
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "CSRF Failed: CSRF token missing."})),
        )
            .into_response()
    })
}

// =============================================================================
// Fixtures
// =============================================================================

/// Product fixture as the backend serializes it.
#[must_use]
pub fn product_json(id: i64) -> Value {
    let (name, price, category) = match id {
        1 => ("Jollof Rice", "2500.00", "finger-foods"),
        2 => ("Zobo", "800.00", "beverages"),
        3 => ("Puff Puff", "1200.00", "finger-foods"),
        _ => ("Chin Chin", "1500.00", "desserts"),
    };
    json!({
        "id": id,
        "name": name,
        "description": format!("{name}, freshly made"),
        "price": price,
        "category": category,
        "image": null,
        "is_available": true,
        "created_at": "2025-04-01T12:00:00Z",
        "average_rating": 4.5,
        "review_count": 2,
        "rating_distribution": {"5": 1, "4": 1, "3": 0, "2": 0, "1": 0},
        "reviews": [],
        "is_in_wishlist": false
    })
}

fn order_json(id: i64, body: &Value) -> Value {
    let items: Vec<Value> = body["items"]
        .as_array()
        .map(|lines| {
            lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    json!({
                        "id": i + 1,
                        "product": line["product_id"],
                        "product_name": "",
                        "quantity": line["quantity"],
                        "price": "0.00"
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    json!({
        "id": id,
        "first_name": body["first_name"],
        "last_name": body["last_name"],
        "email": body["email"],
        "phone": body["phone"],
        "address": body["address"],
        "city": body["city"],
        "state": body["state"],
        "zip_code": body["zip_code"],
        "delivery_instructions": body["delivery_instructions"],
        "total_amount": body["total_amount"],
        "status": "pending",
        "items": items,
        "created_at": "2025-05-01T18:30:00Z"
    })
}

// =============================================================================
// Router
// =============================================================================

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/products/", get(list_products))
        .route("/api/products/{id}/", get(get_product))
        .route("/api/orders/", post(create_order))
        .route("/api/orders/{id}/confirm_payment/", post(confirm_payment))
        .route("/api/reviews/", post(create_review))
        .route("/api/wishlist/", get(list_wishlist).post(add_wishlist))
        .route("/api/wishlist/remove_item/", post(remove_wishlist))
        .route("/api/newsletter-subscribers/subscribe/", post(subscribe))
        .route("/api/newsletter-subscribers/unsubscribe/", post(unsubscribe))
        .route("/v1/payment_intents/{id}/confirm", post(stripe_confirm))
        .with_state(state)
}

async fn list_products(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    lock(&state).product_requests += 1;
    let mut products: Vec<Value> = (1..=4).map(product_json).collect();
    if let Some(category) = params.get("category") {
        products.retain(|p| p["category"] == category.as_str());
    }
    Json(Value::Array(products))
}

async fn get_product(Path(id): Path<i64>) -> Response {
    if id > 4 {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }
    Json(product_json(id)).into_response()
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, "/api/orders/".to_string(), &headers, body.clone());
    if let Some(rejection) = csrf_rejection(&headers) {
        return rejection;
    }

    match state.create_behavior {
        CreateBehavior::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "<h1>Server Error (500)</h1>",
        )
            .into_response(),
        CreateBehavior::RejectInvalid => (
            StatusCode::BAD_REQUEST,
            Json(json!({"phone": ["This field may not be blank."]})),
        )
            .into_response(),
        CreateBehavior::Accept => {
            state.next_order_id += 1;
            let id = state.next_order_id;
            let order = order_json(id, &body);
            let created = if state.paystack {
                let reference = format!("CHOPHOUSE_{id}");
                json!({
                    "order": order,
                    "authorization_url": format!("https://checkout.paystack.com/{reference}"),
                    "reference": reference
                })
            } else {
                json!({
                    "order": order,
                    "client_secret": format!("pi_stub{id}_secret_abc"),
                    "publishable_key": PUBLISHABLE_KEY
                })
            };
            (StatusCode::CREATED, Json(created)).into_response()
        }
    }
}

async fn confirm_payment(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    record(
        &mut state,
        format!("/api/orders/{id}/confirm_payment/"),
        &headers,
        body.clone(),
    );
    if let Some(rejection) = csrf_rejection(&headers) {
        return rejection;
    }
    if state.fail_confirm {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Payment not completed"})),
        )
            .into_response();
    }

    let intent = body["payment_intent_id"].as_str().unwrap_or_default().to_string();
    state.confirmed_orders.push((id, intent));
    Json(json!({
        "success": true,
        "message": "Payment confirmed and order placed successfully!"
    }))
    .into_response()
}

async fn stripe_confirm(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut state = lock(&state);
    let body = serde_json::to_value(&form).unwrap_or(Value::Null);
    record(
        &mut state,
        format!("/v1/payment_intents/{id}/confirm"),
        &headers,
        body,
    );

    match state.stripe_behavior {
        StripeBehavior::Succeed => {
            Json(json!({"id": id, "object": "payment_intent", "status": "succeeded"})).into_response()
        }
        StripeBehavior::RequireAction => {
            Json(json!({"id": id, "object": "payment_intent", "status": "requires_action"}))
                .into_response()
        }
        StripeBehavior::Decline => (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({"error": {
                "type": "card_error",
                "code": "card_declined",
                "message": "Your card was declined."
            }})),
        )
            .into_response(),
    }
}

async fn create_review(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, "/api/reviews/".to_string(), &headers, body.clone());
    if let Some(rejection) = csrf_rejection(&headers) {
        return rejection;
    }

    let key = (
        body["product"].as_i64().unwrap_or_default(),
        body["customer_email"].as_str().unwrap_or_default().to_string(),
    );
    if !state.reviewed.insert(key) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "errors": {"non_field_errors": ["The fields product, customer_email must make a unique set."]}
            })),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({"success": true, "message": "Review submitted successfully!"})),
    )
        .into_response()
}

async fn list_wishlist(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let email = params.get("customer_email").cloned().unwrap_or_default();
    let items: Vec<Value> = lock(&state)
        .wishlist
        .iter()
        .filter(|(owner, _)| *owner == email)
        .enumerate()
        .map(|(i, (_, product))| {
            json!({
                "id": i + 1,
                "product": product_json(*product),
                "added_at": "2025-04-01T12:00:00Z"
            })
        })
        .collect();
    Json(Value::Array(items))
}

async fn add_wishlist(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, "/api/wishlist/".to_string(), &headers, body.clone());
    if let Some(rejection) = csrf_rejection(&headers) {
        return rejection;
    }

    let key = (
        body["customer_email"].as_str().unwrap_or_default().to_string(),
        body["product"].as_i64().unwrap_or_default(),
    );
    if !state.wishlist.insert(key) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"non_field_errors": ["The fields customer_email, product must make a unique set."]})),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn remove_wishlist(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    record(
        &mut state,
        "/api/wishlist/remove_item/".to_string(),
        &headers,
        body.clone(),
    );
    if let Some(rejection) = csrf_rejection(&headers) {
        return rejection;
    }

    let key = (
        body["user_email"].as_str().unwrap_or_default().to_string(),
        body["product"].as_i64().unwrap_or_default(),
    );
    if state.wishlist.remove(&key) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Item not found in wishlist"})),
        )
            .into_response()
    }
}

async fn subscribe(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if let Some(rejection) = csrf_rejection(&headers) {
        return rejection;
    }

    let email = body["email"].as_str().unwrap_or_default().to_string();
    match state.subscribers.insert(email, true) {
        None => (
            StatusCode::CREATED,
            Json(json!({"message": "Thank you for subscribing to our newsletter!"})),
        )
            .into_response(),
        Some(true) => Json(json!({"message": "You are already subscribed to our newsletter!"}))
            .into_response(),
        Some(false) => Json(json!({
            "message": "Welcome back! You have been resubscribed to our newsletter."
        }))
        .into_response(),
    }
}

async fn unsubscribe(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if let Some(rejection) = csrf_rejection(&headers) {
        return rejection;
    }

    let email = body["email"].as_str().unwrap_or_default();
    match state.subscribers.get_mut(email) {
        Some(active) => {
            *active = false;
            Json(json!({"message": "You have been unsubscribed from our newsletter."}))
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Email not found in our subscribers list."})),
        )
            .into_response(),
    }
}
