//! Typed client for the Chophouse REST backend.
//!
//! # Architecture
//!
//! - One [`ApiClient`] per process, cheaply cloneable via `Arc`
//! - The backend is source of truth; nothing is persisted locally
//! - Unfiltered product and catering listings are cached via `moka`
//! - Mutating requests echo the Django CSRF token as `X-CSRFToken`
//!
//! Endpoint groups live in submodules and extend [`ApiClient`] with
//! inherent methods:
//!
//! - [`catalog`] - Products, search, recommendations, catering, site settings
//! - [`orders`] - Order creation and payment confirmation
//! - [`reviews`] - Reviews, ratings, and comments
//! - [`wishlist`] - Per-customer wishlist
//! - [`blog`] - Blog posts
//! - [`newsletter`] - Newsletter subscription
//! - [`contact`] - Contact form
//!
//! # Example
//!
//! ```rust,ignore
//! use chophouse_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config)?;
//! let menu = client.list_products(&ProductQuery::default()).await?;
//! ```

pub mod blog;
pub mod catalog;
pub mod contact;
pub mod newsletter;
pub mod orders;
pub mod reviews;
pub mod wishlist;

use std::sync::Arc;

use chophouse_core::CurrencyCode;
use moka::future::Cache;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::StorefrontConfig;
use catalog::{CatalogCacheKey, CatalogCacheValue};

/// Header Django reads the CSRF token from.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Cookie Django stores the CSRF token in.
pub const CSRF_COOKIE: &str = "csrftoken";

const CACHE_CAPACITY: u64 = 64;

/// Longest slice of a response body written to logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// Errors
// =============================================================================

/// Errors from talking to the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (DNS, connect, TLS, reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request and said why.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Non-success status without a usable error body.
    #[error("API returned HTTP {status} without an error message")]
    Status { status: u16 },

    /// Success status, but the body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status, if the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Status { status } => Some(*status),
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the backend message contains `needle` (case-insensitive).
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        match self {
            Self::Api { message, .. } => message
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => false,
        }
    }

    /// Message safe to show a customer.
    ///
    /// Backend-reported messages are shown verbatim; transport and parse
    /// failures get generic text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Http(_) => {
                "We couldn't reach the restaurant. Check your connection and try again.".to_string()
            }
            Self::Status { status } if *status >= 500 => {
                "Something went wrong on our side. Please try again shortly.".to_string()
            }
            Self::Status { .. } | Self::Parse(_) | Self::Url(_) => {
                "The request could not be completed. Please try again.".to_string()
            }
        }
    }
}

// =============================================================================
// CSRF
// =============================================================================

/// Django CSRF token.
#[derive(Clone)]
pub struct CsrfToken(SecretString);

impl CsrfToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Read a token from a `Cookie` header value, e.g.
    /// `"sessionid=abc; csrftoken=XYZ"`.
    ///
    /// Returns `None` if the cookie is absent or empty.
    #[must_use]
    pub fn from_cookie_header(header: &str, name: &str) -> Option<Self> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim().trim_matches('"'))
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }

    fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<SecretString> for CsrfToken {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfToken([REDACTED])")
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Chophouse REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    csrf_token: Option<CsrfToken>,
    currency: CurrencyCode,
    cache: Cache<CatalogCacheKey, CatalogCacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("chophouse-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: crate::config::normalize_base_url(config.api_base_url.clone()),
                csrf_token: config.csrf_token.clone(),
                currency: config.currency,
                cache,
            }),
        })
    }

    /// Backend origin this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Currency menu prices are quoted in.
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.inner.currency
    }

    /// Drop every cached listing.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    pub(crate) fn cache(&self) -> &Cache<CatalogCacheKey, CatalogCacheValue> {
        &self.inner.cache
    }

    /// Resolve an `api/...` path against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.inner.client.get(url)
    }

    /// A POST carrying the CSRF token and the `Referer` Django checks over HTTPS.
    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        let mut request = self
            .inner
            .client
            .post(url)
            .header(reqwest::header::REFERER, self.inner.base_url.as_str());
        if let Some(token) = &self.inner.csrf_token {
            request = request.header(CSRF_HEADER, token.expose());
        }
        request
    }

    /// GET `path` and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let (_, body) = self.send(self.get(url).query(query)).await?;
        decode(&body)
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, ApiError> {
        let (_, body) = self.post_json_raw(path, payload).await?;
        decode(&body)
    }

    /// POST a JSON body and return the success status with the raw body.
    pub(crate) async fn post_json_raw<B: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<(StatusCode, String), ApiError> {
        let url = self.endpoint(path)?;
        self.send(self.post(url).json(payload)).await
    }

    /// Send a request and map non-success statuses to [`ApiError`].
    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %truncate(&body),
                "Backend returned non-success status"
            );
            return Err(error_message_from_body(&body).map_or(
                ApiError::Status {
                    status: status.as_u16(),
                },
                |message| ApiError::Api {
                    status: status.as_u16(),
                    message,
                },
            ));
        }

        Ok((status, body))
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

/// Decode a success body, logging the raw text on mismatch.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %truncate(body),
            "Failed to parse backend response"
        );
        ApiError::Parse(e.to_string())
    })
}

// =============================================================================
// Error bodies
// =============================================================================

/// Extract a human-readable message from a backend error body.
///
/// Recognized shapes, in order: `{"error": ".."}`, `{"detail": ".."}`,
/// `{"message": ".."}`, `{"errors": {field: [..]}}`, and a bare DRF
/// validation map `{field: [..]}`. Non-JSON bodies yield `None`.
pub(crate) fn error_message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    for key in ["error", "detail", "message"] {
        if let Some(text) = object.get(key).and_then(serde_json::Value::as_str)
            && !text.trim().is_empty()
        {
            return Some(text.to_string());
        }
    }

    let errors = object.get("errors").unwrap_or(&value);
    let flattened = flatten_errors(errors);
    (!flattened.is_empty()).then_some(flattened)
}

fn flatten_errors(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(flatten_errors)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        serde_json::Value::Object(fields) => fields
            .iter()
            .filter(|(key, _)| key.as_str() != "success")
            .filter_map(|(key, messages)| {
                let text = flatten_errors(messages);
                if text.is_empty() {
                    None
                } else if key == "non_field_errors" || key == "__all__" {
                    Some(text)
                } else {
                    Some(format!("{key}: {text}"))
                }
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    }
}

/// Either a bare JSON array or a DRF page (`{"results": [...]}`).
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Plain(items) | Self::Paged { results: items } => items,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_shapes() {
        assert_eq!(
            error_message_from_body(r#"{"error": "Invalid payment intent"}"#).as_deref(),
            Some("Invalid payment intent")
        );
        assert_eq!(
            error_message_from_body(r#"{"detail": "Not found."}"#).as_deref(),
            Some("Not found.")
        );
        assert_eq!(
            error_message_from_body(r#"{"message": "Email is required"}"#).as_deref(),
            Some("Email is required")
        );
    }

    #[test]
    fn test_field_errors_are_flattened() {
        let body = r#"{"success": false, "errors": {"email": ["Enter a valid email address."], "non_field_errors": ["The fields product, customer_email must make a unique set."]}}"#;
        let message = error_message_from_body(body).unwrap();
        assert!(message.contains("email: Enter a valid email address."));
        assert!(message.contains("must make a unique set."));
        assert!(!message.contains("non_field_errors"));
    }

    #[test]
    fn test_bare_validation_map() {
        let body = r#"{"phone": ["This field may not be blank."]}"#;
        assert_eq!(
            error_message_from_body(body).as_deref(),
            Some("phone: This field may not be blank.")
        );
    }

    #[test]
    fn test_non_json_body_has_no_message() {
        assert_eq!(error_message_from_body("<h1>Server Error (500)</h1>"), None);
        assert_eq!(error_message_from_body(""), None);
        assert_eq!(error_message_from_body("{}"), None);
    }

    #[test]
    fn test_user_message() {
        let api = ApiError::Api {
            status: 400,
            message: "Payment not completed".to_string(),
        };
        assert_eq!(api.user_message(), "Payment not completed");
        assert!(api.mentions("NOT COMPLETED"));

        let server = ApiError::Status { status: 502 };
        assert!(server.user_message().contains("our side"));
        assert!(!server.mentions("anything"));
        assert!(ApiError::Status { status: 404 }.is_not_found());
    }

    #[test]
    fn test_csrf_from_cookie_header() {
        let token =
            CsrfToken::from_cookie_header("sessionid=abc; csrftoken=Xy9zQ; theme=dark", CSRF_COOKIE)
                .unwrap();
        assert_eq!(token.expose(), "Xy9zQ");
        assert_eq!(format!("{token:?}"), "CsrfToken([REDACTED])");

        assert!(CsrfToken::from_cookie_header("sessionid=abc", CSRF_COOKIE).is_none());
        assert!(CsrfToken::from_cookie_header("csrftoken=", CSRF_COOKIE).is_none());
        assert!(CsrfToken::from_cookie_header("xcsrftoken=abc", CSRF_COOKIE).is_none());
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let plain: Listing<u32> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(plain.into_vec(), vec![1, 2]);
        let paged: Listing<u32> =
            serde_json::from_str(r#"{"count": 1, "results": [3]}"#).unwrap();
        assert_eq!(paged.into_vec(), vec![3]);
    }
}
