//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHOPHOUSE_API_BASE_URL` - Base URL of the restaurant backend (e.g., <https://chophouse.ng>)
//!
//! ## Optional
//! - `CHOPHOUSE_CSRF_TOKEN` - Django CSRF token echoed on mutating requests
//! - `CHOPHOUSE_CURRENCY` - Menu currency (default: NGN)
//! - `CHOPHOUSE_CATALOG_CACHE_TTL_SECS` - Product/catering listing cache TTL (default: 300)
//! - `CHOPHOUSE_CONNECT_TIMEOUT_SECS` - TCP connect timeout (default: 10)
//! - `STRIPE_PUBLISHABLE_KEY` - Enables the Stripe gateway
//! - `STRIPE_API_BASE` - Stripe API origin (default: <https://api.stripe.com>)
//! - `PAYSTACK_PUBLIC_KEY` - Enables the Paystack gateway
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::time::Duration;

use chophouse_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::api::CsrfToken;

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the CSRF token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Backend origin; always ends with `/` so relative joins keep its path
    pub api_base_url: Url,
    /// CSRF token sent as `X-CSRFToken` on POSTs
    pub csrf_token: Option<CsrfToken>,
    /// Currency the menu is priced in
    pub currency: CurrencyCode,
    /// TTL for cached unfiltered catalog listings
    pub catalog_cache_ttl: Duration,
    /// Connect timeout for the HTTP client. No overall request timeout is set.
    pub connect_timeout: Duration,
    /// Stripe settings, if the Stripe gateway is enabled
    pub stripe: Option<StripeConfig>,
    /// Paystack settings, if the Paystack gateway is enabled
    pub paystack: Option<PaystackConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag (e.g., "production")
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field(
                "csrf_token",
                &self.csrf_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("currency", &self.currency)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .field("connect_timeout", &self.connect_timeout)
            .field("stripe", &self.stripe)
            .field("paystack", &self.paystack)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

/// Stripe client-side confirmation settings.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Publishable key (safe to expose in browser). The backend also returns
    /// one per order; this is the fallback.
    pub publishable_key: String,
    /// API origin, overridable for tests
    pub api_base: Url,
}

/// Paystack checkout settings.
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    /// Public key (safe to expose in browser)
    pub public_key: String,
}

impl StorefrontConfig {
    /// Configuration with defaults for everything but the backend URL.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url: normalize_base_url(api_base_url),
            csrf_token: None,
            currency: CurrencyCode::default(),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            stripe: None,
            paystack: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if keys fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_url("CHOPHOUSE_API_BASE_URL", &get_required_env("CHOPHOUSE_API_BASE_URL")?)?;
        let csrf_token = get_optional_validated_secret("CHOPHOUSE_CSRF_TOKEN")?.map(CsrfToken::from);
        let currency = get_env_or_default("CHOPHOUSE_CURRENCY", "NGN")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHOPHOUSE_CURRENCY".to_string(), e))?;
        let catalog_cache_ttl = get_duration_secs("CHOPHOUSE_CATALOG_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let connect_timeout = get_duration_secs("CHOPHOUSE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?;

        Ok(Self {
            csrf_token,
            currency,
            catalog_cache_ttl,
            connect_timeout,
            stripe: StripeConfig::from_env()?,
            paystack: PaystackConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            ..Self::new(api_base_url)
        })
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(publishable_key) = get_optional_env("STRIPE_PUBLISHABLE_KEY") else {
            return Ok(None);
        };
        reject_placeholder(&publishable_key, "STRIPE_PUBLISHABLE_KEY")?;
        let api_base = parse_url(
            "STRIPE_API_BASE",
            &get_env_or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
        )?;
        Ok(Some(Self {
            publishable_key,
            api_base: normalize_base_url(api_base),
        }))
    }
}

impl PaystackConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(public_key) = get_optional_env("PAYSTACK_PUBLIC_KEY") else {
            return Ok(None);
        };
        reject_placeholder(&public_key, "PAYSTACK_PUBLIC_KEY")?;
        Ok(Some(Self { public_key }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn get_duration_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    get_env_or_default(key, &default.to_string())
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

/// Ensure the path ends with `/` so `Url::join` appends instead of replacing.
pub(crate) fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject values that look like an unfilled `.env` template.
fn reject_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    reject_placeholder(secret, var_name)?;

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the token from the csrftoken cookie."
            ),
        ));
    }

    Ok(())
}

/// Load and validate an optional secret from environment.
fn get_optional_validated_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    let Some(value) = get_optional_env(key) else {
        return Ok(None);
    };
    validate_secret_strength(&value, key)?;
    Ok(Some(SecretString::from(value)))
}
