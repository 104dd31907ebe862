//! Unified error handling with Sentry integration.
//!
//! Each concern has its own error enum; [`StorefrontError`] wraps them for
//! hosts that want a single type. Every error exposes `user_message()` so
//! display layers never show internals.

use chophouse_core::{CheckoutError, EmailError};
use thiserror::Error;

use crate::api::ApiError;
use crate::api::contact::ContactError;
use crate::api::newsletter::NewsletterError;
use crate::api::reviews::ReviewError;
use crate::api::wishlist::WishlistError;
use crate::config::ConfigError;
use crate::payment::{GatewayError, StageFailure};

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Order submission failed: {0}")]
    Order(#[from] StageFailure),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    #[error("Newsletter error: {0}")]
    Newsletter(#[from] NewsletterError),

    #[error("Contact error: {0}")]
    Contact(#[from] ContactError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),
}

impl StorefrontError {
    /// Message safe to show a customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => "The storefront is not configured correctly.".to_string(),
            Self::Api(err) => err.user_message(),
            Self::Checkout(err) => err.to_string(),
            Self::Gateway(err) => err.user_message(),
            Self::Order(err) => err.user_message(),
            Self::Review(err) => err.user_message(),
            Self::Wishlist(err) => err.user_message(),
            Self::Newsletter(err) => err.user_message(),
            Self::Contact(err) => err.user_message(),
            Self::Email(_) => "Please enter a valid email address.".to_string(),
        }
    }

    /// Whether the fault is on our side rather than the customer's.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        fn api(err: &ApiError) -> bool {
            match err {
                ApiError::Parse(_) | ApiError::Url(_) => true,
                _ => err.status().is_some_and(|status| status >= 500),
            }
        }

        match self {
            Self::Config(_) => true,
            Self::Api(err)
            | Self::Order(StageFailure::OrderCreation(err))
            | Self::Wishlist(WishlistError::Api(err))
            | Self::Newsletter(NewsletterError::Api(err))
            | Self::Contact(ContactError::Api(err))
            | Self::Review(ReviewError::Api(err)) => api(err),
            Self::Order(failure) => failure.requires_support(),
            Self::Gateway(GatewayError::Parse(_) | GatewayError::NotConfigured(_)) => true,
            _ => false,
        }
    }

    /// Log the error, sending server-side faults to Sentry.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::warn!(error = %self, "Storefront request rejected");
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context for the signed-in customer.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for customer actions.
///
/// Breadcrumbs appear in Sentry reports as the trail of actions leading up
/// to an error.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
