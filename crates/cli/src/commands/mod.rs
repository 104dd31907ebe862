//! Command implementations.

pub mod catalog;
pub mod engage;
pub mod order;
mod output;

use chophouse_core::{CheckoutError, EmailError};
use chophouse_storefront::StorefrontError;
use chophouse_storefront::api::contact::ContactError;
use chophouse_storefront::api::newsletter::NewsletterError;
use chophouse_storefront::api::reviews::ReviewError;
use chophouse_storefront::api::wishlist::WishlistError;
use chophouse_storefront::api::{ApiError, CSRF_COOKIE, CsrfToken};
use chophouse_storefront::config::ConfigError;
use chophouse_storefront::payment::{GatewayError, StageFailure};
use thiserror::Error;

/// Errors surfaced by a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    /// Reading a local input file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A local input file is malformed.
    #[error("Invalid order file: {0}")]
    OrderFile(#[from] serde_json::Error),

    /// The order was not placed; the message is customer-facing.
    #[error("{0}")]
    Rejected(String),

    /// Output could not be rendered.
    #[error("Failed to write output: {0}")]
    Output(String),
}

impl CliError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storefront(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    /// Log the error, sending server-side faults to Sentry.
    pub fn report(&self) {
        if let Self::Storefront(err) = self {
            err.report();
        }
    }
}

macro_rules! impl_from_storefront_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CliError {
                fn from(err: $ty) -> Self {
                    Self::Storefront(err.into())
                }
            }
        )*
    };
}

impl_from_storefront_error!(
    ApiError,
    ConfigError,
    CheckoutError,
    GatewayError,
    StageFailure,
    ReviewError,
    WishlistError,
    NewsletterError,
    ContactError,
    EmailError,
);

/// CSRF token from a `Cookie` header, if it carries one.
pub fn csrf_from_cookie(header: &str) -> Option<CsrfToken> {
    let token = CsrfToken::from_cookie_header(header, CSRF_COOKIE);
    if token.is_none() {
        tracing::warn!("Cookie header has no {CSRF_COOKIE} entry; POSTs will be sent without a CSRF token");
    }
    token
}
