//! Chophouse storefront library.
//!
//! Typed access to the restaurant's REST backend, the payment gateways,
//! and the per-customer [`Storefront`] store that ties the cart and
//! checkout state machines to order submission.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod payment;
pub mod store;

pub use api::ApiClient;
pub use config::StorefrontConfig;
pub use error::{Result, StorefrontError};
pub use store::{Identity, Storefront};
