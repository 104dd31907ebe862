//! Chophouse Core - cart ledger, checkout state machine, and shared types.
//!
//! This crate provides the pieces of the storefront that carry real
//! invariants and are used across all Chophouse components:
//! - `storefront` - REST API client, payment gateways, and the session store
//! - `cli` - Command-line driver for browsing and ordering
//!
//! # Architecture
//!
//! The core crate contains only types and state machines - no I/O, no HTTP
//! clients, no async. Every operation here is a plain function over owned
//! data, which keeps it testable without a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`cart`] - The cart ledger (line items, quantities, totals)
//! - [`checkout`] - The checkout step controller and its session
//! - [`outcome`] - The order submission result consumed by the display layer

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod outcome;
pub mod types;

pub use cart::{Cart, CartItem, OrderLine, Purchasable, QuantityPolicy};
pub use checkout::{
    CheckoutError, CheckoutField, CheckoutSession, CheckoutStep, CustomerInfo, DeliveryInfo,
    PaymentState, validate_customer_info, validate_delivery_info,
};
pub use outcome::{OrderSubmissionResult, OrderSummary};
pub use types::*;
