//! Result of an order submission, as shown to the customer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::OrderId;

/// The order that was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub total: Decimal,
}

/// Outcome of `Storefront::place_order`
/// consumed by the confirmation or error banner.
///
/// `order` is present exactly when `success` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmissionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderSummary>,
}

impl OrderSubmissionResult {
    pub const SUCCESS_MESSAGE: &'static str = "Order placed successfully!";

    /// A successful submission for `order`.
    #[must_use]
    pub fn succeeded(order: OrderSummary) -> Self {
        Self {
            success: true,
            message: Self::SUCCESS_MESSAGE.to_owned(),
            order: Some(order),
        }
    }

    /// A failed submission with a customer-facing message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            order: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_success_carries_order() {
        let result = OrderSubmissionResult::succeeded(OrderSummary {
            id: OrderId::new(42),
            total: Decimal::from(25),
        });
        assert!(result.success);
        assert_eq!(result.message, "Order placed successfully!");
        assert_eq!(result.order.unwrap().id, OrderId::new(42));
    }

    #[test]
    fn test_failure_has_no_order() {
        let result = OrderSubmissionResult::failed("Your card was declined.");
        assert!(!result.success);
        assert!(result.order.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("order").is_none());
    }
}
