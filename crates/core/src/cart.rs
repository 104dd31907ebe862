//! The cart ledger.
//!
//! Holds the line items a customer has selected, keyed by product id, and
//! computes totals on demand. Every operation is total: unknown product ids
//! are ignored rather than reported.
//!
//! # Invariants
//!
//! - No two lines share a `product_id`.
//! - Every line has `quantity >= 1` and `unit_price >= 0`.
//! - [`Cart::total`] is recomputed from the lines on every call.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CurrencyCode, Price, ProductId};

/// Anything that can be put in the cart.
///
/// Catalog records implement this so the ledger never depends on the
/// backend's product shape.
pub trait Purchasable {
    /// Backend product id.
    fn product_id(&self) -> ProductId;
    /// Display name captured on the cart line.
    fn name(&self) -> &str;
    /// Price of a single unit.
    fn unit_price(&self) -> Decimal;
}

/// A single line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl Purchasable for CartItem {
    fn product_id(&self) -> ProductId {
        self.product_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

/// Product and quantity pair sent to the order API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// What `update_quantity` does when a line would drop to zero or below.
///
/// Storefront variants disagree here. Removing the line is the primary
/// behavior; clamping to one is kept as an explicit opt-in until product
/// decides which one is right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuantityPolicy {
    /// Remove the line when its quantity reaches zero.
    #[default]
    RemoveAtZero,
    /// Never go below one; only `remove_item` deletes a line.
    ClampToOne,
}

/// The cart ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    #[serde(default)]
    policy: QuantityPolicy,
}

impl Cart {
    /// Create an empty cart with the default [`QuantityPolicy`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cart with an explicit quantity policy.
    #[must_use]
    pub const fn with_policy(policy: QuantityPolicy) -> Self {
        Self {
            items: Vec::new(),
            policy,
        }
    }

    /// The quantity policy in effect.
    #[must_use]
    pub const fn policy(&self) -> QuantityPolicy {
        self.policy
    }

    /// Add `quantity` units of a product.
    ///
    /// An existing line keeps its captured name and price and has its
    /// quantity incremented. A zero quantity is ignored.
    pub fn add_item<P: Purchasable + ?Sized>(&mut self, product: &P, quantity: u32) {
        if quantity == 0 {
            return;
        }

        let product_id = product.product_id();
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = line.quantity.saturating_add(quantity);
            return;
        }

        self.items.push(CartItem {
            product_id,
            name: product.name().to_owned(),
            // Backend prices are never negative.
            unit_price: product.unit_price().max(Decimal::ZERO),
            quantity,
        });
    }

    /// Apply a quantity delta to a line.
    ///
    /// With [`QuantityPolicy::RemoveAtZero`] a result of zero or less removes
    /// the line. With [`QuantityPolicy::ClampToOne`] the quantity stops at one.
    /// Unknown product ids are ignored.
    pub fn update_quantity(&mut self, product_id: ProductId, delta: i64) {
        let policy = self.policy;
        let Some(line) = self.line_mut(product_id) else {
            return;
        };

        let next = i64::from(line.quantity).saturating_add(delta);
        let remove = if next > 0 {
            line.quantity = u32::try_from(next).unwrap_or(u32::MAX);
            false
        } else {
            match policy {
                QuantityPolicy::RemoveAtZero => true,
                QuantityPolicy::ClampToOne => {
                    line.quantity = 1;
                    false
                }
            }
        };

        if remove {
            self.remove_item(product_id);
        }
    }

    /// Remove a line. Unknown product ids are ignored.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.items.retain(|line| line.product_id != product_id);
    }

    /// Empty the ledger.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of `unit_price * quantity` over all lines; zero when empty.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// [`Cart::total`] tagged with a currency.
    #[must_use]
    pub fn total_price(&self, currency_code: CurrencyCode) -> Price {
        Price::new(self.total(), currency_code)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by product id.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|line| line.product_id == product_id)
    }

    /// Iterate over lines in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter()
    }

    /// Snapshot of `(product_id, quantity)` pairs for order submission.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.items
            .iter()
            .map(|line| OrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect()
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dish(id: i64, price: i64) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Dish {id}"),
            unit_price: Decimal::from(price),
            quantity: 1,
        }
    }

    fn sample_cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_item(&dish(1, 10), 2);
        cart.add_item(&dish(2, 5), 1);
        cart
    }

    #[test]
    fn test_total_of_sample_cart() {
        assert_eq!(sample_cart().total(), Decimal::from(25));
        assert_eq!(Cart::new().total(), Decimal::ZERO);
    }

    #[test]
    fn test_adding_twice_increments_quantity() {
        let mut cart = Cart::new();
        cart.add_item(&dish(1, 10), 1);
        cart.add_item(&dish(1, 10), 1);
        cart.add_item(&dish(1, 10), 3);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity, 5);
    }

    #[test]
    fn test_existing_line_keeps_captured_price() {
        let mut cart = Cart::new();
        cart.add_item(&dish(1, 10), 1);
        cart.add_item(&dish(1, 99), 1);
        assert_eq!(cart.total(), Decimal::from(20));
    }

    #[test]
    fn test_add_zero_quantity_is_ignored() {
        let mut cart = Cart::new();
        cart.add_item(&dish(1, 10), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_negative_delta_to_zero_removes_line() {
        let mut cart = sample_cart();
        cart.update_quantity(ProductId::new(1), -2);

        assert!(cart.get(ProductId::new(1)).is_none());
        let remaining: Vec<_> = cart.iter().map(|l| l.product_id).collect();
        assert_eq!(remaining, vec![ProductId::new(2)]);
        assert_eq!(cart.total(), Decimal::from(5));
    }

    #[test]
    fn test_overshooting_delta_removes_line() {
        let mut cart = sample_cart();
        cart.update_quantity(ProductId::new(2), -10);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_positive_delta_increments() {
        let mut cart = sample_cart();
        cart.update_quantity(ProductId::new(2), 4);
        assert_eq!(cart.get(ProductId::new(2)).unwrap().quantity, 5);
        assert_eq!(cart.total(), Decimal::from(45));
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut cart = sample_cart();
        cart.update_quantity(ProductId::new(99), -1);
        cart.remove_item(ProductId::new(99));
        assert_eq!(cart, sample_cart());
    }

    #[test]
    fn test_clamp_to_one_policy() {
        let mut cart = Cart::with_policy(QuantityPolicy::ClampToOne);
        cart.add_item(&dish(1, 10), 3);
        cart.update_quantity(ProductId::new(1), -7);

        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity, 1);

        cart.remove_item(ProductId::new(1));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cart = sample_cart();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_order_lines_snapshot() {
        let lines = sample_cart().order_lines();
        assert_eq!(
            lines,
            vec![
                OrderLine {
                    product_id: ProductId::new(1),
                    quantity: 2
                },
                OrderLine {
                    product_id: ProductId::new(2),
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn test_total_tracks_every_operation_sequence() {
        // Deterministic pseudo-random walk over the ledger operations.
        let mut cart = Cart::new();
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;

            let id = i64::try_from(seed % 6).unwrap();
            let price = i64::try_from(seed % 50).unwrap();
            match seed % 4 {
                0 => cart.add_item(&dish(id, price), u32::try_from(seed % 3).unwrap()),
                1 => cart.update_quantity(ProductId::new(id), i64::try_from(seed % 5).unwrap() - 2),
                2 => cart.remove_item(ProductId::new(id)),
                _ => cart.update_quantity(ProductId::new(id), 1),
            }

            let expected: Decimal = cart
                .iter()
                .map(|line| line.unit_price * Decimal::from(line.quantity))
                .sum();
            assert_eq!(cart.total(), expected);
            assert!(cart.total() >= Decimal::ZERO);
            assert!(cart.iter().all(|line| line.quantity >= 1));

            let mut ids: Vec<_> = cart.iter().map(|l| l.product_id).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), cart.len());
        }
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(sample_cart()).unwrap();
        assert_eq!(json["items"][0]["unit_price"], "10");
        assert_eq!(json["policy"], "remove_at_zero");
    }
}
