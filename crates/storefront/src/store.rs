//! Per-customer storefront state.
//!
//! A [`Storefront`] owns the cart, the checkout session, the customer's
//! identity, and the last order result. The host constructs one per
//! customer and injects the order API and payment gateway it should use.

use std::collections::BTreeSet;

use chophouse_core::{
    Cart, CheckoutError, CheckoutSession, CheckoutStep, CurrencyCode, Email, OrderSubmissionResult,
    Price, ProductId, Purchasable,
};
use tracing::instrument;

use crate::api::ApiClient;
use crate::api::orders::OrderApi;
use crate::api::wishlist::WishlistError;
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::payment::{PaymentAdapter, PaymentGateway};

/// Who is shopping, as reported by the host's auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub authenticated: bool,
    pub email: Option<Email>,
}

impl Identity {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn signed_in(email: Email) -> Self {
        Self {
            authenticated: true,
            email: Some(email),
        }
    }

    /// The email wishlist calls are keyed by, if signed in.
    #[must_use]
    pub fn wishlist_email(&self) -> Option<&Email> {
        self.email.as_ref().filter(|_| self.authenticated)
    }
}

/// Cart, checkout, and order state for one customer.
pub struct Storefront<O, G> {
    adapter: PaymentAdapter<O, G>,
    currency: CurrencyCode,
    cart: Cart,
    cart_open: bool,
    checkout: Option<CheckoutSession>,
    identity: Identity,
    wishlist: BTreeSet<ProductId>,
    last_result: Option<OrderSubmissionResult>,
}

impl<O: OrderApi, G: PaymentGateway> Storefront<O, G> {
    /// An empty storefront for an anonymous customer.
    #[must_use]
    pub fn new(orders: O, gateway: G, currency: CurrencyCode) -> Self {
        Self::with_cart(orders, gateway, currency, Cart::new())
    }

    /// A storefront starting from an existing cart, e.g. one with a
    /// non-default quantity policy.
    #[must_use]
    pub fn with_cart(orders: O, gateway: G, currency: CurrencyCode, cart: Cart) -> Self {
        Self {
            adapter: PaymentAdapter::new(orders, gateway, currency),
            currency,
            cart,
            cart_open: false,
            checkout: None,
            identity: Identity::anonymous(),
            wishlist: BTreeSet::new(),
            last_result: None,
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Replace the customer identity. Signing out forgets the wishlist.
    pub fn set_identity(&mut self, identity: Identity) {
        match identity.wishlist_email() {
            Some(email) => set_sentry_user(email.as_str()),
            None => {
                clear_sentry_user();
                self.wishlist.clear();
            }
        }
        self.identity = identity;
    }

    // =========================================================================
    // Cart
    // =========================================================================

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Whether the cart panel should be shown.
    #[must_use]
    pub const fn is_cart_open(&self) -> bool {
        self.cart_open
    }

    pub fn set_cart_open(&mut self, open: bool) {
        self.cart_open = open;
    }

    /// Add `quantity` of a product and open the cart panel.
    pub fn add_to_cart<P: Purchasable + ?Sized>(&mut self, product: &P, quantity: u32) {
        self.cart.add_item(product, quantity);
        self.cart_open = true;
        let product_id = product.product_id().to_string();
        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[("product_id", product_id.as_str())]),
        );
    }

    pub fn update_quantity(&mut self, product_id: ProductId, delta: i64) {
        self.cart.update_quantity(product_id, delta);
        let product_id = product_id.to_string();
        let delta = delta.to_string();
        add_breadcrumb(
            "cart",
            "Quantity updated",
            Some(&[("product_id", product_id.as_str()), ("delta", delta.as_str())]),
        );
    }

    pub fn remove_from_cart(&mut self, product_id: ProductId) {
        self.cart.remove_item(product_id);
        let product_id = product_id.to_string();
        add_breadcrumb(
            "cart",
            "Removed from cart",
            Some(&[("product_id", product_id.as_str())]),
        );
    }

    #[must_use]
    pub fn cart_total(&self) -> Price {
        self.cart.total_price(self.currency)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// The open checkout session, if any.
    #[must_use]
    pub const fn checkout(&self) -> Option<&CheckoutSession> {
        self.checkout.as_ref()
    }

    /// Mutable access for binding form fields.
    pub fn checkout_mut(&mut self) -> Option<&mut CheckoutSession> {
        self.checkout.as_mut()
    }

    /// Enter checkout, creating a session or resuming the preserved one.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyCart`] if the cart is empty; no session is
    /// created in that case.
    pub fn begin_checkout(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let step = match self.checkout.as_mut() {
            Some(session) => session.begin(&self.cart)?,
            None => {
                let mut session = CheckoutSession::new();
                let step = session.begin(&self.cart)?;
                self.checkout = Some(session);
                step
            }
        };
        self.cart_open = false;
        add_breadcrumb("checkout", "Checkout started", None);
        Ok(step)
    }

    /// # Errors
    ///
    /// Validation failures from the session, or
    /// [`CheckoutError::NotStarted`] without a session.
    pub fn next_step(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let step = self.session_mut()?.next_step()?;
        add_breadcrumb("checkout", "Step advanced", Some(&[("step", step.as_str())]));
        Ok(step)
    }

    /// # Errors
    ///
    /// [`CheckoutError::NotStarted`] without a session.
    pub fn prev_step(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.session_mut()?.prev_step()
    }

    /// Back to the cart, keeping the session and everything entered.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NotStarted`] without a session.
    pub fn continue_shopping(&mut self) -> Result<(), CheckoutError> {
        self.session_mut()?.continue_shopping()?;
        self.cart_open = true;
        Ok(())
    }

    /// Discard the checkout session. The cart is kept.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::PaymentInProgress`] while a payment is running.
    pub fn cancel_checkout(&mut self) -> Result<(), CheckoutError> {
        if self.checkout.as_ref().is_some_and(CheckoutSession::is_processing) {
            return Err(CheckoutError::PaymentInProgress);
        }
        if self.checkout.take().is_some() {
            add_breadcrumb("checkout", "Checkout cancelled", None);
        }
        Ok(())
    }

    /// Create, pay for, and confirm the order.
    ///
    /// On success the cart is cleared and the session reset. On failure
    /// both are kept so the customer can retry.
    #[instrument(skip(self))]
    pub async fn place_order(&mut self) -> OrderSubmissionResult {
        let result = match self.checkout.as_mut() {
            None => OrderSubmissionResult::failed(CheckoutError::NotStarted.to_string()),
            Some(session) => match self.adapter.submit(session, &self.cart).await {
                Ok(placed) => {
                    self.cart.clear();
                    session.reset();
                    OrderSubmissionResult::succeeded(placed.summary)
                }
                Err(failure) => OrderSubmissionResult::failed(failure.user_message()),
            },
        };
        self.last_result = Some(result.clone());
        result
    }

    /// Outcome of the most recent `place_order`.
    #[must_use]
    pub const fn last_result(&self) -> Option<&OrderSubmissionResult> {
        self.last_result.as_ref()
    }

    pub fn dismiss_result(&mut self) {
        self.last_result = None;
    }

    fn session_mut(&mut self) -> Result<&mut CheckoutSession, CheckoutError> {
        self.checkout.as_mut().ok_or(CheckoutError::NotStarted)
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: ProductId) -> bool {
        self.wishlist.contains(&product_id)
    }

    /// Product ids saved for the signed-in customer.
    #[must_use]
    pub const fn wishlist(&self) -> &BTreeSet<ProductId> {
        &self.wishlist
    }

    fn wishlist_email(&self) -> Result<Email, WishlistError> {
        self.identity
            .wishlist_email()
            .cloned()
            .ok_or(WishlistError::NotSignedIn)
    }

    /// Reload saved product ids from the backend.
    ///
    /// # Errors
    ///
    /// [`WishlistError::NotSignedIn`] for anonymous customers, or the API
    /// error.
    pub async fn sync_wishlist(&mut self, api: &ApiClient) -> Result<usize, WishlistError> {
        let email = self.wishlist_email()?;
        let items = api.wishlist(&email).await?;
        self.wishlist = items.into_iter().map(|item| item.product.id).collect();
        Ok(self.wishlist.len())
    }

    /// Save or unsave a product. Returns whether it is now saved.
    ///
    /// # Errors
    ///
    /// [`WishlistError::NotSignedIn`] for anonymous customers, or the API
    /// error; local state is unchanged on error.
    pub async fn toggle_wishlist(
        &mut self,
        api: &ApiClient,
        product_id: ProductId,
    ) -> Result<bool, WishlistError> {
        let email = self.wishlist_email()?;
        if self.wishlist.contains(&product_id) {
            api.remove_from_wishlist(&email, product_id).await?;
            self.wishlist.remove(&product_id);
            Ok(false)
        } else {
            api.add_to_wishlist(&email, product_id).await?;
            self.wishlist.insert(product_id);
            Ok(true)
        }
    }
}
