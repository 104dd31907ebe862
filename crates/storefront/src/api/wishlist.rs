//! Per-customer wishlist, keyed by email.

use chophouse_core::{Email, ProductId, WishlistItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use super::catalog::Product;
use super::{ApiClient, ApiError, Listing};

/// Errors from wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// Wishlists need a signed-in customer with an email.
    #[error("Please sign in to use your wishlist.")]
    NotSignedIn,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl WishlistError {
    /// Message safe to show a customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotSignedIn => self.to_string(),
            Self::Api(err) => err.user_message(),
        }
    }
}

/// A saved product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub product: Product,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

impl ApiClient {
    /// Saved products for `email`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email))]
    pub async fn wishlist(&self, email: &Email) -> Result<Vec<WishlistItem>, ApiError> {
        Ok(self
            .get_json::<Listing<WishlistItem>>(
                "api/wishlist/",
                &[("customer_email", email.to_string())],
            )
            .await?
            .into_vec())
    }

    /// Save a product. Saving one that is already saved succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email), fields(product_id = %product))]
    pub async fn add_to_wishlist(&self, email: &Email, product: ProductId) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "customer_email": email,
            "product": product,
        });
        match self.post_json_raw("api/wishlist/", &body).await {
            Ok(_) => Ok(()),
            Err(err) if err.status() == Some(400) && err.mentions("unique") => {
                tracing::debug!("Product already in wishlist");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Remove a saved product. Returns `false` if it was not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails for any reason other than
    /// the item being absent.
    #[instrument(skip(self, email), fields(product_id = %product))]
    pub async fn remove_from_wishlist(
        &self,
        email: &Email,
        product: ProductId,
    ) -> Result<bool, ApiError> {
        let body = serde_json::json!({
            "user_email": email,
            "product": product,
        });
        match self.post_json_raw("api/wishlist/remove_item/", &body).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_wishlist_item() {
        let json = r#"{
            "id": 11,
            "product": {"id": 2, "name": "Zobo", "price": "800.00", "category": "beverages"},
            "added_at": "2025-04-01T12:00:00Z"
        }"#;
        let item: WishlistItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.product.id, ProductId::new(2));
        assert!(item.product.is_available);
    }

    #[test]
    fn test_not_signed_in_message() {
        assert_eq!(
            WishlistError::NotSignedIn.user_message(),
            "Please sign in to use your wishlist."
        );
    }
}
