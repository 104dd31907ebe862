//! Product reviews, star ratings, and comments.
//!
//! The backend allows one review, one rating, and one comment per email per
//! product. It reports a second submission as a uniqueness violation, which
//! is mapped to [`ReviewError::AlreadySubmitted`].

use chophouse_core::{CommentId, Email, ProductId, RatingId, ReviewId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use super::{ApiClient, ApiError, Listing};

/// Lowest accepted star rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted star rating.
pub const MAX_RATING: u8 = 5;

/// Which kind of feedback a customer already left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Review,
    Rating,
    Comment,
}

/// Errors from submitting feedback.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Rejected locally before any request was made.
    #[error("{0}")]
    Invalid(String),

    /// The backend already has feedback of this kind from this email.
    #[error("{}", already_submitted_message(*.0))]
    AlreadySubmitted(FeedbackKind),

    #[error(transparent)]
    Api(#[from] ApiError),
}

const fn already_submitted_message(kind: FeedbackKind) -> &'static str {
    match kind {
        FeedbackKind::Review => "You have already submitted a review for this product.",
        FeedbackKind::Rating => "You have already rated this product.",
        FeedbackKind::Comment => "You have already commented on this product.",
    }
}

impl ReviewError {
    /// Message safe to show a customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(_) | Self::AlreadySubmitted(_) => self.to_string(),
            Self::Api(err) => err.user_message(),
        }
    }

    fn from_api(err: ApiError, kind: FeedbackKind) -> Self {
        if err.status() == Some(400) && err.mentions("unique") {
            Self::AlreadySubmitted(kind)
        } else {
            Self::Api(err)
        }
    }
}

/// A published review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub customer_name: String,
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub is_verified_purchase: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A standalone star rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRating {
    pub id: RatingId,
    pub product: ProductId,
    /// Backend account id, when the rater was signed in.
    #[serde(default)]
    pub user: Option<i64>,
    pub rating: u8,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A standalone comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductComment {
    pub id: CommentId,
    pub product: ProductId,
    #[serde(default)]
    pub user: Option<i64>,
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /api/reviews/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub product: ProductId,
    pub customer_name: String,
    pub customer_email: Email,
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    /// Validate and build a review submission.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Invalid`] if the name or comment is blank, the
    /// email is malformed, or the rating is outside 1-5.
    pub fn new(
        product: ProductId,
        customer_name: &str,
        customer_email: &str,
        rating: u8,
        comment: &str,
    ) -> Result<Self, ReviewError> {
        let customer_name = customer_name.trim();
        if customer_name.is_empty() {
            return Err(ReviewError::Invalid("Please enter your name.".to_string()));
        }
        let customer_email = Email::parse(customer_email)
            .map_err(|_| ReviewError::Invalid("Please enter a valid email address.".to_string()))?;
        validate_rating(rating)?;
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ReviewError::Invalid("Please write a comment.".to_string()));
        }

        Ok(Self {
            product,
            customer_name: customer_name.to_string(),
            customer_email,
            rating,
            comment: comment.to_string(),
        })
    }
}

fn validate_rating(rating: u8) -> Result<(), ReviewError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ReviewError::Invalid(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING} stars."
        )))
    }
}

/// Success body shared by feedback endpoints.
#[derive(Debug, Deserialize)]
struct Acknowledgement {
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    /// Submit a review. Returns the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::AlreadySubmitted`] on a repeat review, or the
    /// underlying API error.
    #[instrument(skip(self, review), fields(product_id = %review.product, rating = review.rating))]
    pub async fn submit_review(&self, review: &NewReview) -> Result<String, ReviewError> {
        let ack: Acknowledgement = self
            .post_json("api/reviews/", review)
            .await
            .map_err(|e| ReviewError::from_api(e, FeedbackKind::Review))?;

        tracing::info!("Review submitted");
        Ok(ack
            .message
            .unwrap_or_else(|| "Review submitted successfully!".to_string()))
    }

    /// Reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn reviews_for_product(&self, product: ProductId) -> Result<Vec<Review>, ApiError> {
        Ok(self
            .get_json::<Listing<Review>>(
                "api/reviews/by_product/",
                &[("product_id", product.to_string())],
            )
            .await?
            .into_vec())
    }

    /// Star ratings for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn ratings_for_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<ProductRating>, ApiError> {
        Ok(self
            .get_json::<Listing<ProductRating>>(
                "api/product-ratings/",
                &[("product_id", product.to_string())],
            )
            .await?
            .into_vec())
    }

    /// Rate a product as `email`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Invalid`] for an out-of-range rating,
    /// [`ReviewError::AlreadySubmitted`] on a repeat, or the API error.
    #[instrument(skip(self, email), fields(product_id = %product))]
    pub async fn rate_product(
        &self,
        product: ProductId,
        email: &Email,
        rating: u8,
    ) -> Result<(), ReviewError> {
        validate_rating(rating)?;
        let body = serde_json::json!({
            "product": product,
            "rating": rating,
            "user_email": email,
        });
        self.post_json_raw("api/product-ratings/", &body)
            .await
            .map_err(|e| ReviewError::from_api(e, FeedbackKind::Rating))?;
        Ok(())
    }

    /// Comments on a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn comments_for_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<ProductComment>, ApiError> {
        Ok(self
            .get_json::<Listing<ProductComment>>(
                "api/product-comments/",
                &[("product_id", product.to_string())],
            )
            .await?
            .into_vec())
    }

    /// Comment on a product as `email`.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Invalid`] for a blank comment,
    /// [`ReviewError::AlreadySubmitted`] on a repeat, or the API error.
    #[instrument(skip(self, email, comment), fields(product_id = %product))]
    pub async fn comment_on_product(
        &self,
        product: ProductId,
        email: &Email,
        comment: &str,
    ) -> Result<(), ReviewError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ReviewError::Invalid("Please write a comment.".to_string()));
        }
        let body = serde_json::json!({
            "product": product,
            "comment": comment,
            "user_email": email,
        });
        self.post_json_raw("api/product-comments/", &body)
            .await
            .map_err(|e| ReviewError::from_api(e, FeedbackKind::Comment))?;
        Ok(())
    }
}
