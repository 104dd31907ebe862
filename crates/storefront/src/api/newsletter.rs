//! Newsletter subscription management.

use chophouse_core::Email;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use super::{ApiClient, ApiError, decode};

/// Errors from newsletter operations.
#[derive(Debug, Error)]
pub enum NewsletterError {
    /// The email is not on the subscriber list.
    #[error("Email not found in our subscribers list.")]
    NotSubscribed,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl NewsletterError {
    /// Message safe to show a customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotSubscribed => self.to_string(),
            Self::Api(err) => err.user_message(),
        }
    }
}

/// What a subscribe call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// New subscriber.
    Subscribed,
    /// Already active; nothing changed.
    AlreadySubscribed,
    /// Previously unsubscribed; reactivated.
    Resubscribed,
}

/// Result of a subscribe call with the backend's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub status: SubscriptionStatus,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: String,
}

/// The backend answers both repeat cases with 200 and tells them apart
/// only by message.
fn classify(status: StatusCode, message: &str) -> SubscriptionStatus {
    let lower = message.to_lowercase();
    if status == StatusCode::CREATED {
        SubscriptionStatus::Subscribed
    } else if lower.contains("resubscribed") || lower.contains("welcome back") {
        SubscriptionStatus::Resubscribed
    } else if lower.contains("already") {
        SubscriptionStatus::AlreadySubscribed
    } else {
        SubscriptionStatus::Subscribed
    }
}

impl ApiClient {
    /// Subscribe `email` to the newsletter.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email, first_name, last_name))]
    pub async fn subscribe_newsletter(
        &self,
        email: &Email,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Subscription, NewsletterError> {
        let body = serde_json::json!({
            "email": email,
            "first_name": first_name.unwrap_or_default().trim(),
            "last_name": last_name.unwrap_or_default().trim(),
        });
        let (status, text) = self
            .post_json_raw("api/newsletter-subscribers/subscribe/", &body)
            .await?;
        let MessageBody { message } = decode(&text)?;
        let status = classify(status, &message);

        tracing::info!(status = ?status, "Newsletter subscription");
        Ok(Subscription { status, message })
    }

    /// Unsubscribe `email`. Returns the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns [`NewsletterError::NotSubscribed`] if the email is unknown.
    #[instrument(skip(self, email))]
    pub async fn unsubscribe_newsletter(&self, email: &Email) -> Result<String, NewsletterError> {
        let body = serde_json::json!({ "email": email });
        match self
            .post_json_raw("api/newsletter-subscribers/unsubscribe/", &body)
            .await
        {
            Ok((_, text)) => {
                let MessageBody { message } = decode(&text)?;
                Ok(message)
            }
            Err(err) if err.is_not_found() => Err(NewsletterError::NotSubscribed),
            Err(err) => Err(err.into()),
        }
    }
}
