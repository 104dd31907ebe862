//! Contact form.

use chophouse_core::Email;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use super::{ApiClient, ApiError};

/// Errors from sending a contact message.
#[derive(Debug, Error)]
pub enum ContactError {
    /// Rejected locally before any request was made.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ContactError {
    /// Message safe to show a customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(message) => message.clone(),
            Self::Api(err) => err.user_message(),
        }
    }
}

/// Body of `POST /api/contact/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    /// Sent as an empty string when absent.
    pub phone: String,
    pub message: String,
}

impl ContactMessage {
    /// Validate and build a contact message.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError::Invalid`] if a name or the message is blank or
    /// the email is malformed.
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: &str,
        phone: Option<&str>,
        message: &str,
    ) -> Result<Self, ContactError> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(ContactError::Invalid(
                "Please enter your first and last name.".to_string(),
            ));
        }
        let email = Email::parse(email)
            .map_err(|_| ContactError::Invalid("Please enter a valid email address.".to_string()))?;
        let message = message.trim();
        if message.is_empty() {
            return Err(ContactError::Invalid("Please enter a message.".to_string()));
        }

        Ok(Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email,
            phone: phone.map(str::trim).unwrap_or_default().to_string(),
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ContactResponse {
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    /// Send a contact message. Returns the backend's confirmation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the message or the request
    /// fails.
    #[instrument(skip(self, message), fields(email = %message.email))]
    pub async fn send_contact_message(&self, message: &ContactMessage) -> Result<String, ContactError> {
        let response: ContactResponse = self.post_json("api/contact/", message).await?;
        tracing::info!("Contact message sent");
        Ok(response
            .message
            .unwrap_or_else(|| "Thank you for your message! We'll get back to you soon.".to_string()))
    }
}
