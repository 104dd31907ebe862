//! Checkout step controller.
//!
//! A [`CheckoutSession`] walks an ordered pipeline of information-collection
//! steps. Forward moves validate the step being left; backward moves never
//! validate. The payment step can only be left forward by a confirmed
//! payment, which the storefront's payment adapter reports through
//! [`CheckoutSession::complete_payment`].
//!
//! ```text
//! Cart ──begin──► CustomerInfo ──next──► DeliveryInfo ──next──► Payment ──paid──► Complete
//!  ▲                   │  ◄──prev──           │  ◄──prev──          │
//!  └─continue_shopping─┴──────────────────────┴─────────────────────┘
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::types::{CheckoutSessionId, Email, EmailError};

/// Steps of the checkout pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Browsing the cart; checkout not entered.
    #[default]
    Cart,
    CustomerInfo,
    DeliveryInfo,
    Payment,
    /// Terminal: the order has been paid and confirmed.
    Complete,
}

impl CheckoutStep {
    /// The step before this one. `Cart` and `Complete` have none.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Cart | Self::Complete => None,
            Self::CustomerInfo => Some(Self::Cart),
            Self::DeliveryInfo => Some(Self::CustomerInfo),
            Self::Payment => Some(Self::DeliveryInfo),
        }
    }

    /// One-based position shown in step indicators (`Cart` is 0).
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Cart => 0,
            Self::CustomerInfo => 1,
            Self::DeliveryInfo => 2,
            Self::Payment => 3,
            Self::Complete => 4,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::CustomerInfo => "customer_info",
            Self::DeliveryInfo => "delivery_info",
            Self::Payment => "payment",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of the payment attempt for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    #[default]
    Idle,
    /// A submission is running. Hosts should disable cart and step controls.
    Processing,
    Succeeded,
    Failed,
}

/// Required form fields, used to name the first missing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutField {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    State,
    ZipCode,
}

impl CheckoutField {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Address => "Address",
            Self::City => "City",
            Self::State => "State",
            Self::ZipCode => "ZIP code",
        }
    }
}

/// Validation and transition errors raised by the step controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("{} is required", .field.label())]
    MissingField { field: CheckoutField },

    #[error("please enter a valid email address ({0})")]
    InvalidEmail(#[from] EmailError),

    #[error("checkout has not been started")]
    NotStarted,

    #[error("complete payment to finish checkout")]
    PaymentRequired,

    #[error("checkout is already complete")]
    AlreadyComplete,

    #[error("a payment is already being processed")]
    PaymentInProgress,

    #[error("orders can only be placed from the payment step (currently at {0})")]
    NotAtPayment(CheckoutStep),

    #[error("no payment is being processed")]
    PaymentNotStarted,
}

/// Customer contact details collected in the first checkout step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerInfo {
    /// "First Last", trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_owned()
    }

    /// The parsed and normalized email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is malformed.
    pub fn email(&self) -> Result<Email, EmailError> {
        Email::parse(&self.email)
    }
}

/// Delivery details collected in the second checkout step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl DeliveryInfo {
    /// Single-line address, e.g. "12 Marina Rd, Lagos, LA 101001".
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {} {}",
            self.address.trim(),
            self.city.trim(),
            self.state.trim(),
            self.zip_code.trim()
        )
    }

    /// Delivery instructions, or `None` if blank.
    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn require(value: &str, field: CheckoutField) -> Result<(), CheckoutError> {
    if value.trim().is_empty() {
        return Err(CheckoutError::MissingField { field });
    }
    Ok(())
}

/// Check that every customer field is filled and the email parses.
///
/// # Errors
///
/// Returns the first missing field, in form order, or an invalid email.
pub fn validate_customer_info(info: &CustomerInfo) -> Result<(), CheckoutError> {
    require(&info.first_name, CheckoutField::FirstName)?;
    require(&info.last_name, CheckoutField::LastName)?;
    require(&info.email, CheckoutField::Email)?;
    require(&info.phone, CheckoutField::Phone)?;
    info.email()?;
    Ok(())
}

/// Check that every required delivery field is filled.
///
/// # Errors
///
/// Returns the first missing field, in form order.
pub fn validate_delivery_info(info: &DeliveryInfo) -> Result<(), CheckoutError> {
    require(&info.address, CheckoutField::Address)?;
    require(&info.city, CheckoutField::City)?;
    require(&info.state, CheckoutField::State)?;
    require(&info.zip_code, CheckoutField::ZipCode)?;
    Ok(())
}

/// State of one checkout attempt.
///
/// Form fields are public so a host can bind inputs to them directly; the
/// step and payment state only change through the methods below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    id: CheckoutSessionId,
    step: CheckoutStep,
    pub customer_info: CustomerInfo,
    pub delivery_info: DeliveryInfo,
    payment_state: PaymentState,
    error_message: Option<String>,
}

impl Default for CheckoutSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutSession {
    /// A fresh session sitting at [`CheckoutStep::Cart`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: CheckoutSessionId::generate(),
            step: CheckoutStep::Cart,
            customer_info: CustomerInfo::default(),
            delivery_info: DeliveryInfo::default(),
            payment_state: PaymentState::Idle,
            error_message: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> CheckoutSessionId {
        self.id
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn payment_state(&self) -> PaymentState {
        self.payment_state
    }

    /// Message from the last failed transition or payment attempt.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Advisory lock: true while a payment submission is running.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.payment_state == PaymentState::Processing
    }

    /// Whether the checkout flow is open (any step past `Cart`).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.step != CheckoutStep::Cart
    }

    /// Enter checkout from the cart.
    ///
    /// Calling this while already past `Cart` leaves the step unchanged.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyCart`] if the cart has no lines, or
    /// [`CheckoutError::PaymentInProgress`] while processing.
    pub fn begin(&mut self, cart: &Cart) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_unlocked()?;
        if cart.is_empty() {
            return Err(self.reject(CheckoutError::EmptyCart));
        }
        if self.step == CheckoutStep::Cart {
            self.step = CheckoutStep::CustomerInfo;
        }
        self.error_message = None;
        Ok(self.step)
    }

    /// Advance one step, validating the step being left.
    ///
    /// # Errors
    ///
    /// Validation failures leave the step unchanged and are also recorded
    /// in [`CheckoutSession::error_message`].
    pub fn next_step(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_unlocked()?;
        let outcome = match self.step {
            CheckoutStep::Cart => Err(CheckoutError::NotStarted),
            CheckoutStep::CustomerInfo => {
                validate_customer_info(&self.customer_info).map(|()| CheckoutStep::DeliveryInfo)
            }
            CheckoutStep::DeliveryInfo => {
                validate_delivery_info(&self.delivery_info).map(|()| CheckoutStep::Payment)
            }
            CheckoutStep::Payment => Err(CheckoutError::PaymentRequired),
            CheckoutStep::Complete => Err(CheckoutError::AlreadyComplete),
        };

        match outcome {
            Ok(step) => {
                self.step = step;
                self.error_message = None;
                Ok(step)
            }
            Err(err) => Err(self.reject(err)),
        }
    }

    /// Move one step back without validation. No-op at `Cart` and `Complete`.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::PaymentInProgress`] while processing.
    pub fn prev_step(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_unlocked()?;
        if let Some(previous) = self.step.previous() {
            self.step = previous;
            self.error_message = None;
        }
        Ok(self.step)
    }

    /// Leave checkout for the cart, keeping everything entered so far.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::PaymentInProgress`] while processing.
    pub fn continue_shopping(&mut self) -> Result<(), CheckoutError> {
        self.ensure_unlocked()?;
        self.step = CheckoutStep::Cart;
        self.error_message = None;
        Ok(())
    }

    /// Take the advisory lock for a payment submission.
    ///
    /// Both forms are re-validated since their fields are publicly mutable.
    ///
    /// # Errors
    ///
    /// Fails unless the session is at `Payment`, idle or failed, with a
    /// non-empty cart and complete forms.
    pub fn start_payment(&mut self, cart: &Cart) -> Result<(), CheckoutError> {
        self.ensure_unlocked()?;
        if self.step != CheckoutStep::Payment {
            return Err(CheckoutError::NotAtPayment(self.step));
        }
        if cart.is_empty() {
            return Err(self.reject(CheckoutError::EmptyCart));
        }
        if let Err(err) = validate_customer_info(&self.customer_info)
            .and_then(|()| validate_delivery_info(&self.delivery_info))
        {
            return Err(self.reject(err));
        }

        self.payment_state = PaymentState::Processing;
        self.error_message = None;
        Ok(())
    }

    /// Record a terminal payment failure. The step stays at `Payment`.
    ///
    /// # Errors
    ///
    /// Fails unless a submission started with [`Self::start_payment`] is running.
    pub fn fail_payment(&mut self, message: impl Into<String>) -> Result<(), CheckoutError> {
        self.ensure_processing()?;
        self.payment_state = PaymentState::Failed;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Record a confirmed payment and move to `Complete`.
    ///
    /// # Errors
    ///
    /// Fails unless a submission started with [`Self::start_payment`] is running.
    pub fn complete_payment(&mut self) -> Result<(), CheckoutError> {
        self.ensure_processing()?;
        self.payment_state = PaymentState::Succeeded;
        self.step = CheckoutStep::Complete;
        self.error_message = None;
        Ok(())
    }

    /// Replace this session with a fresh default under a new id.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn ensure_unlocked(&self) -> Result<(), CheckoutError> {
        if self.is_processing() {
            return Err(CheckoutError::PaymentInProgress);
        }
        Ok(())
    }

    fn ensure_processing(&self) -> Result<(), CheckoutError> {
        if self.step != CheckoutStep::Payment {
            return Err(CheckoutError::NotAtPayment(self.step));
        }
        if !self.is_processing() {
            return Err(CheckoutError::PaymentNotStarted);
        }
        Ok(())
    }

    fn reject(&mut self, err: CheckoutError) -> CheckoutError {
        self.error_message = Some(err.to_string());
        err
    }
}
