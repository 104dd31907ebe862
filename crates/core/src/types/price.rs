//! Type-safe price representation using decimal arithmetic.
//!
//! Menu prices come from the backend as decimal strings with two places.
//! Gateways want integer minor units (kobo for NGN, cents for USD), so the
//! conversion lives here rather than at each call site.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., naira, not kobo).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Amount in minor units, rounded half away from zero.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        let scaled = (self.amount * Decimal::from(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        i64::try_from(scaled).ok()
    }

    /// Format for display (e.g., "₦2,500.00").
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let text = format!("{:.2}", rounded.abs());
        let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
        format!(
            "{}{}{}.{}",
            if negative { "-" } else { "" },
            self.currency_code.symbol(),
            group_thousands(whole),
            frac
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// ISO 4217 currency codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    NGN,
    USD,
    GBP,
    EUR,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::NGN => "₦",
            Self::USD => "$",
            Self::GBP => "£",
            Self::EUR => "€",
        }
    }

    /// Lowercase code as gateways expect it.
    #[must_use]
    pub const fn as_lowercase(&self) -> &'static str {
        match self {
            Self::NGN => "ngn",
            Self::USD => "usd",
            Self::GBP => "gbp",
            Self::EUR => "eur",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Self::NGN),
            "USD" => Ok(Self::USD),
            "GBP" => Ok(Self::GBP),
            "EUR" => Ok(Self::EUR),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units() {
        let price = Price::new(Decimal::new(250_050, 2), CurrencyCode::NGN);
        assert_eq!(price.to_minor_units(), Some(250_050));

        let half = Price::new(Decimal::new(10_005, 3), CurrencyCode::USD);
        assert_eq!(half.to_minor_units(), Some(1001));
    }

    #[test]
    fn test_display_groups_thousands() {
        let price = Price::new(Decimal::new(1_234_567, 2), CurrencyCode::NGN);
        assert_eq!(price.display(), "₦12,345.67");
        assert_eq!(Price::zero(CurrencyCode::USD).display(), "$0.00");
        assert_eq!(
            Price::new(Decimal::new(999, 0), CurrencyCode::GBP).to_string(),
            "£999.00"
        );
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("ngn".parse::<CurrencyCode>().unwrap(), CurrencyCode::NGN);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
