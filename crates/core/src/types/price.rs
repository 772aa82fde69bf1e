//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A regular price with its currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code as reported by the backend (e.g., "USD").
    pub currency_code: String,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub fn new(amount: Decimal, currency_code: impl Into<String>) -> Self {
        Self {
            amount,
            currency_code: currency_code.into(),
        }
    }

    /// Format as `"<currency> <amount>"`, e.g. `"USD 29.5"`.
    #[must_use]
    pub fn formatted(&self) -> String {
        format!("{} {}", self.currency_code, self.amount.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_price() {
        let price = Price::new(Decimal::new(2950, 2), "USD");
        assert_eq!(price.formatted(), "USD 29.5");
    }

    #[test]
    fn test_formatted_price_whole_amount() {
        let price = Price::new(Decimal::new(100, 0), "EUR");
        assert_eq!(price.formatted(), "EUR 100");
    }
}
