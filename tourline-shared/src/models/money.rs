use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary amount in minor units (cents) with an ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount_minor: i64, currency: impl Into<String>) -> Self {
        Self {
            amount_minor,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(0, currency)
    }

    /// Round a major-unit figure (e.g. 12.345 EUR) to the nearest minor unit.
    /// Returns None for NaN or infinite input.
    pub fn from_major(amount: f64, currency: impl Into<String>) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        Some(Self::new((amount * 100.0).round() as i64, currency))
    }

    pub fn as_major(&self) -> f64 {
        self.amount_minor as f64 / 100.0
    }

    /// Sum of two amounts; None when currencies differ or the sum overflows.
    pub fn checked_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        let amount_minor = self.amount_minor.checked_add(other.amount_minor)?;
        Some(Self::new(amount_minor, self.currency.clone()))
    }

    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        write!(f, "{}{}.{:02} {}", sign, abs / 100, abs % 100, self.currency)
    }
}
