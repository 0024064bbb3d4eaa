//! Positive monetary amount in the smallest currency unit.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// A strictly positive amount in paise.
///
/// Integer minor units avoid floating-point drift; the processor reports
/// deposits the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    /// Creates a new Amount, rejecting zero and negative values.
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value < 0 {
            return Err(DomainError::NegativeAmount);
        }
        if value == 0 {
            return Err(DomainError::ValidationError(
                "Amount must be positive".into(),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the raw value in paise.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Largest balance this amount can be added to without overflowing.
    ///
    /// The SQL adapters bind this as the guard on their balance upserts.
    pub fn credit_ceiling(&self) -> i64 {
        i64::MAX - self.0
    }

    /// Adds this amount to an existing balance value.
    pub fn credit_to(&self, balance: i64) -> Result<i64, DomainError> {
        if balance > self.credit_ceiling() {
            return Err(DomainError::BalanceOverflow);
        }
        Ok(balance + self.0)
    }
}

impl TryFrom<i64> for Amount {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
