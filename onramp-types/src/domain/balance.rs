//! User balance domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::amount::Amount;
use crate::error::DomainError;

/// Identifier of the user that owns a balance.
///
/// Issued by the user service; treated as an opaque non-empty string here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "u1")]
pub struct UserId(String);

impl UserId {
    /// Creates a UserId, rejecting blank identifiers.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "user_identifier cannot be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Spendable funds held for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: UserId,
    /// Available amount in paise
    pub amount: i64,
    /// Amount reserved by in-flight operations, in paise
    pub locked: i64,
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// Creates an empty balance for a user.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            amount: 0,
            locked: 0,
            updated_at: Utc::now(),
        }
    }

    /// Credits (adds) money to the balance.
    pub fn credit(&mut self, amount: Amount) -> Result<(), DomainError> {
        self.amount = amount.credit_to(self.amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}
