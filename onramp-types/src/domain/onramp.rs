//! On-ramp transaction domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::amount::Amount;
use super::balance::UserId;
use crate::error::DomainError;

/// Opaque token that ties a bank deposit to an on-ramp transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "abc")]
pub struct OnRampToken(String);

impl OnRampToken {
    /// Creates a token from a string, rejecting blank values.
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::ValidationError("token cannot be empty".into()));
        }
        Ok(Self(token))
    }

    /// Generates a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OnRampToken {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OnRampToken> for String {
    fn from(token: OnRampToken) -> Self {
        token.0
    }
}

impl std::fmt::Display for OnRampToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OnRampToken {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Lifecycle of an on-ramp transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnRampStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl OnRampStatus {
    /// Whether a transaction in this status may move to `next`.
    ///
    /// Only pending transactions move, and only to a terminal status.
    pub fn can_transition_to(self, next: OnRampStatus) -> bool {
        matches!(
            (self, next),
            (OnRampStatus::Pending, OnRampStatus::Success)
                | (OnRampStatus::Pending, OnRampStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, OnRampStatus::Pending)
    }
}

impl AsRef<str> for OnRampStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OnRampStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for OnRampStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            other => Err(DomainError::ValidationError(format!(
                "Unknown on-ramp status: {}",
                other
            ))),
        }
    }
}

/// A user's deposit attempt, tracked from initiation to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnRampTransaction {
    pub token: OnRampToken,
    pub user_id: UserId,
    pub amount: Amount,
    pub status: OnRampStatus,
    /// Bank or processor that will confirm the deposit
    pub provider: String,
    pub created_at: DateTime<Utc>,
    /// Set when the transaction leaves `Pending`
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnRampTransaction {
    /// Creates a new pending transaction.
    pub fn pending(new: NewOnRampTransaction) -> Self {
        Self {
            token: new.token.unwrap_or_else(OnRampToken::generate),
            user_id: new.user_id,
            amount: new.amount,
            status: OnRampStatus::Pending,
            provider: new.provider,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Moves the transaction to a terminal status.
    pub fn transition(&mut self, next: OnRampStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Input for initiating a deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOnRampTransaction {
    /// Caller-chosen token; generated when absent
    pub token: Option<OnRampToken>,
    pub user_id: UserId,
    pub amount: Amount,
    pub provider: String,
}
