//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Balance, OnRampStatus, OnRampTransaction};

// ─────────────────────────────────────────────────────────────────────────────
// Bank webhook DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Payment confirmation posted by the bank.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookPayload {
    /// Token of the on-ramp transaction being confirmed
    #[schema(example = "abc")]
    pub token: String,
    /// User whose balance is credited
    #[schema(example = "u1")]
    pub user_identifier: String,
    /// Deposited amount in paise
    #[schema(example = 100)]
    pub amount: i64,
}

/// Acknowledgement returned to the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    #[schema(example = "Success")]
    pub message: String,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self {
            message: "Success".into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to initiate a deposit that the bank will later confirm.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InitiateOnRampRequest {
    #[schema(example = "u1")]
    pub user_id: String,
    /// Amount in paise
    #[schema(example = 100)]
    pub amount: i64,
    #[serde(default = "default_provider")]
    #[schema(example = "HDFC Bank")]
    pub provider: String,
    /// Optional caller-supplied token; generated when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_provider() -> String {
    "HDFC Bank".to_string()
}

/// On-ramp transaction as exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OnRampResponse {
    #[schema(example = "abc")]
    pub token: String,
    #[schema(example = "u1")]
    pub user_id: String,
    /// Amount in paise
    #[schema(example = 100)]
    pub amount: i64,
    pub status: OnRampStatus,
    #[schema(example = "HDFC Bank")]
    pub provider: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<OnRampTransaction> for OnRampResponse {
    fn from(tx: OnRampTransaction) -> Self {
        Self {
            token: tx.token.into(),
            user_id: tx.user_id.into(),
            amount: tx.amount.value(),
            status: tx.status,
            provider: tx.provider,
            created_at: tx.created_at,
            completed_at: tx.completed_at,
        }
    }
}

/// Balance as exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(example = "u1")]
    pub user_id: String,
    /// Available amount in paise
    #[schema(example = 600)]
    pub amount: i64,
    #[schema(example = 0)]
    pub locked: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            user_id: balance.user_id.into(),
            amount: balance.amount,
            locked: balance.locked,
            updated_at: balance.updated_at,
        }
    }
}
