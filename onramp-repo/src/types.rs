//! Database row types shared by the SQLite and PostgreSQL adapters.
//!
//! Timestamps are stored as TEXT in SQLite and TIMESTAMPTZ in PostgreSQL;
//! sqlx's chrono support decodes both into `DateTime<Utc>`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use onramp_types::{
    Amount, Balance, DomainError, OnRampStatus, OnRampToken, OnRampTransaction, RepoError, UserId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// On-ramp transaction row from database.
#[derive(FromRow)]
pub struct DbOnRampTransaction {
    pub token: String,
    pub user_id: String,
    pub amount: i64,
    pub status: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Balance row from database.
#[derive(FromRow)]
pub struct DbBalance {
    pub user_id: String,
    pub amount: i64,
    pub locked: i64,
    pub updated_at: DateTime<Utc>,
}

/// What a successful `PENDING -> SUCCESS` claim returns.
#[derive(FromRow)]
pub struct DbClaim {
    pub user_id: String,
    pub amount: i64,
}

/// Status-only row for classifying unclaimed tokens.
#[derive(FromRow)]
pub struct DbStatus {
    pub status: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Rows were written by this crate, so a parse failure means corrupt data.
fn corrupt(e: DomainError) -> RepoError {
    RepoError::Database(format!("Corrupt row: {}", e))
}

pub fn parse_status(s: &str) -> Result<OnRampStatus, RepoError> {
    s.parse().map_err(corrupt)
}

impl DbStatus {
    pub fn into_domain(self) -> Result<OnRampStatus, RepoError> {
        parse_status(&self.status)
    }
}

impl DbOnRampTransaction {
    /// Convert database row to domain OnRampTransaction.
    pub fn into_domain(self) -> Result<OnRampTransaction, RepoError> {
        Ok(OnRampTransaction {
            token: OnRampToken::new(self.token).map_err(corrupt)?,
            user_id: UserId::new(self.user_id).map_err(corrupt)?,
            amount: Amount::new(self.amount).map_err(corrupt)?,
            status: parse_status(&self.status)?,
            provider: self.provider,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

impl DbBalance {
    /// Convert database row to domain Balance.
    pub fn into_domain(self) -> Result<Balance, RepoError> {
        Ok(Balance {
            user_id: UserId::new(self.user_id).map_err(corrupt)?,
            amount: self.amount,
            locked: self.locked,
            updated_at: self.updated_at,
        })
    }
}

/// Maps an insert failure, turning a primary-key clash into `Conflict`.
pub fn insert_error(e: sqlx::Error, token: &OnRampToken) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(format!("On-ramp token {} already exists", token))
        }
        _ => RepoError::Database(e.to_string()),
    }
}
