//! Ledger store port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory test doubles) implement this trait.

use crate::domain::{
    Amount, Balance, CreditOutcome, NewOnRampTransaction, OnRampStatus, OnRampToken,
    OnRampTransaction, PaymentNotification, UserId,
};
use crate::error::RepoError;

/// Balance and on-ramp transaction persistence.
///
/// Every operation that touches a balance MUST be atomic.
/// Implementations should use database transactions to ensure consistency.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // On-ramp transactions
    // ─────────────────────────────────────────────────────────────────────────────

    /// Records a new pending transaction. A reused token is a `Conflict`.
    async fn create_onramp_transaction(
        &self,
        new: NewOnRampTransaction,
    ) -> Result<OnRampTransaction, RepoError>;

    /// Gets a transaction by its token.
    async fn get_onramp_transaction(
        &self,
        token: &OnRampToken,
    ) -> Result<Option<OnRampTransaction>, RepoError>;

    /// Moves a pending transaction to `status`.
    ///
    /// `NotFound` for an unknown token; `InvalidTransition` when the
    /// transaction is no longer pending.
    async fn update_transaction_status(
        &self,
        token: &OnRampToken,
        status: OnRampStatus,
    ) -> Result<OnRampTransaction, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Balances
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets the balance of a user.
    async fn get_balance(&self, user_id: &UserId) -> Result<Option<Balance>, RepoError>;

    /// Increments a user's balance, opening it at zero if needed.
    async fn update_balance(&self, user_id: &UserId, delta: Amount)
    -> Result<Balance, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Combined (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Applies a payment confirmation: credits the balance and marks the
    /// transaction `Success` in one unit, at most once per token.
    ///
    /// Concurrent calls for the same token must serialize so that exactly
    /// one of them returns `Credited`.
    async fn confirm_onramp(
        &self,
        notification: &PaymentNotification,
    ) -> Result<CreditOutcome, RepoError>;
}
