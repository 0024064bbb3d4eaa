//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;

use onramp_types::{
    Amount, Balance, CreditOutcome, DomainError, LedgerStore, NewOnRampTransaction, OnRampStatus,
    OnRampToken, OnRampTransaction, PaymentNotification, RepoError, UserId,
};

use crate::types::{DbBalance, DbClaim, DbOnRampTransaction, DbStatus, insert_error};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
///
/// SQLite serializes writers at the database level, so the conditional
/// status update in `confirm_onramp` is the per-token guard.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_ledger.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for SqliteRepo {
    async fn create_onramp_transaction(
        &self,
        new: NewOnRampTransaction,
    ) -> Result<OnRampTransaction, RepoError> {
        let tx = OnRampTransaction::pending(new);

        sqlx::query(
            r#"INSERT INTO onramp_transactions (token, user_id, amount, status, provider, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(tx.token.as_str())
        .bind(tx.user_id.as_str())
        .bind(tx.amount.value())
        .bind(tx.status.as_ref())
        .bind(&tx.provider)
        .bind(tx.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, &tx.token))?;

        Ok(tx)
    }

    async fn get_onramp_transaction(
        &self,
        token: &OnRampToken,
    ) -> Result<Option<OnRampTransaction>, RepoError> {
        let row: Option<DbOnRampTransaction> = sqlx::query_as(
            r#"SELECT token, user_id, amount, status, provider, created_at, completed_at
               FROM onramp_transactions WHERE token = ?"#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbOnRampTransaction::into_domain).transpose()
    }

    async fn update_transaction_status(
        &self,
        token: &OnRampToken,
        status: OnRampStatus,
    ) -> Result<OnRampTransaction, RepoError> {
        if !OnRampStatus::Pending.can_transition_to(status) {
            return Err(RepoError::Domain(DomainError::InvalidTransition {
                from: OnRampStatus::Pending,
                to: status,
            }));
        }

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let row: Option<DbOnRampTransaction> = sqlx::query_as(
            r#"UPDATE onramp_transactions SET status = ?, completed_at = ?
               WHERE token = ? AND status = 'PENDING'
               RETURNING token, user_id, amount, status, provider, created_at, completed_at"#,
        )
        .bind(status.as_ref())
        .bind(Utc::now())
        .bind(token.as_str())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if let Some(row) = row {
            db_tx
                .commit()
                .await
                .map_err(|e| RepoError::Transaction(e.to_string()))?;
            return row.into_domain();
        }

        let current: Option<DbStatus> =
            sqlx::query_as(r#"SELECT status FROM onramp_transactions WHERE token = ?"#)
                .bind(token.as_str())
                .fetch_optional(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        match current {
            None => Err(RepoError::NotFound),
            Some(row) => Err(RepoError::Domain(DomainError::InvalidTransition {
                from: row.into_domain()?,
                to: status,
            })),
        }
    }

    async fn get_balance(&self, user_id: &UserId) -> Result<Option<Balance>, RepoError> {
        let row: Option<DbBalance> = sqlx::query_as(
            r#"SELECT user_id, amount, locked, updated_at FROM balances WHERE user_id = ?"#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbBalance::into_domain).transpose()
    }

    async fn update_balance(
        &self,
        user_id: &UserId,
        delta: Amount,
    ) -> Result<Balance, RepoError> {
        // No row comes back when the guard refuses an overflowing credit
        let row: Option<DbBalance> = sqlx::query_as(
            r#"INSERT INTO balances (user_id, amount, locked, updated_at) VALUES (?, ?, 0, ?)
               ON CONFLICT (user_id) DO UPDATE
               SET amount = balances.amount + excluded.amount, updated_at = excluded.updated_at
               WHERE balances.amount <= ?
               RETURNING user_id, amount, locked, updated_at"#,
        )
        .bind(user_id.as_str())
        .bind(delta.value())
        .bind(Utc::now())
        .bind(delta.credit_ceiling())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.ok_or(RepoError::Domain(DomainError::BalanceOverflow))?
            .into_domain()
    }

    async fn confirm_onramp(
        &self,
        notification: &PaymentNotification,
    ) -> Result<CreditOutcome, RepoError> {
        let now = Utc::now();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Claim the token; only one delivery can move it out of PENDING.
        let claim: Option<DbClaim> = sqlx::query_as(
            r#"UPDATE onramp_transactions SET status = 'SUCCESS', completed_at = ?
               WHERE token = ? AND status = 'PENDING'
               RETURNING user_id, amount"#,
        )
        .bind(now)
        .bind(notification.token.as_str())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let Some(claim) = claim else {
            let current: Option<DbStatus> =
                sqlx::query_as(r#"SELECT status FROM onramp_transactions WHERE token = ?"#)
                    .bind(notification.token.as_str())
                    .fetch_optional(&mut *db_tx)
                    .await
                    .map_err(|e| RepoError::Database(e.to_string()))?;

            let status = current.map(DbStatus::into_domain).transpose()?;
            let outcome = CreditOutcome::skipped(status);
            tracing::debug!(
                token = %notification.token,
                outcome = outcome.label(),
                "Token not claimable"
            );
            return Ok(outcome);
        };

        // Dropping `db_tx` on error rolls the claim back.
        if let Err(e) = notification.ensure_matches(&claim.user_id, claim.amount) {
            tracing::warn!(
                token = %notification.token,
                error = %e,
                "Notification mismatch, rolling back claim"
            );
            return Err(RepoError::Domain(e));
        }

        let balance: Option<DbBalance> = sqlx::query_as(
            r#"INSERT INTO balances (user_id, amount, locked, updated_at) VALUES (?, ?, 0, ?)
               ON CONFLICT (user_id) DO UPDATE
               SET amount = balances.amount + excluded.amount, updated_at = excluded.updated_at
               WHERE balances.amount <= ?
               RETURNING user_id, amount, locked, updated_at"#,
        )
        .bind(notification.user_id.as_str())
        .bind(notification.amount.value())
        .bind(now)
        .bind(notification.amount.credit_ceiling())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let Some(balance) = balance else {
            tracing::error!(
                token = %notification.token,
                user_id = %notification.user_id,
                "Credit would overflow balance, rolling back claim"
            );
            return Err(RepoError::Domain(DomainError::BalanceOverflow));
        };

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(CreditOutcome::Credited {
            balance: balance.into_domain()?,
        })
    }
}
