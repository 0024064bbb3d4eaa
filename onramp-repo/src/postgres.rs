//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use onramp_types::{
    Amount, Balance, CreditOutcome, DomainError, LedgerStore, NewOnRampTransaction, OnRampStatus,
    OnRampToken, OnRampTransaction, PaymentNotification, RepoError, UserId,
};

use crate::types::{DbBalance, DbClaim, DbOnRampTransaction, DbStatus, insert_error};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository with row-level locking.
///
/// The conditional `UPDATE ... WHERE status = 'PENDING'` takes the row lock
/// on the token; a concurrent delivery blocks on it and then re-checks the
/// predicate against the committed row, so it sees `SUCCESS` and skips.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_ledger_pg.sql"),
        "0001",
    )
    .await
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for PostgresRepo {
    async fn create_onramp_transaction(
        &self,
        new: NewOnRampTransaction,
    ) -> Result<OnRampTransaction, RepoError> {
        let tx = OnRampTransaction::pending(new);

        sqlx::query(
            r#"INSERT INTO onramp_transactions (token, user_id, amount, status, provider, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
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
               FROM onramp_transactions WHERE token = $1"#,
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
            r#"UPDATE onramp_transactions SET status = $1, completed_at = $2
               WHERE token = $3 AND status = 'PENDING'
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
            sqlx::query_as(r#"SELECT status FROM onramp_transactions WHERE token = $1"#)
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
            r#"SELECT user_id, amount, locked, updated_at FROM balances WHERE user_id = $1"#,
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
            r#"INSERT INTO balances (user_id, amount, locked, updated_at) VALUES ($1, $2, 0, $3)
               ON CONFLICT (user_id) DO UPDATE
               SET amount = balances.amount + EXCLUDED.amount, updated_at = EXCLUDED.updated_at
               WHERE balances.amount <= $4
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

        // Claim the token under its row lock
        let claim: Option<DbClaim> = sqlx::query_as(
            r#"UPDATE onramp_transactions SET status = 'SUCCESS', completed_at = $1
               WHERE token = $2 AND status = 'PENDING'
               RETURNING user_id, amount"#,
        )
        .bind(now)
        .bind(notification.token.as_str())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let Some(claim) = claim else {
            let current: Option<DbStatus> =
                sqlx::query_as(r#"SELECT status FROM onramp_transactions WHERE token = $1"#)
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

        if let Err(e) = notification.ensure_matches(&claim.user_id, claim.amount) {
            tracing::warn!(
                token = %notification.token,
                error = %e,
                "Notification mismatch, rolling back claim"
            );
            return Err(RepoError::Domain(e));
        }

        let balance: Option<DbBalance> = sqlx::query_as(
            r#"INSERT INTO balances (user_id, amount, locked, updated_at) VALUES ($1, $2, 0, $3)
               ON CONFLICT (user_id) DO UPDATE
               SET amount = balances.amount + EXCLUDED.amount, updated_at = EXCLUDED.updated_at
               WHERE balances.amount <= $4
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
