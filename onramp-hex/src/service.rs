//! On-Ramp Application Service
//!
//! Orchestrates domain operations through the ledger port.
//! Contains NO infrastructure logic - pure business orchestration.

use onramp_types::{
    Amount, AppError, Balance, CreditOutcome, InitiateOnRampRequest, LedgerStore,
    NewOnRampTransaction, OnRampStatus, OnRampToken, OnRampTransaction, PaymentNotification,
    UserId, WebhookPayload,
};

/// Application service for on-ramp operations.
///
/// Generic over `R: LedgerStore` - the adapter is injected at compile time.
/// This enables:
/// - Swapping repositories without code changes
/// - Testing with an in-memory store
/// - Compile-time checks for port implementation
pub struct OnRampService<R: LedgerStore> {
    repo: R,
}

impl<R: LedgerStore> OnRampService<R> {
    /// Creates a new service with the given store.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns a reference to the underlying store.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Bank webhook
    // ─────────────────────────────────────────────────────────────────────────────

    /// Applies a payment confirmation from the bank.
    ///
    /// Unknown and already-applied tokens are reported as outcomes, not
    /// errors, so the handler can acknowledge them and stop redeliveries.
    pub async fn handle_notification(
        &self,
        payload: WebhookPayload,
    ) -> Result<CreditOutcome, AppError> {
        let notification = PaymentNotification::try_from(payload)?;

        let outcome = self.repo.confirm_onramp(&notification).await?;

        match &outcome {
            CreditOutcome::Credited { balance } => tracing::info!(
                token = %notification.token,
                user_id = %notification.user_id,
                amount = %notification.amount,
                new_balance = balance.amount,
                "On-ramp credited"
            ),
            CreditOutcome::AlreadyProcessed => tracing::info!(
                token = %notification.token,
                "Duplicate delivery ignored"
            ),
            CreditOutcome::UnknownToken => tracing::warn!(
                token = %notification.token,
                user_id = %notification.user_id,
                "Notification for unknown token ignored"
            ),
            CreditOutcome::NotPending { status } => tracing::warn!(
                token = %notification.token,
                %status,
                "Notification for settled transaction ignored"
            ),
        }

        Ok(outcome)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // On-ramp administration
    // ─────────────────────────────────────────────────────────────────────────────

    /// Records a pending deposit that the bank will later confirm.
    pub async fn initiate_onramp(
        &self,
        req: InitiateOnRampRequest,
    ) -> Result<OnRampTransaction, AppError> {
        if req.provider.trim().is_empty() {
            return Err(AppError::BadRequest("Provider cannot be empty".into()));
        }

        let new = NewOnRampTransaction {
            token: req.token.map(OnRampToken::new).transpose()?,
            user_id: UserId::new(req.user_id)?,
            amount: Amount::new(req.amount)?,
            provider: req.provider,
        };

        self.repo
            .create_onramp_transaction(new)
            .await
            .map_err(Into::into)
    }

    /// Gets an on-ramp transaction by token.
    pub async fn get_onramp(&self, token: &str) -> Result<OnRampTransaction, AppError> {
        let token = OnRampToken::new(token)?;
        self.repo
            .get_onramp_transaction(&token)
            .await
            .map_err(Into::into)
            .and_then(|opt| {
                opt.ok_or_else(|| AppError::NotFound(format!("On-ramp transaction {}", token)))
            })
    }

    /// Marks a pending deposit as failed; it can no longer be credited.
    pub async fn fail_onramp(&self, token: &str) -> Result<OnRampTransaction, AppError> {
        let token = OnRampToken::new(token)?;
        self.repo
            .update_transaction_status(&token, OnRampStatus::Failed)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::NotFound(_) => {
                    AppError::NotFound(format!("On-ramp transaction {}", token))
                }
                other => other,
            })
    }

    /// Gets a user's balance.
    pub async fn get_balance(&self, user_id: &str) -> Result<Balance, AppError> {
        let user_id = UserId::new(user_id)?;
        self.repo
            .get_balance(&user_id)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Balance {}", user_id))))
    }
}
