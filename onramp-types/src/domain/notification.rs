//! Payment-confirmation notifications and what applying them did.

use serde::Serialize;

use super::amount::Amount;
use super::balance::{Balance, UserId};
use super::onramp::{OnRampStatus, OnRampToken};
use crate::dto::WebhookPayload;
use crate::error::DomainError;

/// A validated payment confirmation from the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub token: OnRampToken,
    pub user_id: UserId,
    pub amount: Amount,
}

impl TryFrom<WebhookPayload> for PaymentNotification {
    type Error = DomainError;

    fn try_from(payload: WebhookPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            token: OnRampToken::new(payload.token)?,
            user_id: UserId::new(payload.user_identifier)?,
            amount: Amount::new(payload.amount)?,
        })
    }
}

impl PaymentNotification {
    /// Checks the notification against the user and amount recorded when
    /// the deposit was initiated.
    pub fn ensure_matches(&self, user_id: &str, amount: i64) -> Result<(), DomainError> {
        if self.user_id.as_str() != user_id {
            return Err(DomainError::NotificationMismatch {
                token: self.token.clone(),
                detail: format!(
                    "user_identifier {} differs from recorded user {}",
                    self.user_id, user_id
                ),
            });
        }
        if self.amount.value() != amount {
            return Err(DomainError::NotificationMismatch {
                token: self.token.clone(),
                detail: format!(
                    "amount {} differs from recorded amount {}",
                    self.amount.value(),
                    amount
                ),
            });
        }
        Ok(())
    }
}

/// Result of applying a notification to the ledger.
///
/// Every variant except `Credited` means nothing was mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreditOutcome {
    /// Balance credited and transaction marked successful.
    Credited { balance: Balance },
    /// The token was already applied by an earlier delivery.
    AlreadyProcessed,
    /// No transaction carries this token.
    UnknownToken,
    /// The transaction ended in another terminal status.
    NotPending { status: OnRampStatus },
}

impl CreditOutcome {
    pub fn is_credited(&self) -> bool {
        matches!(self, CreditOutcome::Credited { .. })
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            CreditOutcome::Credited { .. } => "credited",
            CreditOutcome::AlreadyProcessed => "already_processed",
            CreditOutcome::UnknownToken => "unknown_token",
            CreditOutcome::NotPending { .. } => "not_pending",
        }
    }

    /// Classifies a token that the conditional `Pending -> Success` update
    /// did not match, given its current status (if the row exists).
    pub fn skipped(current: Option<OnRampStatus>) -> Self {
        match current {
            None => CreditOutcome::UnknownToken,
            Some(OnRampStatus::Success) => CreditOutcome::AlreadyProcessed,
            Some(status) => CreditOutcome::NotPending { status },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(token: &str, user: &str, amount: i64) -> WebhookPayload {
        WebhookPayload {
            token: token.into(),
            user_identifier: user.into(),
            amount,
        }
    }

    #[test]
    fn test_valid_payload() {
        let n = PaymentNotification::try_from(payload("abc", "u1", 100)).unwrap();
        assert_eq!(n.token.as_str(), "abc");
        assert_eq!(n.user_id.as_str(), "u1");
        assert_eq!(n.amount.value(), 100);
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(PaymentNotification::try_from(payload("", "u1", 100)).is_err());
        assert!(PaymentNotification::try_from(payload("abc", "", 100)).is_err());
        assert!(PaymentNotification::try_from(payload("abc", "u1", 0)).is_err());
        assert!(PaymentNotification::try_from(payload("abc", "u1", -5)).is_err());
    }

    #[test]
    fn test_ensure_matches() {
        let n = PaymentNotification::try_from(payload("abc", "u1", 100)).unwrap();
        assert!(n.ensure_matches("u1", 100).is_ok());
        assert!(matches!(
            n.ensure_matches("u2", 100),
            Err(DomainError::NotificationMismatch { .. })
        ));
        assert!(matches!(
            n.ensure_matches("u1", 99),
            Err(DomainError::NotificationMismatch { .. })
        ));
    }

    #[test]
    fn test_skipped_classification() {
        assert_eq!(CreditOutcome::skipped(None), CreditOutcome::UnknownToken);
        assert_eq!(
            CreditOutcome::skipped(Some(OnRampStatus::Success)),
            CreditOutcome::AlreadyProcessed
        );
        assert_eq!(
            CreditOutcome::skipped(Some(OnRampStatus::Failed)),
            CreditOutcome::NotPending {
                status: OnRampStatus::Failed
            }
        );
    }
}
