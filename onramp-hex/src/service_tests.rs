//! OnRampService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use onramp_types::{
        Amount, AppError, Balance, CreditOutcome, InitiateOnRampRequest, LedgerStore,
        NewOnRampTransaction, OnRampStatus, OnRampToken, OnRampTransaction, PaymentNotification,
        RepoError, UserId, WebhookPayload,
    };

    use crate::OnRampService;

    #[derive(Default)]
    struct Ledger {
        balances: HashMap<UserId, Balance>,
        transactions: HashMap<OnRampToken, OnRampTransaction>,
    }

    /// In-memory store for testing the service layer.
    ///
    /// One mutex guards the whole ledger so `confirm_onramp` is atomic;
    /// `fail_credit` makes the balance step fail after the status step.
    #[derive(Default)]
    pub struct MockRepo {
        ledger: Mutex<Ledger>,
        fail_credit: AtomicBool,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_credit(&self, fail: bool) {
            self.fail_credit.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl LedgerStore for MockRepo {
        async fn create_onramp_transaction(
            &self,
            new: NewOnRampTransaction,
        ) -> Result<OnRampTransaction, RepoError> {
            let tx = OnRampTransaction::pending(new);
            let mut ledger = self.ledger.lock().unwrap();
            if ledger.transactions.contains_key(&tx.token) {
                return Err(RepoError::Conflict(format!("token {}", tx.token)));
            }
            ledger.transactions.insert(tx.token.clone(), tx.clone());
            Ok(tx)
        }

        async fn get_onramp_transaction(
            &self,
            token: &OnRampToken,
        ) -> Result<Option<OnRampTransaction>, RepoError> {
            Ok(self.ledger.lock().unwrap().transactions.get(token).cloned())
        }

        async fn update_transaction_status(
            &self,
            token: &OnRampToken,
            status: OnRampStatus,
        ) -> Result<OnRampTransaction, RepoError> {
            let mut ledger = self.ledger.lock().unwrap();
            let tx = ledger
                .transactions
                .get_mut(token)
                .ok_or(RepoError::NotFound)?;
            tx.transition(status)?;
            Ok(tx.clone())
        }

        async fn get_balance(&self, user_id: &UserId) -> Result<Option<Balance>, RepoError> {
            Ok(self.ledger.lock().unwrap().balances.get(user_id).cloned())
        }

        async fn update_balance(
            &self,
            user_id: &UserId,
            delta: Amount,
        ) -> Result<Balance, RepoError> {
            let mut ledger = self.ledger.lock().unwrap();
            let balance = ledger
                .balances
                .entry(user_id.clone())
                .or_insert_with(|| Balance::empty(user_id.clone()));
            balance.credit(delta)?;
            Ok(balance.clone())
        }

        async fn confirm_onramp(
            &self,
            notification: &PaymentNotification,
        ) -> Result<CreditOutcome, RepoError> {
            let mut ledger = self.ledger.lock().unwrap();

            let Some(tx) = ledger.transactions.get(&notification.token) else {
                return Ok(CreditOutcome::UnknownToken);
            };
            if tx.status != OnRampStatus::Pending {
                return Ok(CreditOutcome::skipped(Some(tx.status)));
            }
            notification.ensure_matches(tx.user_id.as_str(), tx.amount.value())?;

            // Stage both changes and only write them back when both succeed.
            let mut staged_tx = tx.clone();
            staged_tx.transition(OnRampStatus::Success)?;

            if self.fail_credit.load(Ordering::SeqCst) {
                return Err(RepoError::Database("simulated credit failure".into()));
            }

            let mut staged_balance = ledger
                .balances
                .get(&notification.user_id)
                .cloned()
                .unwrap_or_else(|| Balance::empty(notification.user_id.clone()));
            staged_balance.credit(notification.amount)?;

            ledger
                .transactions
                .insert(staged_tx.token.clone(), staged_tx);
            ledger
                .balances
                .insert(notification.user_id.clone(), staged_balance.clone());

            Ok(CreditOutcome::Credited {
                balance: staged_balance,
            })
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Service with balance(u1)=500 and a pending "abc" for 100.
    async fn seeded_service() -> OnRampService<MockRepo> {
        let service = OnRampService::new(MockRepo::new());
        service
            .repo()
            .update_balance(&UserId::new("u1").unwrap(), Amount::new(500).unwrap())
            .await
            .unwrap();
        service
            .initiate_onramp(InitiateOnRampRequest {
                user_id: "u1".into(),
                amount: 100,
                provider: "HDFC Bank".into(),
                token: Some("abc".into()),
            })
            .await
            .unwrap();
        service
    }

    fn payload(token: &str, user: &str, amount: i64) -> WebhookPayload {
        WebhookPayload {
            token: token.into(),
            user_identifier: user.into(),
            amount,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Webhook
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_first_delivery_credits() {
        let service = seeded_service().await;

        let outcome = service
            .handle_notification(payload("abc", "u1", 100))
            .await
            .unwrap();

        assert!(outcome.is_credited());
        assert_eq!(service.get_balance("u1").await.unwrap().amount, 600);
        assert_eq!(
            service.get_onramp("abc").await.unwrap().status,
            OnRampStatus::Success
        );
    }

    #[tokio::test]
    async fn test_redelivery_never_credits_again() {
        let service = seeded_service().await;

        service
            .handle_notification(payload("abc", "u1", 100))
            .await
            .unwrap();

        for _ in 0..5 {
            let outcome = service
                .handle_notification(payload("abc", "u1", 100))
                .await
                .unwrap();
            assert_eq!(outcome, CreditOutcome::AlreadyProcessed);
        }

        assert_eq!(service.get_balance("u1").await.unwrap().amount, 600);
    }

    #[tokio::test]
    async fn test_unknown_token_is_acknowledged() {
        let service = seeded_service().await;

        let outcome = service
            .handle_notification(payload("zzz", "u1", 100))
            .await
            .unwrap();

        assert_eq!(outcome, CreditOutcome::UnknownToken);
        assert_eq!(service.get_balance("u1").await.unwrap().amount, 500);
    }

    #[tokio::test]
    async fn test_invalid_payload_rejected() {
        let service = seeded_service().await;

        for bad in [
            payload("", "u1", 100),
            payload("abc", " ", 100),
            payload("abc", "u1", 0),
            payload("abc", "u1", -100),
        ] {
            let result = service.handle_notification(bad).await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }

        assert_eq!(service.get_balance("u1").await.unwrap().amount, 500);
        assert_eq!(
            service.get_onramp("abc").await.unwrap().status,
            OnRampStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_mismatched_notification_rejected() {
        let service = seeded_service().await;

        let result = service
            .handle_notification(payload("abc", "u1", 150))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(
            service.get_onramp("abc").await.unwrap().status,
            OnRampStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_state_untouched() {
        let service = seeded_service().await;
        service.repo().fail_credit(true);

        let result = service
            .handle_notification(payload("abc", "u1", 100))
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(service.get_balance("u1").await.unwrap().amount, 500);
        assert_eq!(
            service.get_onramp("abc").await.unwrap().status,
            OnRampStatus::Pending
        );

        service.repo().fail_credit(false);
        let outcome = service
            .handle_notification(payload("abc", "u1", 100))
            .await
            .unwrap();
        assert!(outcome.is_credited());
        assert_eq!(service.get_balance("u1").await.unwrap().amount, 600);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Administration
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_initiate_validation() {
        let service = OnRampService::new(MockRepo::new());

        let result = service
            .initiate_onramp(InitiateOnRampRequest {
                user_id: "u1".into(),
                amount: 0,
                provider: "HDFC Bank".into(),
                token: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = service
            .initiate_onramp(InitiateOnRampRequest {
                user_id: "u1".into(),
                amount: 100,
                provider: "".into(),
                token: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_initiate_duplicate_token_conflicts() {
        let service = seeded_service().await;

        let result = service
            .initiate_onramp(InitiateOnRampRequest {
                user_id: "u2".into(),
                amount: 10,
                provider: "HDFC Bank".into(),
                token: Some("abc".into()),
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_failed_onramp_cannot_be_credited() {
        let service = seeded_service().await;

        let tx = service.fail_onramp("abc").await.unwrap();
        assert_eq!(tx.status, OnRampStatus::Failed);

        let outcome = service
            .handle_notification(payload("abc", "u1", 100))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CreditOutcome::NotPending {
                status: OnRampStatus::Failed
            }
        );
        assert_eq!(service.get_balance("u1").await.unwrap().amount, 500);

        let again = service.fail_onramp("abc").await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_not_found_lookups() {
        let service = OnRampService::new(MockRepo::new());

        assert!(matches!(
            service.get_onramp("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.fail_onramp("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get_balance("nobody").await,
            Err(AppError::NotFound(_))
        ));
    }
}
