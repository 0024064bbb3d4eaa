//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use onramp_types::{
        Amount, CreditOutcome, DomainError, LedgerStore, NewOnRampTransaction, OnRampStatus,
        OnRampToken, PaymentNotification, RepoError, UserId,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn token(t: &str) -> OnRampToken {
        OnRampToken::new(t).unwrap()
    }

    fn notification(t: &str, u: &str, amount: i64) -> PaymentNotification {
        PaymentNotification {
            token: token(t),
            user_id: user(u),
            amount: Amount::new(amount).unwrap(),
        }
    }

    async fn seed_pending(repo: &SqliteRepo, t: &str, u: &str, amount: i64) {
        repo.create_onramp_transaction(NewOnRampTransaction {
            token: Some(token(t)),
            user_id: user(u),
            amount: Amount::new(amount).unwrap(),
            provider: "HDFC Bank".to_string(),
        })
        .await
        .unwrap();
    }

    async fn seed_balance(repo: &SqliteRepo, u: &str, amount: i64) {
        repo.update_balance(&user(u), Amount::new(amount).unwrap())
            .await
            .unwrap();
    }

    async fn balance_of(repo: &SqliteRepo, u: &str) -> i64 {
        repo.get_balance(&user(u))
            .await
            .unwrap()
            .map(|b| b.amount)
            .unwrap_or(0)
    }

    async fn status_of(repo: &SqliteRepo, t: &str) -> OnRampStatus {
        repo.get_onramp_transaction(&token(t))
            .await
            .unwrap()
            .unwrap()
            .status
    }

    // ─────────────────────────────────────────────────────────────────────────
    // On-ramp transactions
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_and_get_onramp_transaction() {
        let repo = setup_repo().await;
        seed_pending(&repo, "abc", "u1", 100).await;

        let tx = repo
            .get_onramp_transaction(&token("abc"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(tx.user_id.as_str(), "u1");
        assert_eq!(tx.amount.value(), 100);
        assert_eq!(tx.status, OnRampStatus::Pending);
        assert_eq!(tx.provider, "HDFC Bank");
        assert!(tx.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_generated_token() {
        let repo = setup_repo().await;

        let tx = repo
            .create_onramp_transaction(NewOnRampTransaction {
                token: None,
                user_id: user("u1"),
                amount: Amount::new(250).unwrap(),
                provider: "HDFC Bank".to_string(),
            })
            .await
            .unwrap();

        let fetched = repo.get_onramp_transaction(&tx.token).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_token_conflict() {
        let repo = setup_repo().await;
        seed_pending(&repo, "abc", "u1", 100).await;

        let result = repo
            .create_onramp_transaction(NewOnRampTransaction {
                token: Some(token("abc")),
                user_id: user("u2"),
                amount: Amount::new(5).unwrap(),
                provider: "HDFC Bank".to_string(),
            })
            .await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_unknown_transaction() {
        let repo = setup_repo().await;
        let result = repo.get_onramp_transaction(&token("nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_transaction_status_to_failed() {
        let repo = setup_repo().await;
        seed_pending(&repo, "abc", "u1", 100).await;

        let tx = repo
            .update_transaction_status(&token("abc"), OnRampStatus::Failed)
            .await
            .unwrap();

        assert_eq!(tx.status, OnRampStatus::Failed);
        assert!(tx.completed_at.is_some());
        assert_eq!(balance_of(&repo, "u1").await, 0);
    }

    #[tokio::test]
    async fn test_update_transaction_status_is_one_way() {
        let repo = setup_repo().await;
        seed_pending(&repo, "abc", "u1", 100).await;
        repo.update_transaction_status(&token("abc"), OnRampStatus::Failed)
            .await
            .unwrap();

        let result = repo
            .update_transaction_status(&token("abc"), OnRampStatus::Success)
            .await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::InvalidTransition {
                from: OnRampStatus::Failed,
                to: OnRampStatus::Success
            }))
        ));
    }

    #[tokio::test]
    async fn test_update_transaction_status_not_found() {
        let repo = setup_repo().await;
        let result = repo
            .update_transaction_status(&token("nope"), OnRampStatus::Failed)
            .await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Balances
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_update_balance_opens_and_increments() {
        let repo = setup_repo().await;

        assert!(repo.get_balance(&user("u1")).await.unwrap().is_none());

        let first = repo
            .update_balance(&user("u1"), Amount::new(500).unwrap())
            .await
            .unwrap();
        assert_eq!(first.amount, 500);

        let second = repo
            .update_balance(&user("u1"), Amount::new(100).unwrap())
            .await
            .unwrap();
        assert_eq!(second.amount, 600);
        assert_eq!(second.locked, 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Confirmation
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_confirm_credits_once() {
        let repo = setup_repo().await;
        seed_balance(&repo, "u1", 500).await;
        seed_pending(&repo, "abc", "u1", 100).await;

        let outcome = repo
            .confirm_onramp(&notification("abc", "u1", 100))
            .await
            .unwrap();

        match outcome {
            CreditOutcome::Credited { balance } => assert_eq!(balance.amount, 600),
            other => panic!("expected credit, got {:?}", other),
        }
        assert_eq!(status_of(&repo, "abc").await, OnRampStatus::Success);
        assert_eq!(balance_of(&repo, "u1").await, 600);
    }

    #[tokio::test]
    async fn test_redelivery_is_noop() {
        let repo = setup_repo().await;
        seed_balance(&repo, "u1", 500).await;
        seed_pending(&repo, "abc", "u1", 100).await;

        repo.confirm_onramp(&notification("abc", "u1", 100))
            .await
            .unwrap();

        for _ in 0..3 {
            let outcome = repo
                .confirm_onramp(&notification("abc", "u1", 100))
                .await
                .unwrap();
            assert_eq!(outcome, CreditOutcome::AlreadyProcessed);
        }

        assert_eq!(balance_of(&repo, "u1").await, 600);
    }

    #[tokio::test]
    async fn test_confirm_opens_missing_balance() {
        let repo = setup_repo().await;
        seed_pending(&repo, "abc", "u1", 100).await;

        let outcome = repo
            .confirm_onramp(&notification("abc", "u1", 100))
            .await
            .unwrap();

        assert!(outcome.is_credited());
        assert_eq!(balance_of(&repo, "u1").await, 100);
    }

    #[tokio::test]
    async fn test_confirm_unknown_token() {
        let repo = setup_repo().await;
        seed_balance(&repo, "u1", 500).await;

        let outcome = repo
            .confirm_onramp(&notification("ghost", "u1", 100))
            .await
            .unwrap();

        assert_eq!(outcome, CreditOutcome::UnknownToken);
        assert_eq!(balance_of(&repo, "u1").await, 500);
    }

    #[tokio::test]
    async fn test_confirm_failed_transaction_is_skipped() {
        let repo = setup_repo().await;
        seed_pending(&repo, "abc", "u1", 100).await;
        repo.update_transaction_status(&token("abc"), OnRampStatus::Failed)
            .await
            .unwrap();

        let outcome = repo
            .confirm_onramp(&notification("abc", "u1", 100))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CreditOutcome::NotPending {
                status: OnRampStatus::Failed
            }
        );
        assert_eq!(balance_of(&repo, "u1").await, 0);
    }

    #[tokio::test]
    async fn test_mismatch_rolls_back_claim() {
        let repo = setup_repo().await;
        seed_balance(&repo, "u1", 500).await;
        seed_pending(&repo, "abc", "u1", 100).await;

        let result = repo.confirm_onramp(&notification("abc", "u1", 9999)).await;
        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::NotificationMismatch { .. }))
        ));

        let result = repo.confirm_onramp(&notification("abc", "u2", 100)).await;
        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::NotificationMismatch { .. }))
        ));

        assert_eq!(status_of(&repo, "abc").await, OnRampStatus::Pending);
        assert_eq!(balance_of(&repo, "u1").await, 500);
        assert_eq!(balance_of(&repo, "u2").await, 0);
    }

    #[tokio::test]
    async fn test_failure_during_credit_rolls_back_status() {
        let repo = setup_repo().await;
        seed_balance(&repo, "u1", 500).await;
        seed_pending(&repo, "abc", "u1", 100).await;

        sqlx::query(
            r#"CREATE TRIGGER fail_balance_update BEFORE UPDATE ON balances
               BEGIN SELECT RAISE(ABORT, 'simulated balance failure'); END"#,
        )
        .execute(repo.pool())
        .await
        .unwrap();

        let result = repo.confirm_onramp(&notification("abc", "u1", 100)).await;
        assert!(matches!(result, Err(RepoError::Database(_))));

        assert_eq!(status_of(&repo, "abc").await, OnRampStatus::Pending);
        assert_eq!(balance_of(&repo, "u1").await, 500);

        // The processor retries once the store recovers
        sqlx::query("DROP TRIGGER fail_balance_update")
            .execute(repo.pool())
            .await
            .unwrap();

        let outcome = repo
            .confirm_onramp(&notification("abc", "u1", 100))
            .await
            .unwrap();
        assert!(outcome.is_credited());
        assert_eq!(balance_of(&repo, "u1").await, 600);
    }

    #[tokio::test]
    async fn test_update_balance_refuses_overflow() {
        let repo = setup_repo().await;
        seed_balance(&repo, "u1", i64::MAX - 50).await;

        let result = repo
            .update_balance(&user("u1"), Amount::new(100).unwrap())
            .await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::BalanceOverflow))
        ));
        assert_eq!(balance_of(&repo, "u1").await, i64::MAX - 50);

        // Exactly reaching the maximum is still allowed
        let balance = repo
            .update_balance(&user("u1"), Amount::new(50).unwrap())
            .await
            .unwrap();
        assert_eq!(balance.amount, i64::MAX);
    }

    #[tokio::test]
    async fn test_overflowing_credit_rolls_back_claim() {
        let repo = setup_repo().await;
        seed_balance(&repo, "u1", i64::MAX - 50).await;
        seed_pending(&repo, "abc", "u1", 100).await;

        let result = repo.confirm_onramp(&notification("abc", "u1", 100)).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::BalanceOverflow))
        ));
        assert_eq!(status_of(&repo, "abc").await, OnRampStatus::Pending);
        assert_eq!(balance_of(&repo, "u1").await, i64::MAX - 50);
    }

    #[tokio::test]
    async fn test_concurrent_deliveries_credit_at_most_once() {
        let repo = Arc::new(setup_repo().await);
        seed_balance(&repo, "u1", 500).await;
        seed_pending(&repo, "abc", "u1", 100).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.confirm_onramp(&notification("abc", "u1", 100)).await
            }));
        }

        let mut credited = 0;
        for handle in handles {
            // Lock contention may surface as an error; the bank retries those.
            if let Ok(outcome) = handle.await.unwrap() {
                if outcome.is_credited() {
                    credited += 1;
                }
            }
        }
        assert!(credited <= 1);

        // One more delivery settles any storm where every attempt lost.
        repo.confirm_onramp(&notification("abc", "u1", 100))
            .await
            .unwrap();

        assert_eq!(status_of(&repo, "abc").await, OnRampStatus::Success);
        assert_eq!(balance_of(&repo, "u1").await, 600);
    }
}
