#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{TransactionType, Wallet, WalletTransaction};
use sqlx::SqlitePool;

/// Repository trait for wallets and their transaction ledger
///
/// Balance changes are transactional: the wallet row and the ledger entry
/// are written together, and a debit that would take the balance negative
/// is rejected with [`StorageError::InsufficientBalance`].
pub trait WalletRepository: Send + Sync {
    /// Find a wallet by technical key
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Wallet>>;

    /// Find the wallet attached to an enrollment
    async fn find_by_enrollment(&self, enrollment_id: i64) -> StorageResult<Option<Wallet>>;

    /// Add money to a wallet
    async fn credit(
        &self,
        wallet_id: i64,
        amount_cents: i64,
        description: Option<&str>,
    ) -> StorageResult<WalletTransaction>;

    /// Remove money from a wallet, failing if the balance does not cover it
    async fn debit(
        &self,
        wallet_id: i64,
        amount_cents: i64,
        description: Option<&str>,
    ) -> StorageResult<WalletTransaction>;

    /// Ledger for one wallet, newest first
    async fn transactions(
        &self,
        wallet_id: i64,
        limit: i64,
    ) -> StorageResult<Vec<WalletTransaction>>;
}

/// SQLite implementation of WalletRepository
pub struct SqliteWalletRepository {
    pool: SqlitePool,
}

impl SqliteWalletRepository {
    /// Create a new SQLite wallet repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn apply(
        &self,
        wallet_id: i64,
        transaction_type: TransactionType,
        amount_cents: i64,
        description: Option<&str>,
    ) -> StorageResult<WalletTransaction> {
        if amount_cents <= 0 {
            return Err(StorageError::Validation(format!(
                "Transaction amount must be positive, got {}",
                amount_cents
            )));
        }

        let mut tx = self.pool.begin().await?;

        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, enrollment_id, wallet_number, balance_cents, status,
                   created_at, updated_at
            FROM wallets
            WHERE id = ?
            "#,
        )
        .bind(wallet_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StorageError::not_found("Wallet", "id", wallet_id))?;

        let balance_before = wallet.balance_cents;
        let balance_after = match transaction_type {
            TransactionType::Credit => balance_before + amount_cents,
            TransactionType::Debit => {
                if balance_before < amount_cents {
                    return Err(StorageError::InsufficientBalance {
                        wallet_id,
                        balance_cents: balance_before,
                        amount_cents,
                    });
                }
                balance_before - amount_cents
            }
        };

        sqlx::query(
            r#"
            UPDATE wallets
            SET balance_cents = ?, updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(balance_after)
        .bind(wallet_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO wallet_transactions (wallet_id, transaction_type, amount_cents,
                                             balance_before, balance_after, description)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(wallet_id)
        .bind(transaction_type.as_str())
        .bind(amount_cents)
        .bind(balance_before)
        .bind(balance_after)
        .bind(description)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        let entry = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, wallet_id, transaction_type, amount_cents,
                   balance_before, balance_after, description, created_at
            FROM wallet_transactions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StorageError::not_found("WalletTransaction", "id", id))?;

        tx.commit().await?;

        Ok(entry)
    }
}

impl WalletRepository for SqliteWalletRepository {
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, enrollment_id, wallet_number, balance_cents, status,
                   created_at, updated_at
            FROM wallets
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    async fn find_by_enrollment(&self, enrollment_id: i64) -> StorageResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, enrollment_id, wallet_number, balance_cents, status,
                   created_at, updated_at
            FROM wallets
            WHERE enrollment_id = ?
            "#,
        )
        .bind(enrollment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    async fn credit(
        &self,
        wallet_id: i64,
        amount_cents: i64,
        description: Option<&str>,
    ) -> StorageResult<WalletTransaction> {
        self.apply(wallet_id, TransactionType::Credit, amount_cents, description)
            .await
    }

    async fn debit(
        &self,
        wallet_id: i64,
        amount_cents: i64,
        description: Option<&str>,
    ) -> StorageResult<WalletTransaction> {
        self.apply(wallet_id, TransactionType::Debit, amount_cents, description)
            .await
    }

    async fn transactions(
        &self,
        wallet_id: i64,
        limit: i64,
    ) -> StorageResult<Vec<WalletTransaction>> {
        let entries = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, wallet_id, transaction_type, amount_cents,
                   balance_before, balance_after, description, created_at
            FROM wallet_transactions
            WHERE wallet_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(wallet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::{NewEnrollment, User};
    use crate::repositories::card::{CardRepository, SqliteCardRepository};
    use crate::repositories::enrollment::{EnrollmentRepository, SqliteEnrollmentRepository};
    use crate::repositories::user::{SqliteUserRepository, UserRepository};
    use chrono::Utc;
    use tapgate_core::{ActivationData, CardDetection};

    async fn seed_wallet(db: &Database) -> Wallet {
        let users = SqliteUserRepository::new(db.pool().clone());
        let user_id = users
            .create(&User {
                id: 0,
                auth_id: "auth-1".to_string(),
                full_name: "Test User".to_string(),
                employee_id: None,
                institution_id: Some(1),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let cards = SqliteCardRepository::new(db.pool().clone());
        let frame = ActivationData::from_uid_bytes(
            &[0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6],
            [0x44, 0x00],
            0x00,
        )
        .unwrap();
        let (card, _) = cards
            .find_or_create(&CardDetection::from_activation(&frame).unwrap())
            .await
            .unwrap();

        let enrollments = SqliteEnrollmentRepository::new(db.pool().clone());
        let enrollment = enrollments
            .create(&NewEnrollment {
                card_id: card.id,
                user_id,
                institution_id: 1,
                access_level: "standard".to_string(),
                enrolled_by: None,
                enrollment_reason: None,
            })
            .await
            .unwrap();

        let wallets = SqliteWalletRepository::new(db.pool().clone());
        wallets
            .find_by_enrollment(enrollment.id)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_credit_then_debit() {
        let db = Database::in_memory().await.unwrap();
        let wallet = seed_wallet(&db).await;
        let repo = SqliteWalletRepository::new(db.pool().clone());

        let credit = repo
            .credit(wallet.id, 1000, Some("top-up"))
            .await
            .unwrap();
        assert_eq!(credit.balance_before, 0);
        assert_eq!(credit.balance_after, 1000);

        let debit = repo.debit(wallet.id, 350, Some("cafeteria")).await.unwrap();
        assert_eq!(debit.balance_before, 1000);
        assert_eq!(debit.balance_after, 650);

        let current = repo.find_by_id(wallet.id).await.unwrap().unwrap();
        assert_eq!(current.balance_cents, 650);
    }

    #[tokio::test]
    async fn test_debit_rejects_overdraft() {
        let db = Database::in_memory().await.unwrap();
        let wallet = seed_wallet(&db).await;
        let repo = SqliteWalletRepository::new(db.pool().clone());

        repo.credit(wallet.id, 100, None).await.unwrap();

        match repo.debit(wallet.id, 200, None).await {
            Err(StorageError::InsufficientBalance {
                balance_cents: 100,
                amount_cents: 200,
                ..
            }) => {}
            other => panic!("expected insufficient balance, got {:?}", other),
        }

        // The failed debit left no ledger entry and no balance change.
        let current = repo.find_by_id(wallet.id).await.unwrap().unwrap();
        assert_eq!(current.balance_cents, 100);
        assert_eq!(repo.transactions(wallet.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amounts() {
        let db = Database::in_memory().await.unwrap();
        let wallet = seed_wallet(&db).await;
        let repo = SqliteWalletRepository::new(db.pool().clone());

        assert!(matches!(
            repo.credit(wallet.id, 0, None).await,
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            repo.debit(wallet.id, -5, None).await,
            Err(StorageError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ledger_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let wallet = seed_wallet(&db).await;
        let repo = SqliteWalletRepository::new(db.pool().clone());

        repo.credit(wallet.id, 500, None).await.unwrap();
        repo.debit(wallet.id, 100, None).await.unwrap();

        let ledger = repo.transactions(wallet.id, 10).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(
            ledger[0].get_transaction_type(),
            Some(TransactionType::Debit)
        );
        assert_eq!(
            ledger[1].get_transaction_type(),
            Some(TransactionType::Credit)
        );
    }
}
