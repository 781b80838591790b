#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::Card;
use sqlx::SqlitePool;
use tapgate_core::CardDetection;

/// Repository trait for Card entity operations
///
/// Cards are append-only: the first detection creates the row and later
/// detections of the same UID reuse it, so the enrollment history of a
/// card survives re-enrollment.
pub trait CardRepository: Send + Sync {
    /// Find a card by its UID (uppercase hex)
    async fn find_by_uid(&self, card_uid: &str) -> StorageResult<Option<Card>>;

    /// Find a card by technical key
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Card>>;

    /// Resolve a detection to its card row, creating one on first sight
    ///
    /// Returns the card and whether it was created by this call.
    async fn find_or_create(&self, detection: &CardDetection) -> StorageResult<(Card, bool)>;

    /// Total number of distinct cards ever seen
    async fn count(&self) -> StorageResult<i64>;
}

/// SQLite implementation of CardRepository
pub struct SqliteCardRepository {
    pool: SqlitePool,
}

impl SqliteCardRepository {
    /// Create a new SQLite card repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl CardRepository for SqliteCardRepository {
    async fn find_by_uid(&self, card_uid: &str) -> StorageResult<Option<Card>> {
        let card = sqlx::query_as::<_, Card>(
            r#"
            SELECT id, card_uid, card_type, uid_length, atq, sak,
                   technical_data, first_seen_at, created_at
            FROM cards
            WHERE card_uid = ?
            "#,
        )
        .bind(card_uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Card>> {
        let card = sqlx::query_as::<_, Card>(
            r#"
            SELECT id, card_uid, card_type, uid_length, atq, sak,
                   technical_data, first_seen_at, created_at
            FROM cards
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn find_or_create(&self, detection: &CardDetection) -> StorageResult<(Card, bool)> {
        if let Some(existing) = self.find_by_uid(&detection.uid).await? {
            return Ok((existing, false));
        }

        let technical_data = detection.technical_json().to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO cards (card_uid, card_type, uid_length, atq, sak,
                               technical_data, first_seen_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&detection.uid)
        .bind(detection.kind.label())
        .bind(detection.uid_length as i64)
        .bind(&detection.atq)
        .bind(&detection.sak)
        .bind(&technical_data)
        .bind(detection.detected_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        let card = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| StorageError::not_found("Card", "id", id))?;

        Ok((card, true))
    }

    async fn count(&self) -> StorageResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cards")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use tapgate_core::{ActivationData, CardKind};

    fn detection(uid: &[u8]) -> CardDetection {
        let frame = ActivationData::from_uid_bytes(uid, [0x44, 0x00], 0x00).unwrap();
        CardDetection::from_activation(&frame).unwrap()
    }

    #[tokio::test]
    async fn test_first_detection_creates_card() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteCardRepository::new(db.pool().clone());

        let d = detection(&[0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        let (card, created) = repo.find_or_create(&d).await.unwrap();

        assert!(created);
        assert_eq!(card.card_uid, d.uid);
        assert_eq!(card.card_type, CardKind::Ntag424.label());
        assert_eq!(card.uid_length, 7);
        assert!(card.technical_data.is_some());
    }

    #[tokio::test]
    async fn test_repeat_detection_reuses_row() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteCardRepository::new(db.pool().clone());

        let d = detection(&[0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        let (first, _) = repo.find_or_create(&d).await.unwrap();
        let (second, created) = repo.find_or_create(&d).await.unwrap();

        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_uid_missing() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteCardRepository::new(db.pool().clone());

        assert!(repo.find_by_uid("DEADBEEF").await.unwrap().is_none());
    }
}
