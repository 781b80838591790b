#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{AccessEvent, AccessResult, NewAccessEvent};
use sqlx::SqlitePool;

/// Repository trait for the access event audit trail
///
/// The table is append-only: events are never updated or deleted, and the
/// coordinator writes exactly one per processed detection.
pub trait AccessEventRepository: Send + Sync {
    /// Append an access event, returning the stored row
    async fn log(&self, event: &NewAccessEvent) -> StorageResult<AccessEvent>;

    /// Find an event by technical key
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<AccessEvent>>;

    /// Most recent events, newest first
    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<AccessEvent>>;

    /// Events for one card, newest first
    async fn find_by_card(&self, card_id: i64, limit: i64) -> StorageResult<Vec<AccessEvent>>;

    /// Number of events with the given outcome
    async fn count_by_result(&self, result: AccessResult) -> StorageResult<i64>;
}

/// SQLite implementation of AccessEventRepository
pub struct SqliteAccessEventRepository {
    pool: SqlitePool,
}

impl SqliteAccessEventRepository {
    /// Create a new SQLite access event repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, card_id, enrollment_id, user_id, institution_id, result,
           denial_reason, reader_type, detected_at, processing_time_ms,
           technical_details, created_at
    FROM access_events
"#;

impl AccessEventRepository for SqliteAccessEventRepository {
    async fn log(&self, event: &NewAccessEvent) -> StorageResult<AccessEvent> {
        let result = sqlx::query(
            r#"
            INSERT INTO access_events (card_id, enrollment_id, user_id, institution_id,
                                       result, denial_reason, reader_type, detected_at,
                                       processing_time_ms, technical_details)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.card_id)
        .bind(event.enrollment_id)
        .bind(event.user_id)
        .bind(event.institution_id)
        .bind(event.result.as_str())
        .bind(&event.denial_reason)
        .bind(&event.reader_type)
        .bind(event.detected_at)
        .bind(event.processing_time_ms)
        .bind(&event.technical_details)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.find_by_id(id)
            .await?
            .ok_or_else(|| StorageError::not_found("AccessEvent", "id", id))
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<AccessEvent>> {
        let event =
            sqlx::query_as::<_, AccessEvent>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(event)
    }

    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<AccessEvent>> {
        let events = sqlx::query_as::<_, AccessEvent>(&format!(
            "{} ORDER BY id DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn find_by_card(&self, card_id: i64, limit: i64) -> StorageResult<Vec<AccessEvent>> {
        let events = sqlx::query_as::<_, AccessEvent>(&format!(
            "{} WHERE card_id = ? ORDER BY id DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(card_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn count_by_result(&self, result: AccessResult) -> StorageResult<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM access_events WHERE result = ?")
                .bind(result.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use chrono::Utc;

    fn denied_event() -> NewAccessEvent {
        NewAccessEvent {
            card_id: None,
            enrollment_id: None,
            user_id: None,
            institution_id: Some(1),
            result: AccessResult::Denied,
            denial_reason: Some("card_not_enrolled".to_string()),
            reader_type: "XT-N424-WR".to_string(),
            detected_at: Utc::now(),
            processing_time_ms: 12,
            technical_details: None,
        }
    }

    #[tokio::test]
    async fn test_log_and_read_back() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteAccessEventRepository::new(db.pool().clone());

        let stored = repo.log(&denied_event()).await.unwrap();
        assert_eq!(stored.get_result(), Some(AccessResult::Denied));
        assert_eq!(stored.denial_reason.as_deref(), Some("card_not_enrolled"));
        assert!(!stored.was_granted());
    }

    #[tokio::test]
    async fn test_unknown_card_event_has_no_references() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteAccessEventRepository::new(db.pool().clone());

        let stored = repo.log(&denied_event()).await.unwrap();
        assert!(stored.card_id.is_none());
        assert!(stored.enrollment_id.is_none());
        assert!(stored.user_id.is_none());
    }

    #[tokio::test]
    async fn test_find_recent_orders_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteAccessEventRepository::new(db.pool().clone());

        let first = repo.log(&denied_event()).await.unwrap();
        let second = repo.log(&denied_event()).await.unwrap();

        let recent = repo.find_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].id, first.id);
    }

    #[tokio::test]
    async fn test_count_by_result() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteAccessEventRepository::new(db.pool().clone());

        repo.log(&denied_event()).await.unwrap();
        let mut granted = denied_event();
        granted.result = AccessResult::Granted;
        granted.denial_reason = None;
        repo.log(&granted).await.unwrap();

        assert_eq!(repo.count_by_result(AccessResult::Denied).await.unwrap(), 1);
        assert_eq!(
            repo.count_by_result(AccessResult::Granted).await.unwrap(),
            1
        );
        assert_eq!(repo.count_by_result(AccessResult::Error).await.unwrap(), 0);
    }
}
