#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{AttendanceRecord, RecordType};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Repository trait for attendance records
///
/// The badge-in/badge-out toggle itself lives in the session layer; this
/// repository only answers "what was the last record since the day started"
/// and appends new records.
pub trait AttendanceRepository: Send + Sync {
    /// Append an attendance record
    async fn create(
        &self,
        user_id: i64,
        record_type: RecordType,
        record_time: DateTime<Utc>,
        access_event_id: Option<i64>,
        card_uid: Option<&str>,
    ) -> StorageResult<AttendanceRecord>;

    /// The most recent record for a user at or after the given instant
    async fn last_for_user_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> StorageResult<Option<AttendanceRecord>>;

    /// All records for a user at or after the given instant, oldest first
    async fn list_for_user_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<AttendanceRecord>>;
}

/// SQLite implementation of AttendanceRepository
pub struct SqliteAttendanceRepository {
    pool: SqlitePool,
}

impl SqliteAttendanceRepository {
    /// Create a new SQLite attendance repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AttendanceRepository for SqliteAttendanceRepository {
    async fn create(
        &self,
        user_id: i64,
        record_type: RecordType,
        record_time: DateTime<Utc>,
        access_event_id: Option<i64>,
        card_uid: Option<&str>,
    ) -> StorageResult<AttendanceRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records (user_id, record_type, record_time,
                                            access_event_id, card_uid)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(record_type.as_str())
        .bind(record_time)
        .bind(access_event_id)
        .bind(card_uid)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, user_id, record_type, record_time, access_event_id,
                   card_uid, created_at
            FROM attendance_records
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or_else(|| StorageError::not_found("AttendanceRecord", "id", id))
    }

    async fn last_for_user_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> StorageResult<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, user_id, record_type, record_time, access_event_id,
                   card_uid, created_at
            FROM attendance_records
            WHERE user_id = ? AND record_time >= ?
            ORDER BY record_time DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_for_user_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<AttendanceRecord>> {
        let records = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, user_id, record_type, record_time, access_event_id,
                   card_uid, created_at
            FROM attendance_records
            WHERE user_id = ? AND record_time >= ?
            ORDER BY record_time ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::User;
    use crate::repositories::user::{SqliteUserRepository, UserRepository};
    use chrono::Duration;

    async fn seed_user(db: &Database) -> i64 {
        let users = SqliteUserRepository::new(db.pool().clone());
        users
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
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let db = Database::in_memory().await.unwrap();
        let user_id = seed_user(&db).await;
        let repo = SqliteAttendanceRepository::new(db.pool().clone());

        let now = Utc::now();
        let record = repo
            .create(user_id, RecordType::ClockIn, now, None, Some("04A1B2C3D4E5F6"))
            .await
            .unwrap();

        assert_eq!(record.get_record_type(), Some(RecordType::ClockIn));
        assert_eq!(record.card_uid.as_deref(), Some("04A1B2C3D4E5F6"));
    }

    #[tokio::test]
    async fn test_last_since_returns_newest() {
        let db = Database::in_memory().await.unwrap();
        let user_id = seed_user(&db).await;
        let repo = SqliteAttendanceRepository::new(db.pool().clone());

        let base = Utc::now();
        repo.create(user_id, RecordType::ClockIn, base, None, None)
            .await
            .unwrap();
        repo.create(
            user_id,
            RecordType::ClockOut,
            base + Duration::minutes(30),
            None,
            None,
        )
        .await
        .unwrap();

        let last = repo
            .last_for_user_since(user_id, base - Duration::hours(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.get_record_type(), Some(RecordType::ClockOut));
    }

    #[tokio::test]
    async fn test_last_since_excludes_earlier_days() {
        let db = Database::in_memory().await.unwrap();
        let user_id = seed_user(&db).await;
        let repo = SqliteAttendanceRepository::new(db.pool().clone());

        let yesterday = Utc::now() - Duration::days(1);
        repo.create(user_id, RecordType::ClockIn, yesterday, None, None)
            .await
            .unwrap();

        // A clock-in left open yesterday does not leak into today.
        let today_start = Utc::now() - Duration::hours(1);
        assert!(
            repo.last_for_user_since(user_id, today_start)
                .await
                .unwrap()
                .is_none()
        );
    }
}
