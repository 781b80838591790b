#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{Enrollment, EnrollmentStatus, NewEnrollment};
use sqlx::SqlitePool;

/// Repository trait for Enrollment entity operations
///
/// Enrollment creation is transactional: any existing active enrollment for
/// the same card and institution is superseded (status `none`), the new row
/// is inserted as `active`, and a wallet is provisioned for it. A partial
/// unique index on `(card_id, institution_id) WHERE status = 'active'`
/// backs the at-most-one-active invariant at the database level.
pub trait EnrollmentRepository: Send + Sync {
    /// Find the active enrollment for a card within an institution
    async fn find_active_by_card(
        &self,
        card_id: i64,
        institution_id: i64,
    ) -> StorageResult<Option<Enrollment>>;

    /// Find an enrollment by technical key
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Enrollment>>;

    /// All enrollments for a card, newest first
    async fn find_by_card(&self, card_id: i64) -> StorageResult<Vec<Enrollment>>;

    /// All active enrollments within an institution (cache warm-up)
    async fn find_active_by_institution(
        &self,
        institution_id: i64,
    ) -> StorageResult<Vec<Enrollment>>;

    /// Create an active enrollment, superseding any previous active one
    async fn create(&self, new: &NewEnrollment) -> StorageResult<Enrollment>;

    /// Change an enrollment's lifecycle status
    async fn set_status(&self, id: i64, status: EnrollmentStatus) -> StorageResult<()>;
}

/// SQLite implementation of EnrollmentRepository
pub struct SqliteEnrollmentRepository {
    pool: SqlitePool,
}

impl SqliteEnrollmentRepository {
    /// Create a new SQLite enrollment repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EnrollmentRepository for SqliteEnrollmentRepository {
    async fn find_active_by_card(
        &self,
        card_id: i64,
        institution_id: i64,
    ) -> StorageResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, card_id, user_id, institution_id, status, access_level,
                   enrolled_by, enrollment_reason, created_at, updated_at
            FROM enrollments
            WHERE card_id = ? AND institution_id = ? AND status = 'active'
            "#,
        )
        .bind(card_id)
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enrollment)
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, card_id, user_id, institution_id, status, access_level,
                   enrolled_by, enrollment_reason, created_at, updated_at
            FROM enrollments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enrollment)
    }

    async fn find_by_card(&self, card_id: i64) -> StorageResult<Vec<Enrollment>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, card_id, user_id, institution_id, status, access_level,
                   enrolled_by, enrollment_reason, created_at, updated_at
            FROM enrollments
            WHERE card_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(enrollments)
    }

    async fn find_active_by_institution(
        &self,
        institution_id: i64,
    ) -> StorageResult<Vec<Enrollment>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, card_id, user_id, institution_id, status, access_level,
                   enrolled_by, enrollment_reason, created_at, updated_at
            FROM enrollments
            WHERE institution_id = ? AND status = 'active'
            ORDER BY id ASC
            "#,
        )
        .bind(institution_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(enrollments)
    }

    async fn create(&self, new: &NewEnrollment) -> StorageResult<Enrollment> {
        let mut tx = self.pool.begin().await?;

        // Supersede before insert, or the partial unique index rejects us.
        sqlx::query(
            r#"
            UPDATE enrollments
            SET status = 'none', updated_at = datetime('now')
            WHERE card_id = ? AND institution_id = ? AND status = 'active'
            "#,
        )
        .bind(new.card_id)
        .bind(new.institution_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO enrollments (card_id, user_id, institution_id, status,
                                     access_level, enrolled_by, enrollment_reason)
            VALUES (?, ?, ?, 'active', ?, ?, ?)
            "#,
        )
        .bind(new.card_id)
        .bind(new.user_id)
        .bind(new.institution_id)
        .bind(&new.access_level)
        .bind(new.enrolled_by)
        .bind(&new.enrollment_reason)
        .execute(&mut *tx)
        .await?;

        let enrollment_id = result.last_insert_rowid();
        let wallet_number = format!("W{:04}-{:08}", new.institution_id, enrollment_id);

        sqlx::query(
            r#"
            INSERT INTO wallets (enrollment_id, wallet_number)
            VALUES (?, ?)
            "#,
        )
        .bind(enrollment_id)
        .bind(&wallet_number)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_by_id(enrollment_id)
            .await?
            .ok_or_else(|| StorageError::not_found("Enrollment", "id", enrollment_id))
    }

    async fn set_status(&self, id: i64, status: EnrollmentStatus) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE enrollments
            SET status = ?, updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Enrollment", "id", id));
        }

        Ok(())
    }
}
