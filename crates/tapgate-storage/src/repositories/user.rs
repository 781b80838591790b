#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::User;
use sqlx::SqlitePool;

/// Repository trait for User entity operations
///
/// # Implementation Note
///
/// This trait uses native async trait methods (Edition 2024 feature),
/// eliminating the need for the async-trait crate.
pub trait UserRepository: Send + Sync {
    /// Find a user by technical key
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<User>>;

    /// Find a user by external identity reference
    async fn find_by_auth_id(&self, auth_id: &str) -> StorageResult<Option<User>>;

    /// Create a new user
    async fn create(&self, user: &User) -> StorageResult<i64>;

    /// Update an existing user
    async fn update(&self, user: &User) -> StorageResult<()>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Create a new SQLite user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, auth_id, full_name, employee_id, institution_id,
                   created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_auth_id(&self, auth_id: &str) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, auth_id, full_name, employee_id, institution_id,
                   created_at, updated_at
            FROM users
            WHERE auth_id = ?
            "#,
        )
        .bind(auth_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: &User) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (auth_id, full_name, employee_id, institution_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.auth_id)
        .bind(&user.full_name)
        .bind(&user.employee_id)
        .bind(user.institution_id)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update(&self, user: &User) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET auth_id = ?, full_name = ?, employee_id = ?, institution_id = ?,
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(&user.auth_id)
        .bind(&user.full_name)
        .bind(&user.employee_id)
        .bind(user.institution_id)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("User", "id", user.id));
        }

        Ok(())
    }
}
