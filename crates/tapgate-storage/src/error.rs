use thiserror::Error;

/// Storage-specific error types for the Tapgate card-session coordinator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Entity not found in database
    #[error("Entity not found: {entity_type} with {field}={value}")]
    NotFound {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Data validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Debit rejected because the wallet balance does not cover it
    #[error("Insufficient balance on wallet {wallet_id}: {balance_cents} < {amount_cents}")]
    InsufficientBalance {
        wallet_id: i64,
        balance_cents: i64,
        amount_cents: i64,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Shorthand for a [`StorageError::NotFound`].
    pub fn not_found(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
