//! Error types for the session coordinator.

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur while coordinating a card session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operator has no institution, so detections cannot be scoped.
    #[error("No institution found for operator {auth_id}")]
    InstitutionNotFound { auth_id: String },

    /// Enrollment was requested for a UID no reader has ever seen.
    #[error("Card {card_uid} has never been detected")]
    CardNotFound { card_uid: String },

    /// `start()` was called while a session is already running.
    #[error("Session is already running")]
    AlreadyRunning,

    /// The coordinator has not been initialized with an operator.
    #[error("Session not initialized")]
    NotInitialized,

    /// Reader-level failure.
    #[error(transparent)]
    Reader(#[from] tapgate_reader::ReaderError),

    /// Storage-level failure.
    #[error(transparent)]
    Storage(#[from] tapgate_storage::StorageError),
}
