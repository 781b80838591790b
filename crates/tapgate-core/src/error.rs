use thiserror::Error;

/// Errors produced while decoding raw reader data into core types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// UID length reported by the driver is outside the ISO 14443 range.
    #[error("Invalid UID length: {0} (expected 1-10 bytes)")]
    InvalidUidLength(u8),

    /// UID string is not valid uppercase hex.
    #[error("Invalid UID format: {0}")]
    InvalidUid(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
