//! Error types for reader operations.

use thiserror::Error;

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors that can occur while talking to a card reader.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The driver binding cannot be loaded on this host.
    #[error("Reader driver unavailable: {reason}")]
    DriverUnavailable { reason: String },

    /// Every connection strategy failed.
    #[error("Failed to connect to reader after {attempts} attempts")]
    ConnectionFailed { attempts: u32 },

    /// The driver returned a non-zero status code.
    #[error("Driver call {operation} failed with status {code}")]
    Driver { operation: &'static str, code: i32 },

    /// No card entered the field within the requested window.
    #[error("Scan timeout after {timeout_ms}ms - no card detected")]
    ScanTimeout { timeout_ms: u64 },

    /// Operation requires a connected reader.
    #[error("Reader not connected")]
    NotConnected,

    /// The poller event channel was dropped by the consumer.
    #[error("Poller event channel closed")]
    ChannelClosed,

    /// The driver reported a frame that does not decode to a valid card.
    #[error(transparent)]
    InvalidData(#[from] tapgate_core::CoreError),
}

impl ReaderError {
    /// Create a driver-status error.
    pub fn driver(operation: &'static str, code: i32) -> Self {
        Self::Driver { operation, code }
    }

    /// Create an unavailable-driver error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::DriverUnavailable {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ReaderError::ConnectionFailed { attempts: 2 };
        assert_eq!(
            error.to_string(),
            "Failed to connect to reader after 2 attempts"
        );

        let error = ReaderError::driver("activate_card", -3);
        assert_eq!(
            error.to_string(),
            "Driver call activate_card failed with status -3"
        );

        let error = ReaderError::ScanTimeout { timeout_ms: 10_000 };
        assert!(error.to_string().contains("10000ms"));
    }
}
