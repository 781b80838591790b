//! Session configuration.

use serde::{Deserialize, Serialize};
use tapgate_core::constants::DEFAULT_POLL_INTERVAL_MS;

/// Behavioral switches for a coordinator session.
///
/// Echoed verbatim in the status snapshot so operators can see which
/// side-effects a running session will produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Interval between reader poll ticks, in milliseconds.
    pub polling_interval_ms: u64,

    /// Write attendance records for enrolled cards.
    pub attendance_mode: bool,

    /// Look up and report the wallet of enrolled cards.
    pub wallet_enabled: bool,

    /// Emit an enrollment request for unknown cards instead of only
    /// logging the denial. The coordinator never enrolls silently.
    pub auto_enrollment: bool,

    /// Free-form label for where this reader is installed.
    pub reader_location: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            polling_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            attendance_mode: true,
            wallet_enabled: true,
            auto_enrollment: false,
            reader_location: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SessionOptions::default();
        assert_eq!(options.polling_interval_ms, 300);
        assert!(options.attendance_mode);
        assert!(options.wallet_enabled);
        assert!(!options.auto_enrollment);
        assert!(options.reader_location.is_none());
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let options: SessionOptions =
            serde_json::from_str(r#"{"auto_enrollment": true}"#).unwrap();
        assert!(options.auto_enrollment);
        assert_eq!(options.polling_interval_ms, 300);
    }
}
