use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Start of a presence interval.
    ClockIn,

    /// End of a presence interval.
    ClockOut,
}

impl RecordType {
    /// Parse the database column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clock_in" => Some(Self::ClockIn),
            "clock_out" => Some(Self::ClockOut),
            _ => None,
        }
    }

    /// Column value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClockIn => "clock_in",
            Self::ClockOut => "clock_out",
        }
    }

    /// The record type that follows this one in the badge-in/badge-out cycle.
    pub fn toggled(&self) -> Self {
        match self {
            Self::ClockIn => Self::ClockOut,
            Self::ClockOut => Self::ClockIn,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attendance record written when an enrolled card badges.
///
/// Consecutive badges by the same user on the same day alternate between
/// `clock_in` and `clock_out`; the day boundary resets the cycle to
/// `clock_in`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    /// Auto-increment primary key
    pub id: i64,

    /// User who badged
    pub user_id: i64,

    /// Direction (`clock_in` or `clock_out`)
    pub record_type: String,

    /// When the badge happened
    pub record_time: DateTime<Utc>,

    /// Access event that produced this record
    pub access_event_id: Option<i64>,

    /// UID of the card used
    pub card_uid: Option<String>,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Typed view of the `record_type` column.
    pub fn get_record_type(&self) -> Option<RecordType> {
        RecordType::parse(&self.record_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_round_trip() {
        assert_eq!(RecordType::parse("clock_in"), Some(RecordType::ClockIn));
        assert_eq!(RecordType::parse("clock_out"), Some(RecordType::ClockOut));
        assert_eq!(RecordType::parse("lunch"), None);
    }

    #[test]
    fn test_toggle_alternates() {
        assert_eq!(RecordType::ClockIn.toggled(), RecordType::ClockOut);
        assert_eq!(RecordType::ClockOut.toggled(), RecordType::ClockIn);
    }
}
