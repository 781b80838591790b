use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an enrollment.
///
/// Stored as lowercase text in the `status` column; use
/// [`Enrollment::get_status`] to read it as this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// The enrollment grants access.
    Active,

    /// Explicitly blocked; the card is denied even though it is enrolled.
    Blocked,

    /// Awaiting approval.
    Pending,

    /// Superseded by a newer enrollment for the same card.
    None,
}

impl EnrollmentStatus {
    /// Parse the database column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "blocked" => Some(Self::Blocked),
            "pending" => Some(Self::Pending),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Column value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Pending => "pending",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enrollment entity binding a card to a user within an institution.
///
/// A partial unique index guarantees at most one `active` enrollment per
/// card per institution; creating a new one supersedes the previous active
/// row by setting its status to `none`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    /// Auto-increment primary key
    pub id: i64,

    /// Card being enrolled
    pub card_id: i64,

    /// User the card is bound to
    pub user_id: i64,

    /// Tenant scope of the binding
    pub institution_id: i64,

    /// Lifecycle state (`active`, `blocked`, `pending`, `none`)
    pub status: String,

    /// Access level label (e.g. `standard`, `staff`)
    pub access_level: String,

    /// User who performed the enrollment, if recorded
    pub enrolled_by: Option<i64>,

    /// Free-form reason captured at enrollment time
    pub enrollment_reason: Option<String>,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,

    /// Record last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// Typed view of the `status` column.
    pub fn get_status(&self) -> Option<EnrollmentStatus> {
        EnrollmentStatus::parse(&self.status)
    }

    /// Whether this enrollment currently grants access.
    pub fn is_active(&self) -> bool {
        self.get_status() == Some(EnrollmentStatus::Active)
    }
}

/// Parameters for creating an enrollment.
#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub card_id: i64,
    pub user_id: i64,
    pub institution_id: i64,
    pub access_level: String,
    pub enrolled_by: Option<i64>,
    pub enrollment_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            EnrollmentStatus::Active,
            EnrollmentStatus::Blocked,
            EnrollmentStatus::Pending,
            EnrollmentStatus::None,
        ] {
            assert_eq!(EnrollmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EnrollmentStatus::parse("revoked"), None);
    }

    #[test]
    fn test_is_active() {
        let enrollment = Enrollment {
            id: 1,
            card_id: 1,
            user_id: 1,
            institution_id: 1,
            status: "active".to_string(),
            access_level: "standard".to_string(),
            enrolled_by: None,
            enrollment_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(enrollment.is_active());

        let blocked = Enrollment {
            status: "blocked".to_string(),
            ..enrollment
        };
        assert!(!blocked.is_active());
    }
}
