use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of processing one card detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessResult {
    /// An active enrollment was found; access granted.
    Granted,

    /// No active enrollment, or the enrollment does not grant access.
    Denied,

    /// The pipeline itself failed while processing the detection.
    Error,
}

impl AccessResult {
    /// Parse the database column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "granted" => Some(Self::Granted),
            "denied" => Some(Self::Denied),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Column value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for AccessResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access event: the append-only audit record for one processed detection.
///
/// Exactly one row is written per detection, whatever the outcome. The
/// user/enrollment references are NULL for unknown cards; `card_id` is NULL
/// only when the pipeline failed before the card row could be resolved.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessEvent {
    /// Auto-increment primary key
    pub id: i64,

    /// Card that was presented (NULL if resolution itself failed)
    pub card_id: Option<i64>,

    /// Enrollment that granted or denied access (NULL for unknown cards)
    pub enrollment_id: Option<i64>,

    /// User behind the enrollment (NULL for unknown cards)
    pub user_id: Option<i64>,

    /// Tenant scope of the event
    pub institution_id: Option<i64>,

    /// Outcome (`granted`, `denied`, `error`)
    pub result: String,

    /// Why access was denied, when it was
    pub denial_reason: Option<String>,

    /// Reader model that produced the detection (prefixed `Mock-` when simulated)
    pub reader_type: String,

    /// When the card entered the field
    pub detected_at: DateTime<Utc>,

    /// Pipeline processing time for this detection
    pub processing_time_ms: i64,

    /// Raw detection parameters as JSON
    pub technical_details: Option<String>,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
}

impl AccessEvent {
    /// Typed view of the `result` column.
    pub fn get_result(&self) -> Option<AccessResult> {
        AccessResult::parse(&self.result)
    }

    /// Whether this event recorded a granted access.
    pub fn was_granted(&self) -> bool {
        self.get_result() == Some(AccessResult::Granted)
    }
}

/// Parameters for logging an access event.
#[derive(Debug, Clone)]
pub struct NewAccessEvent {
    pub card_id: Option<i64>,
    pub enrollment_id: Option<i64>,
    pub user_id: Option<i64>,
    pub institution_id: Option<i64>,
    pub result: AccessResult,
    pub denial_reason: Option<String>,
    pub reader_type: String,
    pub detected_at: DateTime<Utc>,
    pub processing_time_ms: i64,
    pub technical_details: Option<String>,
}
