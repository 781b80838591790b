use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Card entity: one row per physical card ever presented to a reader.
///
/// Rows are created by the first detection and never deleted; an unknown
/// card that is later enrolled reuses the same row. `card_type` stores the
/// classification label (e.g. `ntag424`, `mifare-1k`, `unknown-12chars`)
/// and `technical_data` the raw detection parameters as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    /// Auto-increment primary key
    pub id: i64,

    /// Card UID as uppercase hex (unique)
    pub card_uid: String,

    /// Classification label derived from UID length and SAK
    pub card_type: String,

    /// UID length in bytes (4, 7 or 10)
    pub uid_length: i64,

    /// Answer-to-request, 4 hex chars
    pub atq: Option<String>,

    /// Select acknowledge, 2 hex chars
    pub sak: Option<String>,

    /// Raw detection parameters as JSON
    pub technical_data: Option<String>,

    /// When the card was first seen by any reader
    pub first_seen_at: DateTime<Utc>,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Whether the classification resolved to a known card family.
    pub fn is_known_type(&self) -> bool {
        !self.card_type.starts_with("unknown-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(card_type: &str) -> Card {
        Card {
            id: 1,
            card_uid: "04A1B2C3D4E5F6".to_string(),
            card_type: card_type.to_string(),
            uid_length: 7,
            atq: Some("0044".to_string()),
            sak: Some("00".to_string()),
            technical_data: None,
            first_seen_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_known_type() {
        assert!(card("ntag424").is_known_type());
        assert!(card("mifare-1k").is_known_type());
        assert!(!card("unknown-12chars").is_known_type());
    }
}
