use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity: a person who can hold card enrollments.
///
/// `auth_id` is the external identity-provider reference; `institution_id`
/// scopes the user to one tenant. Both are natural keys used by enrollment
/// lookups, while `id` is the technical key used for foreign keys.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Auto-increment primary key
    pub id: i64,

    /// External identity reference (unique)
    pub auth_id: String,

    /// Display name
    pub full_name: String,

    /// Employee/student registration number, if any
    pub employee_id: Option<String>,

    /// Tenant the user belongs to
    pub institution_id: Option<i64>,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,

    /// Record last update timestamp
    pub updated_at: DateTime<Utc>,
}
