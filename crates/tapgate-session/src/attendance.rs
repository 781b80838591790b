//! Attendance toggle.
//!
//! Each badge by an enrolled user flips their state for the day: no open
//! interval means `clock_in`, an open interval means `clock_out`. The day
//! boundary (UTC midnight) resets the cycle, so a clock-in left open
//! yesterday never turns today's first badge into a clock-out. There is no
//! debounce: the N-th badge of a day strictly alternates.

use crate::error::Result;
use chrono::{DateTime, Utc};
use tapgate_storage::{AttendanceRecord, AttendanceRepository, RecordType};

/// UTC midnight of the day containing `now`.
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

/// Record the next attendance event for a user.
///
/// Looks at the most recent record since the day started: a `clock_in`
/// means the user is present and this badge closes the interval; anything
/// else (no record, or a `clock_out`) opens a new one.
pub async fn toggle<R: AttendanceRepository>(
    repo: &R,
    user_id: i64,
    now: DateTime<Utc>,
    access_event_id: Option<i64>,
    card_uid: Option<&str>,
) -> Result<AttendanceRecord> {
    let last = repo.last_for_user_since(user_id, day_start(now)).await?;

    let next = match last.as_ref().and_then(|r| r.get_record_type()) {
        Some(RecordType::ClockIn) => RecordType::ClockOut,
        Some(RecordType::ClockOut) | None => RecordType::ClockIn,
    };

    let record = repo
        .create(user_id, next, now, access_event_id, card_uid)
        .await?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tapgate_storage::repositories::SqliteAttendanceRepository;
    use tapgate_storage::repositories::{SqliteUserRepository, UserRepository};
    use tapgate_storage::{Database, User};

    #[test]
    fn test_day_start() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 14, 30, 45).unwrap();
        let start = day_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap());
    }

    async fn seed_user(db: &Database) -> i64 {
        let users = SqliteUserRepository::new(db.pool().clone());
        users
            .create(&User {
                id: 0,
                auth_id: "auth-1".to_string(),
                full_name: "Test User".to_string(),
                employee_id: None,
                institution_id: Some(1),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_badges_alternate_within_a_day() {
        let db = Database::in_memory().await.unwrap();
        let user_id = seed_user(&db).await;
        let repo = SqliteAttendanceRepository::new(db.pool().clone());

        let base = Utc.with_ymd_and_hms(2025, 6, 15, 8, 0, 0).unwrap();

        let first = toggle(&repo, user_id, base, None, None).await.unwrap();
        assert_eq!(first.get_record_type(), Some(RecordType::ClockIn));

        let second = toggle(&repo, user_id, base + Duration::hours(4), None, None)
            .await
            .unwrap();
        assert_eq!(second.get_record_type(), Some(RecordType::ClockOut));

        // Third badge of the day opens a new interval.
        let third = toggle(&repo, user_id, base + Duration::hours(5), None, None)
            .await
            .unwrap();
        assert_eq!(third.get_record_type(), Some(RecordType::ClockIn));
    }

    #[tokio::test]
    async fn test_open_interval_does_not_cross_days() {
        let db = Database::in_memory().await.unwrap();
        let user_id = seed_user(&db).await;
        let repo = SqliteAttendanceRepository::new(db.pool().clone());

        let yesterday = Utc.with_ymd_and_hms(2025, 6, 14, 22, 0, 0).unwrap();
        let opened = toggle(&repo, user_id, yesterday, None, None).await.unwrap();
        assert_eq!(opened.get_record_type(), Some(RecordType::ClockIn));

        // Next morning: a fresh clock-in, not a clock-out of yesterday.
        let morning = Utc.with_ymd_and_hms(2025, 6, 15, 8, 0, 0).unwrap();
        let next = toggle(&repo, user_id, morning, None, None).await.unwrap();
        assert_eq!(next.get_record_type(), Some(RecordType::ClockIn));
    }
}
