//! In-memory enrollment cache.

use std::collections::HashMap;
use tapgate_storage::Enrollment;

/// Cache of active enrollments keyed by card id.
///
/// Invalidation is manual only: there is no TTL, and external mutations of
/// the enrollments table are invisible until `refresh_cache` (full rebuild)
/// or `invalidate` (single card) is called. The coordinator invalidates on
/// its own enrollment writes; everything else is the caller's contract.
#[derive(Debug, Default)]
pub struct EnrollmentCache {
    entries: HashMap<i64, Enrollment>,
}

impl EnrollmentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the cached active enrollment for a card.
    pub fn get(&self, card_id: i64) -> Option<&Enrollment> {
        self.entries.get(&card_id)
    }

    /// Insert or replace the entry for a card.
    pub fn insert(&mut self, enrollment: Enrollment) {
        self.entries.insert(enrollment.card_id, enrollment);
    }

    /// Drop the entry for one card.
    pub fn invalidate(&mut self, card_id: i64) {
        self.entries.remove(&card_id);
    }

    /// Replace the whole cache with a fresh set of active enrollments.
    pub fn replace_all(&mut self, enrollments: Vec<Enrollment>) {
        self.entries = enrollments
            .into_iter()
            .map(|e| (e.card_id, e))
            .collect();
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn enrollment(card_id: i64) -> Enrollment {
        Enrollment {
            id: card_id * 10,
            card_id,
            user_id: 1,
            institution_id: 1,
            status: "active".to_string(),
            access_level: "standard".to_string(),
            enrolled_by: None,
            enrollment_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_get_invalidate() {
        let mut cache = EnrollmentCache::new();
        cache.insert(enrollment(1));
        cache.insert(enrollment(2));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1).unwrap().id, 10);

        cache.invalidate(1);
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn test_replace_all() {
        let mut cache = EnrollmentCache::new();
        cache.insert(enrollment(1));

        cache.replace_all(vec![enrollment(2), enrollment(3)]);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(1).is_none());
        assert!(cache.get(3).is_some());
    }
}
