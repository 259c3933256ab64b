//! Recommendation Store: pending recommendations keyed by request id.
//!
//! An entry is created once per request when its response finishes, and
//! leaves the store on apply, reject, chat clear, or TTL sweep. Entries are
//! replaced wholesale; removing the last recommendation of an entry removes
//! the key, so the store never holds an empty set.
//!
//! The store itself is synchronous. Callers share it behind a
//! `TokioMutex` and finish each mutation inside a single lock scope.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::errors::AgentError;
use crate::response::{Recommendation, RequestId};

/// How long pending recommendations survive, measured from the request's
/// embedded timestamp.
pub const DEFAULT_RECOMMENDATION_TTL: Duration = Duration::from_secs(30 * 60);

// ─── RecommendationStore ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecommendationStore {
    entries: HashMap<RequestId, Vec<Recommendation>>,
}

impl RecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `recommendations` for `request_id`, replacing any previous set.
    ///
    /// Duplicate paths keep their first occurrence. An empty set stores
    /// nothing and removes any previous entry.
    pub fn put(&mut self, request_id: &RequestId, recommendations: Vec<Recommendation>) {
        let mut unique: Vec<Recommendation> = Vec::with_capacity(recommendations.len());
        for rec in recommendations {
            if !unique.iter().any(|r| r.file_path == rec.file_path) {
                unique.push(rec);
            }
        }

        if unique.is_empty() {
            self.entries.remove(request_id);
            return;
        }

        tracing::info!(
            request_id = %request_id,
            count = unique.len(),
            "recommendations stored"
        );
        self.entries.insert(request_id.clone(), unique);
    }

    /// Pending recommendations for `request_id`, without consuming them.
    pub fn get(&self, request_id: &RequestId) -> Result<&[Recommendation], AgentError> {
        self.entries
            .get(request_id)
            .map(Vec::as_slice)
            .ok_or_else(|| AgentError::RecommendationsNotFound {
                request_id: request_id.to_string(),
            })
    }

    /// Find one pending recommendation by exact path.
    pub fn find(&self, request_id: &RequestId, path: &str) -> Result<&Recommendation, AgentError> {
        self.get(request_id)?
            .iter()
            .find(|r| r.file_path == path)
            .ok_or_else(|| AgentError::RecommendationNotFound {
                request_id: request_id.to_string(),
                path: path.to_string(),
            })
    }

    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.entries.contains_key(request_id)
    }

    /// Remove one recommendation by path. Returns it if it was present.
    pub fn remove_one(&mut self, request_id: &RequestId, path: &str) -> Option<Recommendation> {
        let current = self.entries.get(request_id)?;
        let position = current.iter().position(|r| r.file_path == path)?;

        let mut remaining = current.clone();
        let removed = remaining.remove(position);
        if remaining.is_empty() {
            self.entries.remove(request_id);
        } else {
            self.entries.insert(request_id.clone(), remaining);
        }

        tracing::info!(request_id = %request_id, path, "recommendation removed");
        Some(removed)
    }

    /// Remove every recommendation for `request_id`. Returns how many there were.
    pub fn clear(&mut self, request_id: &RequestId) -> usize {
        let count = self.entries.remove(request_id).map_or(0, |recs| recs.len());
        if count > 0 {
            tracing::info!(request_id = %request_id, cleared = count, "recommendations cleared");
        }
        count
    }

    /// Drop every entry (chat clear).
    pub fn clear_all(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        if count > 0 {
            tracing::info!(cleared = count, "all pending recommendations cleared");
        }
    }

    /// Remove entries whose request timestamp is older than `max_age` at
    /// `now`. Returns the number of entries removed.
    pub fn sweep(&mut self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let now_ms = now.timestamp_millis();
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);

        let before = self.entries.len();
        self.entries
            .retain(|request_id, _| request_id.age_ms(now_ms) <= max_age_ms);
        let removed = before - self.entries.len();

        if removed > 0 {
            tracing::info!(removed, remaining = self.entries.len(), "expired recommendations swept");
        }
        removed
    }

    /// Number of requests with pending recommendations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str, code: &str) -> Recommendation {
        Recommendation {
            file_path: path.into(),
            code: code.into(),
            language: None,
            line_numbers: None,
        }
    }

    fn id_at(ms: i64) -> RequestId {
        RequestId::with_timestamp(ms)
    }

    #[test]
    fn test_put_and_get() {
        let mut store = RecommendationStore::new();
        let id = id_at(1_000);
        store.put(&id, vec![rec("a.rs", "a"), rec("b.rs", "b")]);

        let recs = store.get(&id).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].file_path, "a.rs");
        assert!(store.contains(&id));
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let store = RecommendationStore::new();
        let id = RequestId::parse("req_1_abc").unwrap();
        let err = store.get(&id).unwrap_err();
        assert!(matches!(err, AgentError::RecommendationsNotFound { .. }));
    }

    #[test]
    fn test_put_dedups_first_wins() {
        let mut store = RecommendationStore::new();
        let id = id_at(1);
        store.put(&id, vec![rec("main.go", "first"), rec("main.go", "second")]);
        let recs = store.get(&id).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].code, "first");
    }

    #[test]
    fn test_put_replaces_wholesale() {
        let mut store = RecommendationStore::new();
        let id = id_at(1);
        store.put(&id, vec![rec("a.rs", "a"), rec("b.rs", "b")]);
        store.put(&id, vec![rec("c.rs", "c")]);
        let recs = store.get(&id).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].file_path, "c.rs");
    }

    #[test]
    fn test_put_empty_leaves_no_entry() {
        let mut store = RecommendationStore::new();
        let id = id_at(1);
        store.put(&id, vec![rec("a.rs", "a")]);
        store.put(&id, Vec::new());
        assert!(!store.contains(&id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_last_removes_key() {
        let mut store = RecommendationStore::new();
        let id = id_at(1);
        store.put(&id, vec![rec("a.rs", "a"), rec("b.rs", "b")]);

        assert_eq!(store.remove_one(&id, "a.rs").unwrap().code, "a");
        assert_eq!(store.get(&id).unwrap().len(), 1);
        assert!(store.remove_one(&id, "missing.rs").is_none());

        store.remove_one(&id, "b.rs");
        assert!(!store.contains(&id));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_find() {
        let mut store = RecommendationStore::new();
        let id = id_at(1);
        store.put(&id, vec![rec("a.rs", "a")]);
        assert_eq!(store.find(&id, "a.rs").unwrap().code, "a");
        assert!(matches!(
            store.find(&id, "b.rs"),
            Err(AgentError::RecommendationNotFound { .. })
        ));
    }

    #[test]
    fn test_clear_and_clear_all() {
        let mut store = RecommendationStore::new();
        let a = id_at(1);
        let b = id_at(2);
        store.put(&a, vec![rec("a.rs", "a"), rec("b.rs", "b")]);
        store.put(&b, vec![rec("c.rs", "c")]);

        assert_eq!(store.clear(&a), 2);
        assert_eq!(store.clear(&a), 0);
        assert_eq!(store.len(), 1);

        store.clear_all();
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_ttl_boundary() {
        let now = Utc::now();
        let minute_ms = 60_000;
        let old = id_at(now.timestamp_millis() - 31 * minute_ms);
        let fresh = id_at(now.timestamp_millis() - 29 * minute_ms);

        let mut store = RecommendationStore::new();
        store.put(&old, vec![rec("old.rs", "x")]);
        store.put(&fresh, vec![rec("fresh.rs", "y")]);

        let removed = store.sweep(now, DEFAULT_RECOMMENDATION_TTL);
        assert_eq!(removed, 1);
        assert!(!store.contains(&old));
        assert!(store.contains(&fresh));
    }

    #[test]
    fn test_sweep_keeps_future_ids() {
        let now = Utc::now();
        let future = id_at(now.timestamp_millis() + 60_000);
        let mut store = RecommendationStore::new();
        store.put(&future, vec![rec("a.rs", "a")]);
        assert_eq!(store.sweep(now, DEFAULT_RECOMMENDATION_TTL), 0);
    }
}
