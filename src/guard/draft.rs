use serde_json::Value as JsonValue;

/// Holds the last-saved ("baseline") value of a settings section and
/// answers whether a working value has drifted from it.
///
/// The baseline is kept in serialized form, so comparison is deep value
/// equality: object key order is irrelevant and leaves compare by value.
/// Values must be tree-shaped JSON (no cycles, no non-finite numbers),
/// which is all the daemon speaks anyway. A missing baseline means "not
/// yet loaded" and is a valid, never-dirty state.
#[derive(Debug, Default, Clone)]
pub struct DraftTracker {
    baseline: Option<JsonValue>,
}

impl DraftTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff a baseline exists, a working value was supplied, and the
    /// two differ structurally.
    pub fn has_unsaved_changes(&self, current: Option<&JsonValue>) -> bool {
        match (&self.baseline, current) {
            (Some(base), Some(cur)) => base != cur,
            _ => false,
        }
    }

    /// Replace the baseline with an independent copy of `value`.
    /// Called after a successful load and after a successful save.
    pub fn reset_original(&mut self, value: &JsonValue) {
        self.baseline = Some(value.clone());
    }

    /// An independent copy of the baseline for the panel to adopt as its
    /// working value again, or `None` when nothing was loaded yet.
    pub fn discard_changes(&self) -> Option<JsonValue> {
        self.baseline.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.baseline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unloaded_tracker_is_never_dirty() {
        let t = DraftTracker::new();
        assert!(!t.has_unsaved_changes(None));
        assert!(!t.has_unsaved_changes(Some(&json!({"a": 1}))));
        assert!(t.discard_changes().is_none());
    }

    #[test]
    fn clean_after_reset_dirty_after_change() {
        let mut t = DraftTracker::new();
        let v = json!({"delays": {"episode_end": 600, "movie_end": 1800}});
        t.reset_original(&v);
        assert!(!t.has_unsaved_changes(Some(&v)));

        let mut edited = v.clone();
        edited["delays"]["episode_end"] = json!(900);
        assert!(t.has_unsaved_changes(Some(&edited)));
    }

    #[test]
    fn missing_current_value_is_not_dirty() {
        let mut t = DraftTracker::new();
        t.reset_original(&json!({"a": 1}));
        assert!(!t.has_unsaved_changes(None));
    }

    #[test]
    fn key_order_does_not_matter() {
        let mut t = DraftTracker::new();
        t.reset_original(&json!({"a": 1, "b": 2}));
        assert!(!t.has_unsaved_changes(Some(&json!({"b": 2, "a": 1}))));
    }

    #[test]
    fn discard_returns_independent_copy() {
        let mut t = DraftTracker::new();
        let v = json!({"delays": {"episode_end": 600}});
        t.reset_original(&v);

        let mut copy = t.discard_changes().unwrap();
        assert_eq!(copy, v);
        copy["delays"]["episode_end"] = json!(0);
        // Mutating the returned value must not affect the stored baseline.
        assert_eq!(t.discard_changes().unwrap(), v);
    }

    #[test]
    fn reset_replaces_baseline_wholesale() {
        let mut t = DraftTracker::new();
        t.reset_original(&json!({"a": 1}));
        t.reset_original(&json!({"a": 2}));
        assert!(t.has_unsaved_changes(Some(&json!({"a": 1}))));
        assert!(!t.has_unsaved_changes(Some(&json!({"a": 2}))));
    }
}
