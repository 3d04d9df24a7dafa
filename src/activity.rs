//! Bounded, append-only activity trail. Display only — nothing reads it
//! back for business decisions.

use chrono::Utc;

use crate::types::{Activity, ActivityKind};

/// How many entries the trail retains. Older entries fall off the end.
pub const MAX_ACTIVITY_ENTRIES: usize = 50;

/// Newest-first list of recent mutations, capped at
/// [`MAX_ACTIVITY_ENTRIES`].
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Vec<Activity>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from a persisted snapshot, enforcing the cap.
    pub fn from_entries(mut entries: Vec<Activity>) -> Self {
        entries.truncate(MAX_ACTIVITY_ENTRIES);
        ActivityLog { entries }
    }

    /// Record one entry, stamped now, newest first.
    pub fn record(&mut self, action: &str, details: String, kind: ActivityKind) {
        self.entries.insert(
            0,
            Activity {
                action: action.to_string(),
                details,
                kind,
                timestamp: Utc::now(),
            },
        );
        if self.entries.len() > MAX_ACTIVITY_ENTRIES {
            self.entries.truncate(MAX_ACTIVITY_ENTRIES);
        }
    }

    pub fn entries(&self) -> &[Activity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_fifty() {
        let mut log = ActivityLog::new();
        for i in 0..60 {
            log.record("Lead Updated", format!("edit {}", i), ActivityKind::Updated);
        }
        assert_eq!(log.len(), MAX_ACTIVITY_ENTRIES);
        // newest first: the last record sits at the front
        assert_eq!(log.entries()[0].details, "edit 59");
        assert_eq!(log.entries()[49].details, "edit 10");
    }

    #[test]
    fn rehydrate_enforces_the_cap() {
        let mut log = ActivityLog::new();
        for i in 0..70 {
            log.record("x", i.to_string(), ActivityKind::Status);
        }
        let restored = ActivityLog::from_entries(log.entries().to_vec());
        assert_eq!(restored.len(), MAX_ACTIVITY_ENTRIES);
        assert_eq!(restored.entries()[0].details, "69");
    }
}
