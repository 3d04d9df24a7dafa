//! HTTP-backed lead store with a local snapshot cache.
//!
//! Mirrors the hosted deployment: a small REST backend owns the table and
//! this client keeps a JSON snapshot of the last successful read next to
//! the local database. When the backend is unreachable the snapshot is
//! served instead, so the app opens with stale data rather than nothing.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::store::{LeadStore, SaveOutcome, StoreError};
use crate::types::{Activity, Lead};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend reply for writes: `{ "success": true, "id": 42 }`.
#[derive(Debug, Deserialize)]
struct WriteReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

pub struct RemoteLeadStore {
    base_url: String,
    client: Client,
    snapshot_path: PathBuf,
    activity_path: PathBuf,
}

impl RemoteLeadStore {
    /// Point at a backend. The snapshot cache lands in
    /// `~/.leadledger/leads_snapshot.json`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeDirNotFound)?;
        Ok(Self::with_snapshot_path(
            base_url,
            home.join(".leadledger").join("leads_snapshot.json"),
        ))
    }

    /// Explicit snapshot location. Useful for testing. The activity trail
    /// lands next to the lead snapshot.
    pub fn with_snapshot_path(base_url: impl Into<String>, snapshot_path: PathBuf) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let activity_path = snapshot_path.with_file_name("activity_snapshot.json");
        RemoteLeadStore {
            base_url,
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            snapshot_path,
            activity_path,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn fetch_remote(&self) -> Result<Vec<Lead>, StoreError> {
        let leads: Vec<Lead> = self
            .client
            .get(self.endpoint("leads"))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(leads)
    }

    fn write_snapshot(&self, leads: &[Lead]) -> Result<(), StoreError> {
        if let Some(parent) = self.snapshot_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.snapshot_path, serde_json::to_string(leads)?)?;
        Ok(())
    }

    fn read_snapshot(&self) -> Result<Vec<Lead>, StoreError> {
        if !self.snapshot_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.snapshot_path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl LeadStore for RemoteLeadStore {
    /// Remote first; on any transport failure, fall back to the last
    /// cached snapshot (possibly empty).
    fn list(&mut self) -> Result<Vec<Lead>, StoreError> {
        match self.fetch_remote() {
            Ok(leads) => {
                if let Err(e) = self.write_snapshot(&leads) {
                    log::warn!("Failed to refresh lead snapshot cache: {e}");
                }
                Ok(leads)
            }
            Err(e) => {
                log::warn!("Remote lead fetch failed, serving cached snapshot: {e}");
                self.read_snapshot()
            }
        }
    }

    fn upsert(&mut self, lead: &Lead) -> Result<SaveOutcome, StoreError> {
        let reply: WriteReply = self
            .client
            .post(self.endpoint("leads"))
            .json(lead)
            .send()?
            .error_for_status()?
            .json()?;

        if !reply.success {
            return Err(StoreError::Backend(
                reply.error.unwrap_or_else(|| "save rejected".to_string()),
            ));
        }
        // Only report an id for records the backend had to mint one for
        let id = reply.id.filter(|_| lead.id == 0);
        Ok(SaveOutcome { id })
    }

    fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        let reply: WriteReply = self
            .client
            .delete(self.endpoint(&format!("leads/{id}")))
            .send()?
            .error_for_status()?
            .json()?;

        if !reply.success {
            return Err(StoreError::Backend(
                reply.error.unwrap_or_else(|| "delete rejected".to_string()),
            ));
        }
        Ok(())
    }

    /// The trail never leaves the machine: it lives in a JSON file next to
    /// the lead snapshot. The backend only ever sees leads.
    fn load_activity(&mut self) -> Result<Vec<Activity>, StoreError> {
        if !self.activity_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.activity_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_activity(&mut self, entries: &[Activity]) -> Result<(), StoreError> {
        if let Some(parent) = self.activity_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.activity_path, serde_json::to_string(entries)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_falls_back_to_snapshot_when_remote_is_unreachable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = dir.path().join("leads_snapshot.json");

        let mut lead = Lead::default();
        lead.id = 9;
        lead.business_name = "Cached Cafe".to_string();
        std::fs::write(&snapshot, serde_json::to_string(&vec![lead]).unwrap()).unwrap();

        // Port 9 is discard; connection refused immediately.
        let mut store = RemoteLeadStore::with_snapshot_path("http://127.0.0.1:9", snapshot);
        let leads = store.list().expect("fallback");
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].business_name, "Cached Cafe");
    }

    #[test]
    fn missing_snapshot_falls_back_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = RemoteLeadStore::with_snapshot_path(
            "http://127.0.0.1:9",
            dir.path().join("none.json"),
        );
        assert!(store.list().expect("fallback").is_empty());
    }

    #[test]
    fn activity_trail_round_trips_through_the_local_file() {
        use crate::types::ActivityKind;

        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = RemoteLeadStore::with_snapshot_path(
            "http://127.0.0.1:9",
            dir.path().join("leads_snapshot.json"),
        );
        assert!(store.load_activity().expect("empty").is_empty());

        let entries = vec![Activity {
            action: "Lead Added".into(),
            details: "\"Cached Cafe\" added to pipeline".into(),
            kind: ActivityKind::Created,
            timestamp: chrono::Utc::now(),
        }];
        store.save_activity(&entries).expect("save");

        let loaded = store.load_activity().expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].action, "Lead Added");
        assert_eq!(loaded[0].kind, ActivityKind::Created);
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let store =
            RemoteLeadStore::with_snapshot_path("http://example.test/api/", PathBuf::new());
        assert_eq!(store.endpoint("leads"), "http://example.test/api/leads");
    }
}
