//! Lead persistence: the repository trait and the SQLite-backed store.
//!
//! The database lives at `~/.leadledger/leadledger.db`. The coordinator
//! treats whatever store it is handed as a durability side-channel: the
//! in-memory collection is the source of truth for the session, and a
//! failed write degrades to "not durable yet" rather than an aborted
//! operation.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{named_params, Connection, Row};
use thiserror::Error;

use crate::types::{Activity, ActivityKind, AdvanceScheme, DiscountType, Lead, LeadStatus};

/// Errors at the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("snapshot cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("backend rejected the request: {0}")]
    Backend(String),

    #[error("home directory not found")]
    HomeDirNotFound,
}

/// Result of an upsert. `id` is set when the store assigned a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub id: Option<i64>,
}

/// Repository boundary the coordinator is injected with. Backed by SQLite,
/// a remote HTTP service, or plain memory — the core is agnostic.
///
/// The activity trail is persisted alongside the leads: loaded once on
/// open, replaced wholesale after every mutation.
pub trait LeadStore {
    fn list(&mut self) -> Result<Vec<Lead>, StoreError>;
    fn upsert(&mut self, lead: &Lead) -> Result<SaveOutcome, StoreError>;
    fn delete(&mut self, id: i64) -> Result<(), StoreError>;
    fn load_activity(&mut self) -> Result<Vec<Activity>, StoreError>;
    fn save_activity(&mut self, entries: &[Activity]) -> Result<(), StoreError>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// Vec-backed store. Used as the cache tier of the remote store and as a
/// stand-in during tests; new leads get `max(id) + 1` like the offline
/// fallback always has.
#[derive(Debug, Default)]
pub struct MemoryStore {
    leads: Vec<Lead>,
    activity: Vec<Activity>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leads(leads: Vec<Lead>) -> Self {
        MemoryStore {
            leads,
            activity: Vec::new(),
        }
    }
}

impl LeadStore for MemoryStore {
    fn list(&mut self) -> Result<Vec<Lead>, StoreError> {
        Ok(self.leads.clone())
    }

    fn upsert(&mut self, lead: &Lead) -> Result<SaveOutcome, StoreError> {
        if lead.id != 0 {
            if let Some(existing) = self.leads.iter_mut().find(|l| l.id == lead.id) {
                *existing = lead.clone();
                return Ok(SaveOutcome { id: None });
            }
            self.leads.push(lead.clone());
            return Ok(SaveOutcome { id: None });
        }
        let new_id = self.leads.iter().map(|l| l.id).max().unwrap_or(0) + 1;
        let mut stored = lead.clone();
        stored.id = new_id;
        self.leads.push(stored);
        Ok(SaveOutcome { id: Some(new_id) })
    }

    fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        self.leads.retain(|l| l.id != id);
        Ok(())
    }

    fn load_activity(&mut self) -> Result<Vec<Activity>, StoreError> {
        Ok(self.activity.clone())
    }

    fn save_activity(&mut self, entries: &[Activity]) -> Result<(), StoreError> {
        self.activity = entries.to_vec();
        Ok(())
    }
}

// =============================================================================
// SQLite store
// =============================================================================

pub struct SqliteLeadStore {
    conn: Connection,
}

impl SqliteLeadStore {
    /// Open (or create) the database at `~/.leadledger/leadledger.db` and
    /// apply the schema.
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(Self::db_path()?)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL keeps reads cheap while a write is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        // Idempotent schema
        conn.execute_batch(include_str!("schema.sql"))?;

        Ok(Self { conn })
    }

    fn db_path() -> Result<PathBuf, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeDirNotFound)?;
        Ok(home.join(".leadledger").join("leadledger.db"))
    }

    fn row_to_lead(row: &Row<'_>) -> rusqlite::Result<Lead> {
        let status: String = row.get("lead_status")?;
        let scheme: String = row.get("advance_scheme")?;
        let discount: Option<String> = row.get("discount_type")?;

        Ok(Lead {
            id: row.get("id")?,
            date: get_date(row, "date")?.unwrap_or_default(),
            business_name: row.get("business_name")?,
            client_name: row.get("client_name")?,
            country: row.get("country")?,
            platform: row.get("platform")?,
            industry: row.get("industry")?,
            contact_info: row.get("contact_info")?,
            lead_status: LeadStatus::parse(&status).unwrap_or_default(),
            contacted: row.get("contacted")?,
            replied: row.get("replied")?,
            demo_sent: row.get("demo_sent")?,
            interested: row.get("interested")?,
            next_follow_up: get_date(row, "next_follow_up")?,
            package_type: row.get("package_type")?,
            project_type: row.get("project_type")?,
            project_scope: row.get("project_scope")?,
            currency: row.get("currency")?,
            exchange_rate: row.get("exchange_rate")?,
            final_value: row.get("final_value")?,
            advance_scheme: AdvanceScheme::parse(&scheme).unwrap_or_default(),
            advance_input_value: row.get("advance_input_value")?,
            advance_computed: row.get("advance_computed")?,
            balance_amount: row.get("balance_amount")?,
            amount_in_lkr: row.get("amount_in_lkr")?,
            discount_type: discount.as_deref().and_then(DiscountType::parse),
            discount_value: row.get("discount_value")?,
            services: get_json(row, "services"),
            delivery_features: get_json(row, "delivery_features"),
            expenses: get_json(row, "expenses"),
            advance_paid: row.get("advance_paid")?,
            advance_date_received: get_date(row, "advance_date_received")?,
            advance_method: row.get("advance_method")?,
            advance_proof: row.get("advance_proof")?,
            balance_paid: row.get("balance_paid")?,
            balance_date_received: get_date(row, "balance_date_received")?,
            balance_method: row.get("balance_method")?,
            balance_proof: row.get("balance_proof")?,
            expected_delivery: get_date(row, "expected_delivery")?,
            actual_delivery: get_date(row, "actual_delivery")?,
            project_completed: row.get("project_completed")?,
            domain_name: row.get("domain_name")?,
            domain_provider: row.get("domain_provider")?,
            hosting_provider: row.get("hosting_provider")?,
            domain_renewal: get_date(row, "domain_renewal")?,
            hosting_renewal: get_date(row, "hosting_renewal")?,
            agreement_link: row.get("agreement_link")?,
            notes: row.get("notes")?,
        })
    }

    fn write_lead(&self, lead: &Lead, id: Option<i64>) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO leads (
                id, date, business_name, client_name, country, platform, industry,
                contact_info, lead_status, contacted, replied, demo_sent, interested,
                next_follow_up, package_type, project_type, project_scope, currency,
                exchange_rate, final_value, advance_scheme, advance_input_value,
                advance_computed, balance_amount, amount_in_lkr, discount_type,
                discount_value, services, delivery_features, expenses, advance_paid,
                advance_date_received, advance_method, advance_proof, balance_paid,
                balance_date_received, balance_method, balance_proof, expected_delivery,
                actual_delivery, project_completed, domain_name, domain_provider,
                hosting_provider, domain_renewal, hosting_renewal, agreement_link,
                notes, updated_at
             ) VALUES (
                :id, :date, :business_name, :client_name, :country, :platform, :industry,
                :contact_info, :lead_status, :contacted, :replied, :demo_sent, :interested,
                :next_follow_up, :package_type, :project_type, :project_scope, :currency,
                :exchange_rate, :final_value, :advance_scheme, :advance_input_value,
                :advance_computed, :balance_amount, :amount_in_lkr, :discount_type,
                :discount_value, :services, :delivery_features, :expenses, :advance_paid,
                :advance_date_received, :advance_method, :advance_proof, :balance_paid,
                :balance_date_received, :balance_method, :balance_proof, :expected_delivery,
                :actual_delivery, :project_completed, :domain_name, :domain_provider,
                :hosting_provider, :domain_renewal, :hosting_renewal, :agreement_link,
                :notes, :updated_at
             )
             ON CONFLICT(id) DO UPDATE SET
                date = excluded.date,
                business_name = excluded.business_name,
                client_name = excluded.client_name,
                country = excluded.country,
                platform = excluded.platform,
                industry = excluded.industry,
                contact_info = excluded.contact_info,
                lead_status = excluded.lead_status,
                contacted = excluded.contacted,
                replied = excluded.replied,
                demo_sent = excluded.demo_sent,
                interested = excluded.interested,
                next_follow_up = excluded.next_follow_up,
                package_type = excluded.package_type,
                project_type = excluded.project_type,
                project_scope = excluded.project_scope,
                currency = excluded.currency,
                exchange_rate = excluded.exchange_rate,
                final_value = excluded.final_value,
                advance_scheme = excluded.advance_scheme,
                advance_input_value = excluded.advance_input_value,
                advance_computed = excluded.advance_computed,
                balance_amount = excluded.balance_amount,
                amount_in_lkr = excluded.amount_in_lkr,
                discount_type = excluded.discount_type,
                discount_value = excluded.discount_value,
                services = excluded.services,
                delivery_features = excluded.delivery_features,
                expenses = excluded.expenses,
                advance_paid = excluded.advance_paid,
                advance_date_received = excluded.advance_date_received,
                advance_method = excluded.advance_method,
                advance_proof = excluded.advance_proof,
                balance_paid = excluded.balance_paid,
                balance_date_received = excluded.balance_date_received,
                balance_method = excluded.balance_method,
                balance_proof = excluded.balance_proof,
                expected_delivery = excluded.expected_delivery,
                actual_delivery = excluded.actual_delivery,
                project_completed = excluded.project_completed,
                domain_name = excluded.domain_name,
                domain_provider = excluded.domain_provider,
                hosting_provider = excluded.hosting_provider,
                domain_renewal = excluded.domain_renewal,
                hosting_renewal = excluded.hosting_renewal,
                agreement_link = excluded.agreement_link,
                notes = excluded.notes,
                updated_at = excluded.updated_at",
            named_params! {
                ":id": id,
                ":date": fmt_date(Some(lead.date)),
                ":business_name": lead.business_name,
                ":client_name": lead.client_name,
                ":country": lead.country,
                ":platform": lead.platform,
                ":industry": lead.industry,
                ":contact_info": lead.contact_info,
                ":lead_status": lead.lead_status.label(),
                ":contacted": lead.contacted,
                ":replied": lead.replied,
                ":demo_sent": lead.demo_sent,
                ":interested": lead.interested,
                ":next_follow_up": fmt_date(lead.next_follow_up),
                ":package_type": lead.package_type,
                ":project_type": lead.project_type,
                ":project_scope": lead.project_scope,
                ":currency": lead.currency,
                ":exchange_rate": lead.exchange_rate,
                ":final_value": lead.final_value,
                ":advance_scheme": lead.advance_scheme.label(),
                ":advance_input_value": lead.advance_input_value,
                ":advance_computed": lead.advance_computed,
                ":balance_amount": lead.balance_amount,
                ":amount_in_lkr": lead.amount_in_lkr,
                ":discount_type": lead.discount_type.map(|d| d.label()),
                ":discount_value": lead.discount_value,
                ":services": serde_json::to_string(&lead.services)?,
                ":delivery_features": serde_json::to_string(&lead.delivery_features)?,
                ":expenses": serde_json::to_string(&lead.expenses)?,
                ":advance_paid": lead.advance_paid,
                ":advance_date_received": fmt_date(lead.advance_date_received),
                ":advance_method": lead.advance_method,
                ":advance_proof": lead.advance_proof,
                ":balance_paid": lead.balance_paid,
                ":balance_date_received": fmt_date(lead.balance_date_received),
                ":balance_method": lead.balance_method,
                ":balance_proof": lead.balance_proof,
                ":expected_delivery": fmt_date(lead.expected_delivery),
                ":actual_delivery": fmt_date(lead.actual_delivery),
                ":project_completed": lead.project_completed,
                ":domain_name": lead.domain_name,
                ":domain_provider": lead.domain_provider,
                ":hosting_provider": lead.hosting_provider,
                ":domain_renewal": fmt_date(lead.domain_renewal),
                ":hosting_renewal": fmt_date(lead.hosting_renewal),
                ":agreement_link": lead.agreement_link,
                ":notes": lead.notes,
                ":updated_at": Utc::now().to_rfc3339(),
            },
        )?;
        Ok(())
    }
}

impl LeadStore for SqliteLeadStore {
    fn list(&mut self) -> Result<Vec<Lead>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT * FROM leads ORDER BY id")?;
        let rows = stmt.query_map([], Self::row_to_lead)?;

        let mut leads = Vec::new();
        for row in rows {
            leads.push(row?);
        }
        Ok(leads)
    }

    fn upsert(&mut self, lead: &Lead) -> Result<SaveOutcome, StoreError> {
        if lead.id != 0 {
            self.write_lead(lead, Some(lead.id))?;
            Ok(SaveOutcome { id: None })
        } else {
            // NULL id lets SQLite pick the next rowid
            self.write_lead(lead, None)?;
            Ok(SaveOutcome {
                id: Some(self.conn.last_insert_rowid()),
            })
        }
    }

    fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM leads WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
    }

    fn load_activity(&mut self) -> Result<Vec<Activity>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT action, details, kind, timestamp FROM activities ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get("kind")?;
            let timestamp: String = row.get("timestamp")?;
            Ok(Activity {
                action: row.get("action")?,
                details: row.get("details")?,
                kind: ActivityKind::parse(&kind).unwrap_or(ActivityKind::Updated),
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Replace the whole trail, newest first at position 0.
    fn save_activity(&mut self, entries: &[Activity]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM activities", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO activities (position, action, details, kind, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, entry) in entries.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    position as i64,
                    entry.action,
                    entry.details,
                    entry.kind.label(),
                    entry.timestamp.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn fmt_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Read a date column leniently: NULL, empty, or unparseable all map to None.
fn get_date(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(column)?;
    Ok(raw
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
}

/// Read a JSON array column; malformed text degrades to an empty list.
fn get_json<T: serde::de::DeserializeOwned>(row: &Row<'_>, column: &str) -> Vec<T> {
    let raw: Option<String> = row.get(column).ok().flatten();
    raw.as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing;
    use crate::types::{ExpenseCategory, ExpenseItem, ServiceItem};

    fn temp_store() -> (tempfile::TempDir, SqliteLeadStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteLeadStore::open_at(dir.path().join("leads.db")).expect("open");
        (dir, store)
    }

    fn sample_lead() -> Lead {
        let mut lead = Lead::draft(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        lead.business_name = "Cafe Aroma".into();
        lead.client_name = "Nimal Perera".into();
        lead.country = "Sri Lanka".into();
        lead.currency = "USD".into();
        lead.exchange_rate = 300.0;
        lead.final_value = 1000.0;
        lead.services.push(ServiceItem {
            name: "Landing page".into(),
            description: "5 sections".into(),
            quantity: 1,
            price: 1000.0,
        });
        lead.expenses.push(ExpenseItem {
            category: ExpenseCategory::Domain,
            name: ".com renewal".into(),
            amount: 4500.0,
            date: NaiveDate::from_ymd_opt(2024, 2, 2),
        });
        lead.domain_renewal = NaiveDate::from_ymd_opt(2025, 2, 1);
        pricing::recompute(&mut lead);
        lead
    }

    #[test]
    fn insert_assigns_an_id_and_round_trips_every_field() {
        let (_dir, mut store) = temp_store();
        let lead = sample_lead();

        let outcome = store.upsert(&lead).expect("insert");
        let id = outcome.id.expect("new id");
        assert!(id > 0);

        let listed = store.list().expect("list");
        assert_eq!(listed.len(), 1);
        let mut expected = lead;
        expected.id = id;
        assert_eq!(listed[0], expected);
    }

    #[test]
    fn upsert_with_id_updates_in_place() {
        let (_dir, mut store) = temp_store();
        let mut lead = sample_lead();
        lead.id = store.upsert(&lead).unwrap().id.unwrap();

        lead.lead_status = LeadStatus::ClosedWon;
        lead.balance_paid = true;
        let outcome = store.upsert(&lead).expect("update");
        assert_eq!(outcome.id, None);

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].lead_status, LeadStatus::ClosedWon);
        assert!(listed[0].balance_paid);
    }

    #[test]
    fn upsert_preserves_locally_generated_ids() {
        let (_dir, mut store) = temp_store();
        let mut lead = sample_lead();
        lead.id = 1_706_000_000_123;
        assert_eq!(store.upsert(&lead).unwrap().id, None);
        assert_eq!(store.list().unwrap()[0].id, 1_706_000_000_123);
    }

    #[test]
    fn delete_removes_the_row() {
        let (_dir, mut store) = temp_store();
        let id = store.upsert(&sample_lead()).unwrap().id.unwrap();
        store.delete(id).expect("delete");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn unknown_status_text_degrades_to_default() {
        let (_dir, mut store) = temp_store();
        let id = store.upsert(&sample_lead()).unwrap().id.unwrap();
        store
            .conn
            .execute(
                "UPDATE leads SET lead_status = 'Archived', services = 'not-json' WHERE id = ?1",
                rusqlite::params![id],
            )
            .unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed[0].lead_status, LeadStatus::New);
        assert!(listed[0].services.is_empty());
    }

    #[test]
    fn activity_trail_round_trips_and_replaces_wholesale() {
        let (_dir, mut store) = temp_store();
        let entries = vec![
            Activity {
                action: "Status Changed".into(),
                details: "\"Cafe Aroma\" moved from New to Contacted".into(),
                kind: ActivityKind::Status,
                timestamp: Utc::now(),
            },
            Activity {
                action: "Lead Added".into(),
                details: "\"Cafe Aroma\" added to pipeline".into(),
                kind: ActivityKind::Created,
                timestamp: Utc::now(),
            },
        ];
        store.save_activity(&entries).expect("save");

        let loaded = store.load_activity().expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].action, "Status Changed");
        assert_eq!(loaded[0].kind, ActivityKind::Status);
        assert_eq!(loaded[1].kind, ActivityKind::Created);

        // a later save replaces the trail instead of appending
        store.save_activity(&entries[..1]).expect("resave");
        assert_eq!(store.load_activity().unwrap().len(), 1);
    }

    #[test]
    fn unknown_activity_kind_degrades_instead_of_failing() {
        let (_dir, mut store) = temp_store();
        store
            .conn
            .execute(
                "INSERT INTO activities (position, action, details, kind, timestamp)
                 VALUES (0, 'Lead Added', '', 'fanfare', '2024-02-01T08:00:00+00:00')",
                [],
            )
            .unwrap();
        let loaded = store.load_activity().unwrap();
        assert_eq!(loaded[0].kind, ActivityKind::Updated);
    }

    #[test]
    fn memory_store_assigns_sequential_ids() {
        let mut store = MemoryStore::new();
        let a = store.upsert(&Lead::default()).unwrap().id.unwrap();
        let b = store.upsert(&Lead::default()).unwrap().id.unwrap();
        assert_eq!(b, a + 1);
        store.delete(a).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
