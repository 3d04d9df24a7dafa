//! The lead book: owns the in-memory collection, enforces the state
//! machine, and journals every mutation to the activity trail.
//!
//! Persistence policy is optimistic (single-user tool): every mutation is
//! applied in memory unconditionally, then handed to the injected store.
//! A store failure is logged and surfaced nowhere else — the session keeps
//! its state and the write simply never became durable.

use chrono::{Duration, Local, NaiveDate};
use rand::Rng;

use crate::activity::ActivityLog;
use crate::error::CrmError;
use crate::pricing;
use crate::reminders;
use crate::stats;
use crate::store::LeadStore;
use crate::types::{
    Activity, ActivityKind, DashboardStats, Lead, LeadStatus, PipelineSlice, Reminder,
    FOLLOW_UP_LEAD_DAYS,
};
use crate::view::{self, LeadQuery};

/// The three sales-progress flags without side effects. First contact is
/// its own transition ([`LeadBook::mark_contacted`]) because it also
/// reschedules the follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineField {
    Replied,
    DemoSent,
    Interested,
}

impl PipelineField {
    fn name(&self) -> &'static str {
        match self {
            PipelineField::Replied => "Replied",
            PipelineField::DemoSent => "Demo Sent",
            PipelineField::Interested => "Interested",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentField {
    Advance,
    Balance,
}

impl PaymentField {
    fn name(&self) -> &'static str {
        match self {
            PaymentField::Advance => "Advance",
            PaymentField::Balance => "Balance",
        }
    }
}

/// Coordinating context for the whole pipeline. Components never reach for
/// globals; everything flows through a `LeadBook` holding the collection,
/// the activity trail, and the injected store.
pub struct LeadBook {
    leads: Vec<Lead>,
    activity: ActivityLog,
    store: Box<dyn LeadStore>,
}

impl LeadBook {
    /// Hydrate from the store. The store's own read-fallback (snapshot
    /// cache) has already run by the time this returns. A failed activity
    /// read degrades to an empty trail; the leads are the data that matter.
    pub fn open(mut store: Box<dyn LeadStore>) -> Result<Self, CrmError> {
        let leads = store.list()?;
        let activity = match store.load_activity() {
            Ok(entries) => ActivityLog::from_entries(entries),
            Err(e) => {
                log::warn!("Activity trail could not be loaded: {e}");
                ActivityLog::new()
            }
        };
        Ok(LeadBook {
            leads,
            activity,
            store,
        })
    }

    // =========================================================================
    // Read surface
    // =========================================================================

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn get(&self, id: i64) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }

    pub fn activity(&self) -> &[Activity] {
        self.activity.entries()
    }

    /// Dashboard statistics, recomputed from scratch.
    pub fn stats(&self) -> DashboardStats {
        stats::compute(&self.leads)
    }

    pub fn pipeline_breakdown(&self) -> Vec<PipelineSlice> {
        stats::pipeline_breakdown(&self.leads)
    }

    /// Current reminder list for the given date.
    pub fn reminders(&self, today: NaiveDate) -> Vec<Reminder> {
        reminders::scan(&self.leads, today)
    }

    /// Filtered, deterministically ordered view of the collection.
    pub fn filtered(&self, query: &LeadQuery) -> Vec<&Lead> {
        view::filter_leads(&self.leads, query)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a lead. Pricing is recomputed before the save; the store may
    /// assign the id, otherwise one is generated locally. Returns the id.
    pub fn add_lead(&mut self, mut lead: Lead) -> i64 {
        pricing::recompute(&mut lead);

        if lead.id == 0 {
            lead.id = match self.store.upsert(&lead) {
                Ok(outcome) => outcome.id.unwrap_or_else(generate_local_id),
                Err(e) => {
                    log::warn!("Lead save did not reach the store: {e}");
                    generate_local_id()
                }
            };
        } else {
            self.persist(&lead);
        }

        self.journal(
            "Lead Added",
            format!("\"{}\" added to pipeline", lead.business_name),
            ActivityKind::Created,
        );
        let id = lead.id;
        self.leads.push(lead);
        id
    }

    /// Full edit: replace the lead wholesale, recomputing pricing first.
    pub fn save_lead(&mut self, id: i64, mut updated: Lead) -> Result<(), CrmError> {
        let idx = self.index_of(id)?;
        updated.id = id;
        pricing::recompute(&mut updated);
        self.leads[idx] = updated;

        let snapshot = self.leads[idx].clone();
        self.persist(&snapshot);
        self.journal(
            "Lead Updated",
            format!("\"{}\" updated", snapshot.business_name),
            ActivityKind::Updated,
        );
        Ok(())
    }

    /// Partial edit via closure. Deliberately does NOT recompute pricing —
    /// callers touching commercial terms go through [`Self::save_lead`].
    pub fn edit_lead(
        &mut self,
        id: i64,
        mutate: impl FnOnce(&mut Lead),
    ) -> Result<(), CrmError> {
        let idx = self.index_of(id)?;
        mutate(&mut self.leads[idx]);
        self.leads[idx].id = id;

        let snapshot = self.leads[idx].clone();
        self.persist(&snapshot);
        self.journal(
            "Lead Updated",
            format!("\"{}\" updated", snapshot.business_name),
            ActivityKind::Updated,
        );
        Ok(())
    }

    pub fn delete_lead(&mut self, id: i64) -> Result<(), CrmError> {
        let idx = self.index_of(id)?;
        let removed = self.leads.remove(idx);

        if let Err(e) = self.store.delete(id) {
            log::warn!("Lead delete did not reach the store: {e}");
        }
        self.journal(
            "Lead Deleted",
            format!("\"{}\" removed from system", removed.business_name),
            ActivityKind::Deleted,
        );
        Ok(())
    }

    /// Move a lead between statuses. Every transition between the eight
    /// statuses is legal; a same-status call is a silent no-op.
    pub fn set_status(&mut self, id: i64, status: LeadStatus) -> Result<(), CrmError> {
        let idx = self.index_of(id)?;
        let old = self.leads[idx].lead_status;
        if old == status {
            return Ok(());
        }
        self.leads[idx].lead_status = status;

        let snapshot = self.leads[idx].clone();
        self.persist(&snapshot);
        self.journal(
            "Status Changed",
            format!(
                "\"{}\" moved from {} to {}",
                snapshot.business_name, old, status
            ),
            ActivityKind::Status,
        );
        Ok(())
    }

    /// Flip a payment flag. Returns the new value.
    pub fn toggle_payment(&mut self, id: i64, field: PaymentField) -> Result<bool, CrmError> {
        let idx = self.index_of(id)?;
        let new_value = {
            let lead = &mut self.leads[idx];
            match field {
                PaymentField::Advance => {
                    lead.advance_paid = !lead.advance_paid;
                    lead.advance_paid
                }
                PaymentField::Balance => {
                    lead.balance_paid = !lead.balance_paid;
                    lead.balance_paid
                }
            }
        };

        let snapshot = self.leads[idx].clone();
        self.persist(&snapshot);
        let direction = if new_value { "Paid" } else { "Unpaid" };
        self.journal(
            "Payment Update",
            format!(
                "{} marked as {} for \"{}\"",
                field.name(),
                direction,
                snapshot.business_name
            ),
            ActivityKind::Payment,
        );
        Ok(new_value)
    }

    /// Flip project completion. The one governed transition: completing
    /// requires the balance to be settled first. Un-completing is always
    /// allowed. Returns the new value; on rejection nothing is mutated.
    pub fn toggle_completion(&mut self, id: i64) -> Result<bool, CrmError> {
        let idx = self.index_of(id)?;
        {
            let lead = &self.leads[idx];
            if !lead.project_completed && !lead.balance_paid {
                return Err(CrmError::UnpaidBalance);
            }
        }
        self.leads[idx].project_completed = !self.leads[idx].project_completed;
        let new_value = self.leads[idx].project_completed;

        let snapshot = self.leads[idx].clone();
        self.persist(&snapshot);
        if new_value {
            self.journal(
                "Project Completed",
                format!("\"{}\" marked as completed", snapshot.business_name),
                ActivityKind::Completion,
            );
        } else {
            self.journal(
                "Project Reopened",
                format!("\"{}\" marked as not completed", snapshot.business_name),
                ActivityKind::Completion,
            );
        }
        Ok(new_value)
    }

    /// Record first contact. Setting it true also reschedules the
    /// follow-up to `today + 3 days`, overwriting any existing date;
    /// clearing it leaves the follow-up untouched.
    pub fn mark_contacted(
        &mut self,
        id: i64,
        value: bool,
        today: NaiveDate,
    ) -> Result<(), CrmError> {
        let idx = self.index_of(id)?;
        {
            let lead = &mut self.leads[idx];
            lead.contacted = value;
            if value {
                lead.next_follow_up = Some(today + Duration::days(FOLLOW_UP_LEAD_DAYS));
            }
        }

        let snapshot = self.leads[idx].clone();
        self.persist(&snapshot);
        self.journal(
            "Pipeline Update",
            format!(
                "Contacted set to {} for \"{}\"",
                value, snapshot.business_name
            ),
            ActivityKind::Pipeline,
        );
        Ok(())
    }

    /// Set one of the side-effect-free pipeline flags.
    pub fn set_pipeline_field(
        &mut self,
        id: i64,
        field: PipelineField,
        value: bool,
    ) -> Result<(), CrmError> {
        let idx = self.index_of(id)?;
        {
            let lead = &mut self.leads[idx];
            match field {
                PipelineField::Replied => lead.replied = value,
                PipelineField::DemoSent => lead.demo_sent = value,
                PipelineField::Interested => lead.interested = value,
            }
        }

        let snapshot = self.leads[idx].clone();
        self.persist(&snapshot);
        self.journal(
            "Pipeline Update",
            format!(
                "{} set to {} for \"{}\"",
                field.name(),
                value,
                snapshot.business_name
            ),
            ActivityKind::Pipeline,
        );
        Ok(())
    }

    /// Re-hydrate the collection from the store, discarding unsaved state.
    pub fn refresh(&mut self) -> Result<(), CrmError> {
        self.leads = self.store.list()?;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn index_of(&self, id: i64) -> Result<usize, CrmError> {
        self.leads
            .iter()
            .position(|l| l.id == id)
            .ok_or(CrmError::LeadNotFound(id))
    }

    fn persist(&mut self, lead: &Lead) {
        if let Err(e) = self.store.upsert(lead) {
            log::warn!("Lead save did not reach the store: {e}");
        }
    }

    /// Append to the trail and push the trimmed list to the store. Same
    /// optimistic policy as lead writes: a failure only costs durability.
    fn journal(&mut self, action: &str, details: String, kind: ActivityKind) {
        self.activity.record(action, details, kind);
        if let Err(e) = self.store.save_activity(self.activity.entries()) {
            log::warn!("Activity trail save did not reach the store: {e}");
        }
    }
}

/// Fallback id when the store cannot assign one: epoch millis plus a small
/// random jitter, the same format offline-minted leads have always used.
fn generate_local_id() -> i64 {
    let millis = Local::now().timestamp_millis();
    millis + rand::thread_rng().gen_range(0..1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SaveOutcome, StoreError};
    use crate::types::{AdvanceScheme, ReminderKind};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn book() -> LeadBook {
        LeadBook::open(Box::new(MemoryStore::new())).unwrap()
    }

    fn named_lead(name: &str) -> Lead {
        let mut lead = Lead::draft(day(2024, 5, 1));
        lead.business_name = name.to_string();
        lead
    }

    /// Store double that fails every operation, for the optimistic policy.
    struct BrokenStore;

    impl LeadStore for BrokenStore {
        fn list(&mut self) -> Result<Vec<Lead>, StoreError> {
            Ok(Vec::new())
        }
        fn upsert(&mut self, _lead: &Lead) -> Result<SaveOutcome, StoreError> {
            Err(StoreError::Backend("offline".to_string()))
        }
        fn delete(&mut self, _id: i64) -> Result<(), StoreError> {
            Err(StoreError::Backend("offline".to_string()))
        }
        fn load_activity(&mut self) -> Result<Vec<Activity>, StoreError> {
            Err(StoreError::Backend("offline".to_string()))
        }
        fn save_activity(&mut self, _entries: &[Activity]) -> Result<(), StoreError> {
            Err(StoreError::Backend("offline".to_string()))
        }
    }

    #[test]
    fn add_lead_recomputes_pricing_and_assigns_store_id() {
        let mut book = book();
        let mut lead = named_lead("Cafe Aroma");
        lead.final_value = 1000.0;
        lead.currency = "USD".to_string();
        lead.exchange_rate = 300.0;
        lead.advance_scheme = AdvanceScheme::Half;

        let id = book.add_lead(lead);
        assert!(id > 0);
        let stored = book.get(id).unwrap();
        assert_eq!(stored.advance_computed, 500.0);
        assert_eq!(stored.balance_amount, 500.0);
        assert_eq!(stored.amount_in_lkr, 300_000.0);
        assert_eq!(book.activity()[0].action, "Lead Added");
    }

    #[test]
    fn add_lead_survives_a_dead_store_with_a_local_id() {
        let mut book = LeadBook::open(Box::new(BrokenStore)).unwrap();
        let id = book.add_lead(named_lead("Offline Biz"));
        // epoch-millis ids are far beyond any store-assigned sequence
        assert!(id > 1_000_000_000_000);
        assert_eq!(book.leads().len(), 1);
    }

    #[test]
    fn mutations_apply_in_memory_even_when_the_store_is_down() {
        let mut book = LeadBook::open(Box::new(BrokenStore)).unwrap();
        let id = book.add_lead(named_lead("Offline Biz"));
        book.set_status(id, LeadStatus::Negotiating).unwrap();
        assert_eq!(book.get(id).unwrap().lead_status, LeadStatus::Negotiating);
    }

    #[test]
    fn completion_gate_requires_settled_balance() {
        let mut book = book();
        let id = book.add_lead(named_lead("Gated"));

        let err = book.toggle_completion(id).unwrap_err();
        assert!(matches!(err, CrmError::UnpaidBalance));
        assert!(!book.get(id).unwrap().project_completed);

        book.toggle_payment(id, PaymentField::Balance).unwrap();
        assert_eq!(book.toggle_completion(id).unwrap(), true);
        assert!(book.get(id).unwrap().project_completed);

        // un-completing is always allowed, even after un-paying
        book.toggle_payment(id, PaymentField::Balance).unwrap();
        assert_eq!(book.toggle_completion(id).unwrap(), false);
    }

    #[test]
    fn mark_contacted_reschedules_follow_up_only_when_set() {
        let mut book = book();
        let id = book.add_lead(named_lead("Followed"));
        let today = day(2026, 2, 10);

        book.mark_contacted(id, true, today).unwrap();
        let lead = book.get(id).unwrap();
        assert!(lead.contacted);
        assert_eq!(lead.next_follow_up, Some(day(2026, 2, 13)));

        book.mark_contacted(id, false, day(2026, 3, 1)).unwrap();
        let lead = book.get(id).unwrap();
        assert!(!lead.contacted);
        // clearing leaves the date alone
        assert_eq!(lead.next_follow_up, Some(day(2026, 2, 13)));
    }

    #[test]
    fn set_status_logs_the_transition_and_ignores_no_ops() {
        let mut book = book();
        let id = book.add_lead(named_lead("Mover"));
        let entries_before = book.activity().len();

        book.set_status(id, LeadStatus::New).unwrap();
        assert_eq!(book.activity().len(), entries_before);

        book.set_status(id, LeadStatus::DemoSent).unwrap();
        let top = &book.activity()[0];
        assert_eq!(top.action, "Status Changed");
        assert!(top.details.contains("from New to Demo Sent"));
    }

    #[test]
    fn toggle_payment_flips_and_reports_direction() {
        let mut book = book();
        let id = book.add_lead(named_lead("Payer"));

        assert!(book.toggle_payment(id, PaymentField::Advance).unwrap());
        assert!(book.activity()[0].details.contains("Advance marked as Paid"));
        assert!(!book.toggle_payment(id, PaymentField::Advance).unwrap());
        assert!(book.activity()[0].details.contains("Advance marked as Unpaid"));
    }

    #[test]
    fn edit_lead_does_not_recompute_pricing() {
        let mut book = book();
        let mut lead = named_lead("Partial");
        lead.final_value = 1000.0;
        let id = book.add_lead(lead);
        assert_eq!(book.get(id).unwrap().advance_computed, 500.0);

        book.edit_lead(id, |l| l.final_value = 2000.0).unwrap();
        let lead = book.get(id).unwrap();
        assert_eq!(lead.final_value, 2000.0);
        // stale until the next full save, by design
        assert_eq!(lead.advance_computed, 500.0);

        book.save_lead(id, book.get(id).unwrap().clone()).unwrap();
        assert_eq!(book.get(id).unwrap().advance_computed, 1000.0);
    }

    #[test]
    fn delete_removes_and_unknown_ids_are_rejected() {
        let mut book = book();
        let id = book.add_lead(named_lead("Doomed"));
        book.delete_lead(id).unwrap();
        assert!(book.leads().is_empty());
        assert!(matches!(
            book.delete_lead(id),
            Err(CrmError::LeadNotFound(_))
        ));
        assert!(matches!(
            book.set_status(999, LeadStatus::New),
            Err(CrmError::LeadNotFound(999))
        ));
    }

    #[test]
    fn derived_views_flow_through_the_book() {
        let mut book = book();
        let mut won = named_lead("Winner");
        won.lead_status = LeadStatus::ClosedWon;
        won.final_value = 1000.0;
        won.next_follow_up = None;
        let id = book.add_lead(won);

        let stats = book.stats();
        assert_eq!(stats.closed_won_count, 1);
        assert_eq!(stats.total_revenue, 1000.0);

        let reminders = book.reminders(day(2024, 6, 1));
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].kind, ReminderKind::Balance);
        assert_eq!(reminders[0].lead_id, id);

        let breakdown = book.pipeline_breakdown();
        assert_eq!(breakdown.iter().map(|s| s.count).sum::<usize>(), 1);
    }

    #[test]
    fn activity_trail_survives_a_reopen() {
        use crate::store::SqliteLeadStore;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("leads.db");

        let store = SqliteLeadStore::open_at(path.clone()).unwrap();
        let mut book = LeadBook::open(Box::new(store)).unwrap();
        let id = book.add_lead(named_lead("Durable Biz"));
        book.set_status(id, LeadStatus::Contacted).unwrap();
        drop(book);

        let store = SqliteLeadStore::open_at(path).unwrap();
        let reopened = LeadBook::open(Box::new(store)).unwrap();
        assert_eq!(reopened.activity().len(), 2);
        assert_eq!(reopened.activity()[0].action, "Status Changed");
        assert_eq!(reopened.activity()[1].action, "Lead Added");
    }

    #[test]
    fn journaling_keeps_going_when_the_trail_cannot_be_saved() {
        let mut book = LeadBook::open(Box::new(BrokenStore)).unwrap();
        let id = book.add_lead(named_lead("Offline Biz"));
        book.set_status(id, LeadStatus::Contacted).unwrap();
        assert_eq!(book.activity().len(), 2);
        assert_eq!(book.activity()[0].action, "Status Changed");
    }

    #[test]
    fn mutations_survive_a_refresh_from_a_live_store() {
        let mut book = book();
        let id = book.add_lead(named_lead("Durable"));
        book.set_status(id, LeadStatus::Negotiating).unwrap();
        book.refresh().unwrap();
        assert_eq!(book.get(id).unwrap().lead_status, LeadStatus::Negotiating);
    }
}
