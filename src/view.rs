//! Deterministic filtering and ordering of the lead collection for display.

use crate::types::{Lead, LeadStatus};

/// Display query: optional exact status filter plus an optional
/// case-insensitive substring search over business and client names.
#[derive(Debug, Clone, Default)]
pub struct LeadQuery {
    pub status: Option<LeadStatus>,
    pub search: Option<String>,
}

impl LeadQuery {
    pub fn with_status(status: LeadStatus) -> Self {
        LeadQuery {
            status: Some(status),
            search: None,
        }
    }

    pub fn with_search(text: impl Into<String>) -> Self {
        LeadQuery {
            status: None,
            search: Some(text.into()),
        }
    }

    fn matches(&self, lead: &Lead) -> bool {
        if let Some(status) = self.status {
            if lead.lead_status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                lead.business_name.to_lowercase().contains(&needle)
                    || lead.client_name.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Filter and order leads for display.
///
/// Three-tier stable sort: Closed-Lost leads sink to the bottom, completed
/// projects sink below incomplete ones, and within each bucket newer leads
/// come first. Ties keep insertion order, so actionable work is always on
/// top and the ordering never jumps around between renders.
pub fn filter_leads<'a>(leads: &'a [Lead], query: &LeadQuery) -> Vec<&'a Lead> {
    let mut filtered: Vec<&Lead> = leads.iter().filter(|l| query.matches(l)).collect();

    filtered.sort_by(|a, b| {
        let lost_a = a.lead_status == LeadStatus::ClosedLost;
        let lost_b = b.lead_status == LeadStatus::ClosedLost;
        lost_a
            .cmp(&lost_b)
            .then(a.project_completed.cmp(&b.project_completed))
            .then(b.date.cmp(&a.date))
    });

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lead(id: i64, name: &str, status: LeadStatus, date: (i32, u32, u32)) -> Lead {
        let mut l = Lead::draft(NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap());
        l.id = id;
        l.business_name = name.to_string();
        l.lead_status = status;
        l
    }

    #[test]
    fn lost_leads_sink_and_newer_leads_rise() {
        let leads = vec![
            lead(1, "A", LeadStatus::ClosedLost, (2024, 3, 1)),
            lead(2, "B", LeadStatus::New, (2024, 1, 1)),
            lead(3, "C", LeadStatus::New, (2024, 6, 1)),
        ];
        let ordered = filter_leads(&leads, &LeadQuery::default());
        let ids: Vec<_> = ordered.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn completed_projects_sort_below_incomplete_ones() {
        let mut done = lead(1, "Done", LeadStatus::ClosedWon, (2024, 6, 1));
        done.project_completed = true;
        let active = lead(2, "Active", LeadStatus::ClosedWon, (2024, 1, 1));
        let lost = lead(3, "Lost", LeadStatus::ClosedLost, (2024, 12, 1));

        let leads = vec![done, active, lost];
        let ids: Vec<_> = filter_leads(&leads, &LeadQuery::default())
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn equal_dates_keep_insertion_order() {
        let leads = vec![
            lead(1, "First", LeadStatus::New, (2024, 5, 5)),
            lead(2, "Second", LeadStatus::New, (2024, 5, 5)),
            lead(3, "Third", LeadStatus::New, (2024, 5, 5)),
        ];
        let ids: Vec<_> = filter_leads(&leads, &LeadQuery::default())
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn status_filter_is_exact() {
        let leads = vec![
            lead(1, "A", LeadStatus::New, (2024, 1, 1)),
            lead(2, "B", LeadStatus::Negotiating, (2024, 1, 2)),
        ];
        let ids: Vec<_> = filter_leads(&leads, &LeadQuery::with_status(LeadStatus::Negotiating))
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn search_is_case_insensitive_over_both_names() {
        let mut a = lead(1, "Cafe Aroma", LeadStatus::New, (2024, 1, 1));
        a.client_name = "Nimal Perera".to_string();
        let b = lead(2, "Harbor Dental", LeadStatus::New, (2024, 1, 2));

        let leads = vec![a, b];
        let by_business: Vec<_> = filter_leads(&leads, &LeadQuery::with_search("AROMA"))
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(by_business, vec![1]);

        let by_client: Vec<_> = filter_leads(&leads, &LeadQuery::with_search("perera"))
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(by_client, vec![1]);

        let blank: Vec<_> = filter_leads(&leads, &LeadQuery::with_search("  "))
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(blank.len(), 2);
    }
}
