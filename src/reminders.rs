//! Derives the actionable reminder list from the lead collection.
//!
//! Reminders are never stored: every scan starts from scratch against the
//! current leads and "today" truncated to a calendar date. A reminder
//! disappears on its own once the underlying condition clears (date moved,
//! balance paid, project completed).

use chrono::{Months, NaiveDate};

use crate::types::{Lead, LeadStatus, Reminder, ReminderKind, ReminderPriority};

/// How far ahead of a renewal date the reminder window opens.
const RENEWAL_WINDOW_MONTHS: u32 = 3;

/// Scan all leads and return reminders ordered by priority (high first).
/// Ties keep the scan order, so the result is stable across runs.
pub fn scan(leads: &[Lead], today: NaiveDate) -> Vec<Reminder> {
    let mut reminders = Vec::new();

    for lead in leads {
        // Completed projects generate nothing.
        if lead.project_completed {
            continue;
        }

        if let Some(r) = follow_up_reminder(lead, today) {
            reminders.push(r);
        }
        if let Some(r) = renewal_reminder(lead, lead.domain_renewal, ReminderKind::Domain, today) {
            reminders.push(r);
        }
        if let Some(r) = renewal_reminder(lead, lead.hosting_renewal, ReminderKind::Hosting, today)
        {
            reminders.push(r);
        }
        if let Some(r) = balance_reminder(lead) {
            reminders.push(r);
        }
    }

    reminders.sort_by_key(|r| r.priority.rank());
    reminders
}

/// Follow-up due today or overdue, for leads still in play.
fn follow_up_reminder(lead: &Lead, today: NaiveDate) -> Option<Reminder> {
    if matches!(
        lead.lead_status,
        LeadStatus::ClosedWon | LeadStatus::ClosedLost
    ) {
        return None;
    }
    let due = lead.next_follow_up?;
    if due > today {
        return None;
    }

    let days_overdue = (today - due).num_days();
    let priority = if days_overdue > 7 {
        ReminderPriority::High
    } else if days_overdue > 3 {
        ReminderPriority::Medium
    } else {
        ReminderPriority::Normal
    };

    Some(Reminder {
        kind: ReminderKind::Followup,
        lead_id: lead.id,
        business_name: lead.business_name.clone(),
        date: due,
        days_overdue: Some(days_overdue),
        days_until: None,
        priority,
    })
}

/// Domain/hosting renewal falling inside `[renewal − 3 months, renewal]`.
fn renewal_reminder(
    lead: &Lead,
    renewal: Option<NaiveDate>,
    kind: ReminderKind,
    today: NaiveDate,
) -> Option<Reminder> {
    let renewal = renewal?;
    let window_opens = renewal.checked_sub_months(Months::new(RENEWAL_WINDOW_MONTHS))?;
    if today < window_opens || today > renewal {
        return None;
    }

    let days_until = (renewal - today).num_days();
    let priority = if days_until <= 14 {
        ReminderPriority::High
    } else if days_until <= 30 {
        ReminderPriority::Medium
    } else {
        ReminderPriority::Normal
    };

    Some(Reminder {
        kind,
        lead_id: lead.id,
        business_name: lead.business_name.clone(),
        date: renewal,
        days_overdue: None,
        days_until: Some(days_until),
        priority,
    })
}

/// Closed-Won deal with money still outstanding.
fn balance_reminder(lead: &Lead) -> Option<Reminder> {
    if lead.lead_status != LeadStatus::ClosedWon || lead.balance_paid {
        return None;
    }
    let outstanding = if lead.balance_amount != 0.0 {
        lead.balance_amount
    } else {
        lead.final_value - lead.advance_computed
    };
    if outstanding <= 0.0 {
        return None;
    }

    Some(Reminder {
        kind: ReminderKind::Balance,
        lead_id: lead.id,
        business_name: lead.business_name.clone(),
        date: lead.date,
        days_overdue: None,
        days_until: None,
        priority: ReminderPriority::Medium,
    })
}
