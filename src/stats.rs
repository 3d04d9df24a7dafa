//! Portfolio-wide financial aggregation.
//!
//! Pure reduction over the lead collection; recomputed on every change,
//! never cached, never performs I/O.

use crate::pricing;
use crate::types::{DashboardStats, Lead, LeadStatus, PipelineSlice};

/// Statuses shown on the pipeline histogram, in display order. `Replied`
/// and `Follow-up Later` are deliberately excluded from this chart.
pub const PIPELINE_STATUSES: [LeadStatus; 6] = [
    LeadStatus::New,
    LeadStatus::Contacted,
    LeadStatus::DemoSent,
    LeadStatus::Negotiating,
    LeadStatus::ClosedWon,
    LeadStatus::ClosedLost,
];

/// Roll the whole collection up into dashboard statistics.
///
/// Revenue counts Closed-Won leads only; expenses count every lead
/// regardless of status. Pending balance covers Closed-Won leads with an
/// unpaid balance — including ones already marked complete, since
/// completion does not imply payment.
pub fn compute(leads: &[Lead]) -> DashboardStats {
    let closed_won_count = count_status(leads, LeadStatus::ClosedWon);
    let closed_lost_count = count_status(leads, LeadStatus::ClosedLost);

    let total_revenue: f64 = leads
        .iter()
        .filter(|l| l.lead_status == LeadStatus::ClosedWon)
        .map(|l| {
            if l.amount_in_lkr != 0.0 {
                l.amount_in_lkr
            } else {
                l.final_value
            }
        })
        .sum();

    let total_expenses: f64 = leads
        .iter()
        .flat_map(|l| l.expenses.iter())
        .map(|e| e.amount)
        .sum();

    let pending_balance: f64 = leads
        .iter()
        .filter(|l| l.lead_status == LeadStatus::ClosedWon && !l.balance_paid)
        .map(|l| pricing::to_base_currency(l, l.final_value - l.advance_computed))
        .sum();

    let decided = closed_won_count + closed_lost_count;
    let conversion_rate = if decided == 0 {
        0
    } else {
        (closed_won_count as f64 / decided as f64 * 100.0).round() as u32
    };

    DashboardStats {
        total_leads: leads
            .iter()
            .filter(|l| l.lead_status != LeadStatus::ClosedLost)
            .count(),
        contacted_count: leads.iter().filter(|l| l.contacted).count(),
        interested_count: leads.iter().filter(|l| l.interested).count(),
        closed_won_count,
        closed_lost_count,
        completed_projects: leads.iter().filter(|l| l.project_completed).count(),
        total_revenue,
        total_expenses,
        net_profit: total_revenue - total_expenses,
        pending_balance,
        conversion_rate,
    }
}

/// Fixed-order histogram of leads per status for the pipeline chart.
pub fn pipeline_breakdown(leads: &[Lead]) -> Vec<PipelineSlice> {
    PIPELINE_STATUSES
        .iter()
        .map(|&status| PipelineSlice {
            status,
            count: count_status(leads, status),
        })
        .collect()
}

fn count_status(leads: &[Lead], status: LeadStatus) -> usize {
    leads.iter().filter(|l| l.lead_status == status).count()
}
