//! Core record types for the lead pipeline.
//!
//! Wire format matches the spreadsheet-era exports: camelCase keys,
//! dates as ISO `YYYY-MM-DD` strings, booleans as true/false. Numeric and
//! boolean fields deserialize leniently — a remote backend that hands back
//! `"1"` or `null` coerces to a usable value instead of failing the whole
//! hydrate (single-user tool, stale data beats a crash).

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Fixed reporting currency. All aggregate statistics are expressed in it.
pub const BASE_CURRENCY: &str = "LKR";

/// Days between first contact and the auto-scheduled follow-up.
pub const FOLLOW_UP_LEAD_DAYS: i64 = 3;

/// The eight pipeline statuses. No other value is valid anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    Contacted,
    Replied,
    #[serde(rename = "Demo Sent")]
    DemoSent,
    Negotiating,
    #[serde(rename = "Closed-Won")]
    ClosedWon,
    #[serde(rename = "Closed-Lost")]
    ClosedLost,
    #[serde(rename = "Follow-up Later")]
    FollowUpLater,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 8] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Replied,
        LeadStatus::DemoSent,
        LeadStatus::Negotiating,
        LeadStatus::ClosedWon,
        LeadStatus::ClosedLost,
        LeadStatus::FollowUpLater,
    ];

    /// Human-readable label, identical to the wire value.
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Replied => "Replied",
            LeadStatus::DemoSent => "Demo Sent",
            LeadStatus::Negotiating => "Negotiating",
            LeadStatus::ClosedWon => "Closed-Won",
            LeadStatus::ClosedLost => "Closed-Lost",
            LeadStatus::FollowUpLater => "Follow-up Later",
        }
    }

    pub fn parse(value: &str) -> Option<LeadStatus> {
        LeadStatus::ALL.iter().copied().find(|s| s.label() == value)
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::New
    }
}

/// How a lead's total splits into advance and balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceScheme {
    #[serde(rename = "50")]
    Half,
    #[serde(rename = "25")]
    Quarter,
    #[serde(rename = "30")]
    Thirty,
    #[serde(rename = "custom")]
    CustomPercent,
    #[serde(rename = "fixed")]
    FixedAmount,
}

impl AdvanceScheme {
    pub const ALL: [AdvanceScheme; 5] = [
        AdvanceScheme::Half,
        AdvanceScheme::Quarter,
        AdvanceScheme::Thirty,
        AdvanceScheme::CustomPercent,
        AdvanceScheme::FixedAmount,
    ];

    /// Wire value, identical to the serde rename.
    pub fn label(&self) -> &'static str {
        match self {
            AdvanceScheme::Half => "50",
            AdvanceScheme::Quarter => "25",
            AdvanceScheme::Thirty => "30",
            AdvanceScheme::CustomPercent => "custom",
            AdvanceScheme::FixedAmount => "fixed",
        }
    }

    pub fn parse(value: &str) -> Option<AdvanceScheme> {
        AdvanceScheme::ALL.iter().copied().find(|s| s.label() == value)
    }
}

impl Default for AdvanceScheme {
    fn default() -> Self {
        AdvanceScheme::Half
    }
}

/// Presentation-time discount shape. Never folded into persisted pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percent,
    Fixed,
}

impl DiscountType {
    pub fn label(&self) -> &'static str {
        match self {
            DiscountType::Percent => "percent",
            DiscountType::Fixed => "fixed",
        }
    }

    pub fn parse(value: &str) -> Option<DiscountType> {
        match value {
            "percent" => Some(DiscountType::Percent),
            "fixed" => Some(DiscountType::Fixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Domain,
    Hosting,
    Software,
    Subcontract,
    Marketing,
    Other,
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        ExpenseCategory::Other
    }
}

/// One quoted line item, priced in the lead's own currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "de::lenient_u32")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFeature {
    #[serde(default)]
    pub feature: String,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub included: bool,
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub price: f64,
}

/// A cost attributed to a lead, always in the base currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItem {
    #[serde(default)]
    pub category: ExpenseCategory,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub amount: f64,
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub date: Option<NaiveDate>,
}

/// The central entity: one prospective or won project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "today")]
    pub date: NaiveDate,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub contact_info: String,

    // Sales pipeline
    #[serde(default)]
    pub lead_status: LeadStatus,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub contacted: bool,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub replied: bool,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub demo_sent: bool,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub interested: bool,
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub next_follow_up: Option<NaiveDate>,

    // Project details
    #[serde(default)]
    pub package_type: String,
    #[serde(default)]
    pub project_type: String,
    #[serde(default)]
    pub project_scope: String,

    // Commercial terms. `advance_input_value` is the raw scheme parameter
    // (custom percent or fixed amount); `advance_computed`, `balance_amount`
    // and `amount_in_lkr` are written only by the pricing recompute.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "one", deserialize_with = "de::lenient_f64_one")]
    pub exchange_rate: f64,
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub final_value: f64,
    #[serde(default)]
    pub advance_scheme: AdvanceScheme,
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub advance_input_value: f64,
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub advance_computed: f64,
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub balance_amount: f64,
    #[serde(rename = "amountInLKR", default, deserialize_with = "de::lenient_f64")]
    pub amount_in_lkr: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub discount_value: f64,

    // Line items
    #[serde(default)]
    pub services: Vec<ServiceItem>,
    #[serde(default)]
    pub delivery_features: Vec<DeliveryFeature>,
    #[serde(default)]
    pub expenses: Vec<ExpenseItem>,

    // Payments
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub advance_paid: bool,
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub advance_date_received: Option<NaiveDate>,
    #[serde(default)]
    pub advance_method: String,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub advance_proof: bool,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub balance_paid: bool,
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub balance_date_received: Option<NaiveDate>,
    #[serde(default)]
    pub balance_method: String,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub balance_proof: bool,

    // Delivery
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub expected_delivery: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub actual_delivery: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub project_completed: bool,

    // Admin
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub domain_provider: String,
    #[serde(default)]
    pub hosting_provider: String,
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub domain_renewal: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub hosting_renewal: Option<NaiveDate>,
    #[serde(default)]
    pub agreement_link: String,
    #[serde(default)]
    pub notes: String,
}

impl Lead {
    /// Blank lead with the creation-flow defaults: status New, base currency,
    /// 50% advance scheme, follow-up scheduled three days out.
    pub fn draft(today: NaiveDate) -> Lead {
        Lead {
            id: 0,
            date: today,
            business_name: String::new(),
            client_name: String::new(),
            country: "Sri Lanka".to_string(),
            platform: String::new(),
            industry: String::new(),
            contact_info: String::new(),
            lead_status: LeadStatus::New,
            contacted: false,
            replied: false,
            demo_sent: false,
            interested: false,
            next_follow_up: Some(today + Duration::days(FOLLOW_UP_LEAD_DAYS)),
            package_type: String::new(),
            project_type: String::new(),
            project_scope: String::new(),
            currency: BASE_CURRENCY.to_string(),
            exchange_rate: 1.0,
            final_value: 0.0,
            advance_scheme: AdvanceScheme::Half,
            advance_input_value: 0.0,
            advance_computed: 0.0,
            balance_amount: 0.0,
            amount_in_lkr: 0.0,
            discount_type: None,
            discount_value: 0.0,
            services: Vec::new(),
            delivery_features: Vec::new(),
            expenses: Vec::new(),
            advance_paid: false,
            advance_date_received: None,
            advance_method: String::new(),
            advance_proof: false,
            balance_paid: false,
            balance_date_received: None,
            balance_method: String::new(),
            balance_proof: false,
            expected_delivery: None,
            actual_delivery: None,
            project_completed: false,
            domain_name: String::new(),
            domain_provider: String::new(),
            hosting_provider: String::new(),
            domain_renewal: None,
            hosting_renewal: None,
            agreement_link: String::new(),
            notes: String::new(),
        }
    }

    /// Whether the lead bills in the base reporting currency.
    pub fn is_base_currency(&self) -> bool {
        self.currency == BASE_CURRENCY
    }
}

impl Default for Lead {
    fn default() -> Self {
        Lead::draft(today())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn one() -> f64 {
    1.0
}

fn default_currency() -> String {
    BASE_CURRENCY.to_string()
}

// =============================================================================
// Derived, non-persisted values
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Followup,
    Domain,
    Hosting,
    Balance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderPriority {
    High,
    Medium,
    Normal,
}

impl ReminderPriority {
    /// Sort rank: high before medium before normal.
    pub fn rank(&self) -> u8 {
        match self {
            ReminderPriority::High => 0,
            ReminderPriority::Medium => 1,
            ReminderPriority::Normal => 2,
        }
    }
}

/// A derived notification, recomputed fresh from lead state and the clock.
/// Never persisted; dismissal is implicit when the underlying condition clears.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub lead_id: i64,
    pub business_name: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_overdue: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until: Option<i64>,
    pub priority: ReminderPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Created,
    Updated,
    Deleted,
    Status,
    Payment,
    Completion,
    Pipeline,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 7] = [
        ActivityKind::Created,
        ActivityKind::Updated,
        ActivityKind::Deleted,
        ActivityKind::Status,
        ActivityKind::Payment,
        ActivityKind::Completion,
        ActivityKind::Pipeline,
    ];

    /// Wire value, identical to the serde rename.
    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::Created => "created",
            ActivityKind::Updated => "updated",
            ActivityKind::Deleted => "deleted",
            ActivityKind::Status => "status",
            ActivityKind::Payment => "payment",
            ActivityKind::Completion => "completion",
            ActivityKind::Pipeline => "pipeline",
        }
    }

    pub fn parse(value: &str) -> Option<ActivityKind> {
        ActivityKind::ALL.iter().copied().find(|k| k.label() == value)
    }
}

/// One audit-trail entry. Display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub action: String,
    pub details: String,
    pub kind: ActivityKind,
    pub timestamp: DateTime<Utc>,
}

/// Portfolio-wide statistics, all money in the base currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_leads: usize,
    pub contacted_count: usize,
    pub interested_count: usize,
    pub closed_won_count: usize,
    pub closed_lost_count: usize,
    pub completed_projects: usize,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub pending_balance: f64,
    /// Percentage of decided leads that closed won, rounded. 0 when undecided.
    pub conversion_rate: u32,
}

/// One bar of the fixed-order pipeline histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSlice {
    pub status: LeadStatus,
    pub count: usize,
}

// =============================================================================
// Lenient deserializers
// =============================================================================

pub(crate) mod de {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Num(f64),
        Text(String),
        Flag(bool),
        Nothing(()),
    }

    /// Accept a number, a numeric string, a bool, or null. Anything
    /// unusable coerces to 0 rather than failing the record.
    pub fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let value = match Option::<Loose>::deserialize(d)? {
            Some(Loose::Num(n)) if n.is_finite() => n,
            Some(Loose::Text(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
            Some(Loose::Flag(b)) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };
        Ok(value)
    }

    /// Like `lenient_f64` but unusable input falls back to 1 — used for
    /// exchange rates, where 0 would zero out every conversion.
    pub fn lenient_f64_one<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let value = match Option::<Loose>::deserialize(d)? {
            Some(Loose::Num(n)) if n.is_finite() && n != 0.0 => n,
            Some(Loose::Text(s)) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() && n != 0.0 => n,
                _ => 1.0,
            },
            _ => 1.0,
        };
        Ok(value)
    }

    pub fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let n = lenient_f64(d)?;
        Ok(if n.is_sign_negative() { 0 } else { n as u32 })
    }

    /// Accept true/false, 0/1, "0"/"1"/"true"/"false"/"yes"/"no", or null.
    pub fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let value = match Option::<Loose>::deserialize(d)? {
            Some(Loose::Flag(b)) => b,
            Some(Loose::Num(n)) => n != 0.0,
            Some(Loose::Text(s)) => matches!(s.trim(), "1" | "true" | "yes" | "Yes"),
            _ => false,
        };
        Ok(value)
    }

    /// Accept `YYYY-MM-DD`; empty strings, nulls, and unparseable text
    /// become None.
    pub fn lenient_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_labels() {
        for status in LeadStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.label()));
            let back: LeadStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
            assert_eq!(LeadStatus::parse(status.label()), Some(status));
        }
        assert_eq!(LeadStatus::parse("Archived"), None);
    }

    #[test]
    fn draft_defaults_match_creation_flow() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let lead = Lead::draft(today);
        assert_eq!(lead.lead_status, LeadStatus::New);
        assert_eq!(lead.currency, BASE_CURRENCY);
        assert_eq!(lead.exchange_rate, 1.0);
        assert_eq!(lead.advance_scheme, AdvanceScheme::Half);
        assert_eq!(lead.next_follow_up, NaiveDate::from_ymd_opt(2024, 3, 13));
        assert!(!lead.contacted && !lead.advance_paid && !lead.project_completed);
    }

    #[test]
    fn lenient_deserialization_coerces_malformed_fields() {
        let json = r#"{
            "id": 7,
            "date": "2024-01-15",
            "businessName": "Cafe Aroma",
            "finalValue": "1500.5",
            "exchangeRate": null,
            "advancePaid": "1",
            "balancePaid": 0,
            "nextFollowUp": "",
            "domainRenewal": "not-a-date",
            "advanceScheme": "custom"
        }"#;
        let lead: Lead = serde_json::from_str(json).unwrap();
        assert_eq!(lead.final_value, 1500.5);
        assert_eq!(lead.exchange_rate, 1.0);
        assert!(lead.advance_paid);
        assert!(!lead.balance_paid);
        assert_eq!(lead.next_follow_up, None);
        assert_eq!(lead.domain_renewal, None);
        assert_eq!(lead.advance_scheme, AdvanceScheme::CustomPercent);
        assert_eq!(lead.lead_status, LeadStatus::New);
    }

    #[test]
    fn dates_serialize_as_iso_day_strings() {
        let mut lead = Lead::draft(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        lead.business_name = "Studio".into();
        let value = serde_json::to_value(&lead).unwrap();
        assert_eq!(value["date"], "2024-06-01");
        assert_eq!(value["nextFollowUp"], "2024-06-04");
        assert_eq!(value["currency"], "LKR");
        assert_eq!(value["advanceScheme"], "50");
        assert!(value.get("amountInLKR").is_some());
    }
}
