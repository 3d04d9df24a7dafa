//! CSV/JSON snapshot export of the lead collection.

use crate::error::CrmError;
use crate::types::Lead;

const CSV_HEADERS: [&str; 9] = [
    "Date",
    "Business Name",
    "Client Name",
    "Status",
    "Currency",
    "Final Value",
    "Amount LKR",
    "Balance Paid",
    "Agreement Link",
];

/// Spreadsheet-friendly snapshot: one row per lead, text fields quoted.
pub fn leads_to_csv(leads: &[Lead]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_HEADERS.join(","));
    out.push('\n');

    for lead in leads {
        let row = [
            lead.date.format("%Y-%m-%d").to_string(),
            quote(&lead.business_name),
            quote(&lead.client_name),
            lead.lead_status.label().to_string(),
            lead.currency.clone(),
            lead.final_value.to_string(),
            lead.amount_in_lkr.to_string(),
            if lead.balance_paid { "Yes" } else { "No" }.to_string(),
            quote(&lead.agreement_link),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Full-fidelity backup; re-importable through the lenient deserializer.
pub fn leads_to_json(leads: &[Lead]) -> Result<String, CrmError> {
    serde_json::to_string_pretty(leads)
        .map_err(|e| CrmError::Store(crate::store::StoreError::Serde(e)))
}

/// Parse a JSON backup produced by [`leads_to_json`].
pub fn leads_from_json(content: &str) -> Result<Vec<Lead>, CrmError> {
    serde_json::from_str(content).map_err(|e| CrmError::Store(crate::store::StoreError::Serde(e)))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LeadStatus;
    use chrono::NaiveDate;

    fn lead(name: &str) -> Lead {
        let mut l = Lead::draft(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
        l.id = 1;
        l.business_name = name.to_string();
        l.client_name = "Kamala".to_string();
        l.lead_status = LeadStatus::ClosedWon;
        l.final_value = 1500.0;
        l.amount_in_lkr = 1500.0;
        l.balance_paid = true;
        l
    }

    #[test]
    fn csv_has_header_and_one_row_per_lead() {
        let csv = leads_to_csv(&[lead("Cafe Aroma"), lead("Harbor Dental")]);
        let lines: Vec<&str> = csv.trim_end().lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Date,Business Name,Client Name,Status"));
        assert_eq!(
            lines[1],
            "2024-04-02,\"Cafe Aroma\",\"Kamala\",Closed-Won,LKR,1500,1500,Yes,\"\""
        );
    }

    #[test]
    fn csv_escapes_embedded_quotes() {
        let csv = leads_to_csv(&[lead("The \"Best\" Bakery")]);
        assert!(csv.contains("\"The \"\"Best\"\" Bakery\""));
    }

    #[test]
    fn json_round_trips_the_collection() {
        let original = vec![lead("Cafe Aroma")];
        let json = leads_to_json(&original).unwrap();
        let restored = leads_from_json(&json).unwrap();
        assert_eq!(restored, original);
    }
}
