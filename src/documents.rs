//! Plain-text receipt rendering: quotation, advance receipt, balance
//! receipt. Pure read consumer of the lead record — it converts currency
//! and applies discounts with its own local arithmetic and never writes
//! anything back.

use chrono::NaiveDate;

use crate::types::{DiscountType, Lead, BASE_CURRENCY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Quotation,
    AdvanceReceipt,
    BalanceReceipt,
}

impl DocKind {
    pub fn title(&self) -> &'static str {
        match self {
            DocKind::Quotation => "QUOTATION",
            DocKind::AdvanceReceipt => "ADVANCE PAYMENT RECEIPT",
            DocKind::BalanceReceipt => "BALANCE PAYMENT RECEIPT",
        }
    }
}

fn currency_symbol(currency: &str) -> &str {
    match currency {
        "LKR" => "Rs.",
        "USD" => "$",
        "GBP" => "£",
        "CAD" => "C$",
        "AUD" => "A$",
        "INR" => "₹",
        other => other,
    }
}

/// Render one document for a lead, dated `today`.
pub fn render_receipt(lead: &Lead, kind: DocKind, today: NaiveDate) -> String {
    let total = lead.final_value;
    let advance = lead.advance_computed;
    let balance = if lead.balance_amount != 0.0 {
        lead.balance_amount
    } else {
        total - advance
    };

    let symbol = currency_symbol(&lead.currency);
    let foreign = !lead.is_base_currency();
    let rate = lead.exchange_rate;
    let in_base = |amount: f64| if foreign { amount * rate } else { amount };

    let mut out = String::new();
    out.push_str(&format!("{}\n", kind.title()));
    out.push_str(&format!("Date: {}\n", today.format("%Y-%m-%d")));
    out.push_str(&format!(
        "Client: {} — {}\n",
        lead.business_name, lead.client_name
    ));
    out.push_str("----------------------------------------\n");

    match kind {
        DocKind::Quotation => render_quotation(&mut out, lead, symbol, foreign, rate),
        DocKind::AdvanceReceipt => {
            let paid_date = lead
                .advance_date_received
                .unwrap_or(lead.date)
                .format("%Y-%m-%d");
            out.push_str(&format!(
                "Total: {} {:.2} (Rs. {:.2})\n",
                symbol,
                total,
                in_base(total)
            ));
            out.push_str(&format!(
                "Advance received: {} {:.2} (Rs. {:.2})\n",
                symbol,
                advance,
                in_base(advance)
            ));
            out.push_str(&format!(
                "Method: {} | Date: {}\n",
                method_or_na(&lead.advance_method),
                paid_date
            ));
            out.push_str(&format!(
                "Balance due: {} {:.2} (Rs. {:.2})\n",
                symbol,
                balance,
                in_base(balance)
            ));
        }
        DocKind::BalanceReceipt => {
            let paid_date = lead
                .balance_date_received
                .unwrap_or(today)
                .format("%Y-%m-%d");
            out.push_str(&format!(
                "Total: {} {:.2} (Rs. {:.2})\n",
                symbol,
                total,
                in_base(total)
            ));
            out.push_str(&format!("Advance already paid: Rs. {:.2}\n", in_base(advance)));
            out.push_str(&format!(
                "Balance received: {} {:.2} (Rs. {:.2})\n",
                symbol,
                balance,
                in_base(balance)
            ));
            out.push_str(&format!(
                "Method: {} | Date: {}\n",
                method_or_na(&lead.balance_method),
                paid_date
            ));
            out.push_str("PAID IN FULL\n");
        }
    }

    if foreign {
        out.push_str("----------------------------------------\n");
        out.push_str(&format!(
            "Currency conversion: {} {:.2} @ {} LKR = Rs. {:.2}\n",
            symbol,
            total,
            rate,
            in_base(total)
        ));
    }
    out
}

fn render_quotation(out: &mut String, lead: &Lead, symbol: &str, foreign: bool, rate: f64) {
    if lead.services.is_empty() {
        // package fallback when no line items were quoted
        let package = if lead.package_type.is_empty() {
            "Web Development"
        } else {
            &lead.package_type
        };
        out.push_str(&format!("{} Package\n", package));
        if !lead.project_scope.is_empty() {
            out.push_str(&format!("  {}\n", lead.project_scope));
        }
        let total = if foreign {
            lead.final_value * rate
        } else {
            lead.final_value
        };
        out.push_str(&format!("Total (LKR): Rs. {:.2}\n", total));
        render_features(out, lead);
        return;
    }

    let mut subtotal = 0.0;
    for service in &lead.services {
        let quantity = service.quantity.max(1);
        let line_total = service.price * quantity as f64;
        subtotal += line_total;
        out.push_str(&format!(
            "{:<28} x{:<3} {} {:.2}\n",
            service.name, quantity, symbol, line_total
        ));
        if !service.description.is_empty() {
            out.push_str(&format!("  {}\n", service.description));
        }
    }
    out.push_str(&format!("Subtotal: {} {:.2}\n", symbol, subtotal));

    // Local discount arithmetic over the quoted lines; the stored pricing
    // fields are left untouched.
    let discount = match lead.discount_type {
        Some(DiscountType::Percent) => subtotal * (lead.discount_value / 100.0),
        Some(DiscountType::Fixed) => lead.discount_value,
        None => 0.0,
    };
    let discounted = (subtotal - discount).max(0.0);
    if discount > 0.0 {
        match lead.discount_type {
            Some(DiscountType::Percent) => out.push_str(&format!(
                "Discount ({}%): -{} {:.2}\n",
                lead.discount_value, symbol, discount
            )),
            _ => out.push_str(&format!("Discount: -{} {:.2}\n", symbol, discount)),
        }
    }

    let total_base = if foreign { discounted * rate } else { discounted };
    out.push_str(&format!(
        "Total ({}): Rs. {:.2}\n",
        BASE_CURRENCY, total_base
    ));
    render_features(out, lead);
}

fn render_features(out: &mut String, lead: &Lead) {
    let included: Vec<_> = lead
        .delivery_features
        .iter()
        .filter(|f| f.included)
        .collect();
    if included.is_empty() {
        return;
    }
    out.push_str("Included features:\n");
    for feature in included {
        out.push_str(&format!("  - {}\n", feature.feature));
    }
}

fn method_or_na(method: &str) -> &str {
    if method.is_empty() {
        "N/A"
    } else {
        method
    }
}
