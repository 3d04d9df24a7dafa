//! Currency conversion and advance/balance splitting.
//!
//! Everything here is pure arithmetic over a lead's commercial terms. The
//! only writer of `advance_computed`, `balance_amount` and `amount_in_lkr`
//! is [`recompute`]; the discount path is read-only and never touches
//! persisted pricing fields.

use crate::types::{AdvanceScheme, DiscountType, Lead, ServiceItem};

/// Derived pricing for one lead. `advance` and `balance` are in the lead's
/// own currency; `amount_in_base` is the base-currency equivalent of the
/// full value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub advance: f64,
    pub balance: f64,
    pub amount_in_base: f64,
}

/// Split `final_value` under the given scheme.
///
/// `advance_input` is the scheme parameter: a percentage for
/// `CustomPercent`, an absolute amount for `FixedAmount`, ignored by the
/// three preset schemes. Non-finite inputs are treated as 0.
pub fn compute(
    final_value: f64,
    is_base_currency: bool,
    exchange_rate: f64,
    scheme: AdvanceScheme,
    advance_input: f64,
) -> Pricing {
    let final_value = sanitize(final_value);
    let advance_input = sanitize(advance_input);
    let exchange_rate = sanitize(exchange_rate);

    let advance = match scheme {
        AdvanceScheme::Half => final_value * 0.50,
        AdvanceScheme::Quarter => final_value * 0.25,
        AdvanceScheme::Thirty => final_value * 0.30,
        AdvanceScheme::CustomPercent => final_value * (advance_input / 100.0),
        AdvanceScheme::FixedAmount => advance_input,
    };

    Pricing {
        advance,
        balance: final_value - advance,
        amount_in_base: if is_base_currency {
            final_value
        } else {
            final_value * exchange_rate
        },
    }
}

/// Recompute a lead's derived pricing fields in place. Called by the save
/// flow after any edit to the commercial terms; partial edits outside that
/// flow deliberately do not trigger it.
pub fn recompute(lead: &mut Lead) {
    let pricing = compute(
        lead.final_value,
        lead.is_base_currency(),
        lead.exchange_rate,
        lead.advance_scheme,
        lead.advance_input_value,
    );
    lead.final_value = sanitize(lead.final_value);
    lead.advance_computed = pricing.advance;
    lead.balance_amount = pricing.balance;
    lead.amount_in_lkr = pricing.amount_in_base;
}

/// Convert an amount in the lead's currency to the base currency.
pub fn to_base_currency(lead: &Lead, amount: f64) -> f64 {
    if lead.is_base_currency() {
        sanitize(amount)
    } else {
        sanitize(amount) * sanitize(lead.exchange_rate)
    }
}

/// Raw services subtotal in the lead's currency. Quantity is clamped to a
/// minimum of 1; a zero price is a legitimate free line.
pub fn services_subtotal(services: &[ServiceItem]) -> f64 {
    services
        .iter()
        .map(|s| sanitize(s.price) * s.quantity.max(1) as f64)
        .sum()
}

/// Presentation-time discount over the services subtotal. Pure read path:
/// the result is for document rendering only and is never written back to
/// `final_value` or the advance/balance fields.
pub fn discounted_subtotal(lead: &Lead) -> f64 {
    let subtotal = services_subtotal(&lead.services);
    let discount = match lead.discount_type {
        Some(DiscountType::Percent) => subtotal * (sanitize(lead.discount_value) / 100.0),
        Some(DiscountType::Fixed) => sanitize(lead.discount_value),
        None => 0.0,
    };
    (subtotal - discount).max(0.0)
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
