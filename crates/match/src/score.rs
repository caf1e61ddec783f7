use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::util::similarity;

// Amount precision dominates the point scale: an exact amount with minimal
// date and supplier corroboration clears auto-accept on its own
// (90 / 100 = 0.9).
pub const SCORE_EXACT_AMOUNT: f64 = 90.0;
pub const SCORE_CLOSE_AMOUNT: f64 = 70.0;
pub const SCORE_MEDIUM_AMOUNT: f64 = 40.0;

pub const SCORE_DATE_SAME_WEEK: f64 = 5.0;
pub const SCORE_DATE_SAME_MONTH: f64 = 3.0;
pub const SCORE_DATE_WITHIN_60_DAYS: f64 = 1.0;

pub const SCORE_SUPPLIER_EXACT: f64 = 5.0;
pub const SCORE_SUPPLIER_SIMILAR: f64 = 3.0;

pub const AUTO_ACCEPT_THRESHOLD: f64 = 0.9;
pub const SUGGESTION_THRESHOLD: f64 = 0.5;

const SUPPLIER_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Absolute value; bank debits are negative but invoices are not.
pub fn normalize_amount(amount: Option<Decimal>) -> Decimal {
    amount.map(|a| a.abs()).unwrap_or(Decimal::ZERO)
}

fn relative_difference(a: Decimal, b: Decimal) -> Option<f64> {
    let (a, b) = (a.abs(), b.abs());
    let max = a.max(b);
    if max.is_zero() {
        return Some(0.0);
    }
    ((a - b).abs() / max).to_f64()
}

/// Sign-symmetric amount equality within 0.1% relative tolerance.
pub fn amounts_match(a: Decimal, b: Decimal) -> bool {
    matches!(relative_difference(a, b), Some(d) if d < 0.001)
}

/// Tiered amount score: < 0.1% exact, < 1% close, < 5% medium, else 0.
pub fn amount_score(invoice_value: Decimal, txn_amount: Decimal) -> f64 {
    match relative_difference(invoice_value, txn_amount) {
        Some(d) if d < 0.001 => SCORE_EXACT_AMOUNT,
        Some(d) if d < 0.01 => SCORE_CLOSE_AMOUNT,
        Some(d) if d < 0.05 => SCORE_MEDIUM_AMOUNT,
        _ => 0.0,
    }
}

/// Tiered date score on days elapsed since invoicing. A transaction that
/// predates its invoice scores 0 — invoices cannot be paid before being
/// issued.
pub fn date_score(txn_date: Option<NaiveDate>, invoice_date: Option<NaiveDate>) -> f64 {
    let (Some(txn), Some(invoice)) = (txn_date, invoice_date) else {
        return 0.0;
    };
    if txn < invoice {
        return 0.0;
    }
    match (txn - invoice).num_days() {
        0..=7 => SCORE_DATE_SAME_WEEK,
        8..=31 => SCORE_DATE_SAME_MONTH,
        32..=60 => SCORE_DATE_WITHIN_60_DAYS,
        _ => 0.0,
    }
}

/// Supplier identity score: case/whitespace-insensitive exact match, or
/// fuzzy similarity at 0.8. Either side absent is 0, never an error.
pub fn supplier_score(txn_supplier: Option<&str>, invoice_supplier: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (txn_supplier, invoice_supplier) else {
        return 0.0;
    };
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return SCORE_SUPPLIER_EXACT;
    }
    if similarity(&a, &b) >= SUPPLIER_SIMILARITY_THRESHOLD {
        return SCORE_SUPPLIER_SIMILAR;
    }
    0.0
}
