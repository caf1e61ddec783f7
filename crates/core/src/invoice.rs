use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An outstanding invoice offered as a reconciliation candidate.
///
/// Invoices carry their native value plus per-currency denominations so a
/// foreign-currency transaction can be compared in its own currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: Option<String>,
    pub supplier: Option<String>,
    pub supplier_vat: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    /// Value in the invoice's native currency.
    pub invoice_value: Option<Decimal>,
    pub currency: Option<String>,
    pub value_ron: Option<Decimal>,
    pub value_eur: Option<Decimal>,
    pub value_usd: Option<Decimal>,
}

impl Invoice {
    /// The invoice value denominated in `currency`, falling back to the
    /// native value when no dedicated field is carried for it.
    pub fn value_in(&self, currency: &str) -> Option<Decimal> {
        let denominated = match currency.to_ascii_uppercase().as_str() {
            "RON" => self.value_ron,
            "EUR" => self.value_eur,
            "USD" => self.value_usd,
            _ => None,
        };
        denominated.or(self.invoice_value)
    }
}
