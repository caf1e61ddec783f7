use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    CardPurchase,
    Internal,
    Refund,
    Fee,
    Other,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::CardPurchase => write!(f, "card_purchase"),
            TransactionType::Internal => write!(f, "internal"),
            TransactionType::Refund => write!(f, "refund"),
            TransactionType::Fee => write!(f, "fee"),
            TransactionType::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card_purchase" => Ok(TransactionType::CardPurchase),
            "internal" => Ok(TransactionType::Internal),
            "refund" => Ok(TransactionType::Refund),
            "fee" => Ok(TransactionType::Fee),
            "other" => Ok(TransactionType::Other),
            other => Err(format!("Unknown transaction type: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Ignored,
    Resolved,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Ignored => write!(f, "ignored"),
            TransactionStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "ignored" => Ok(TransactionStatus::Ignored),
            "resolved" => Ok(TransactionStatus::Resolved),
            other => Err(format!("Unknown transaction status: '{other}'")),
        }
    }
}

/// One posted movement recovered from a statement.
///
/// `amount` is always in the settlement currency; the `original_*` fields are
/// only present when the statement showed a foreign-currency conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<i64>,
    /// Posting date (first date on the statement line).
    pub transaction_date: NaiveDate,
    /// Settlement date (second date on the statement line).
    pub value_date: NaiveDate,
    /// Signed settlement amount — negative is a debit/outflow.
    pub amount: Decimal,
    pub currency: String,
    pub original_amount: Option<Decimal>,
    pub original_currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub description: String,
    /// Masked card number, e.g. `1234-56XX-XXXX-7890`.
    pub card_number: Option<String>,
    pub auth_code: Option<String>,
    pub company_name: Option<String>,
    pub company_cui: Option<String>,
    pub account_number: Option<String>,
    pub statement_file: Option<String>,
    pub transaction_type: TransactionType,
    pub vendor_name: Option<String>,
    pub matched_supplier: Option<String>,
    pub status: TransactionStatus,
    /// Written by the reconciliation caller once a match is accepted.
    pub invoice_id: Option<i64>,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn transaction_type_roundtrip() {
        for t in [
            TransactionType::CardPurchase,
            TransactionType::Internal,
            TransactionType::Refund,
            TransactionType::Fee,
            TransactionType::Other,
        ] {
            assert_eq!(TransactionType::from_str(&t.to_string()).unwrap(), t);
        }
    }

    #[test]
    fn transaction_status_roundtrip() {
        for s in [
            TransactionStatus::Pending,
            TransactionStatus::Ignored,
            TransactionStatus::Resolved,
        ] {
            assert_eq!(TransactionStatus::from_str(&s.to_string()).unwrap(), s);
        }
    }

    #[test]
    fn unknown_type_errors() {
        assert!(TransactionType::from_str("wire").is_err());
        assert!(TransactionStatus::from_str("matched").is_err());
    }
}
