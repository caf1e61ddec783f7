use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

/// Statement-level metadata recovered from the document header.
/// Every field is optional — a pattern that fails to match is absence,
/// never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementHeader {
    pub company_name: Option<String>,
    pub company_cui: Option<String>,
    /// IBAN with internal whitespace stripped.
    pub account_number: Option<String>,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
}

/// Balance totals from the statement footer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementSummary {
    pub opening_balance: Option<Decimal>,
    pub closing_balance: Option<Decimal>,
    pub credit_count: u32,
    pub credit_total: Option<Decimal>,
    pub debit_count: u32,
    pub debit_total: Option<Decimal>,
}

/// Why a recognized line-group was dropped instead of emitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkipReason {
    /// No usable settlement amount was recovered for the group.
    MissingAmount,
    /// The recovered amount exceeded the sanity ceiling (misread IBAN or
    /// balance line).
    AmountOutOfBounds(Decimal),
    /// A start line with no description fragments at all.
    EmptyDescription,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingAmount => write!(f, "no amount recovered"),
            SkipReason::AmountOutOfBounds(a) => write!(f, "amount {a} out of bounds"),
            SkipReason::EmptyDescription => write!(f, "empty description"),
        }
    }
}

/// Everything recovered from one statement upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub header: StatementHeader,
    pub summary: StatementSummary,
    pub transactions: Vec<Transaction>,
    /// One entry per recognized line-group that was dropped.
    pub skipped: Vec<SkipReason>,
    pub filename: Option<String>,
}
