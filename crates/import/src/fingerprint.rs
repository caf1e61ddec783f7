use std::collections::HashSet;
use std::sync::RwLock;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use thiserror::Error;

use decont_core::Transaction;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("fingerprint lookup failed: {0}")]
    Lookup(String),
}

/// Lookup side of the persistence collaborator: answers whether a
/// transaction with a given fingerprint was already recorded.
pub trait TransactionIndex: Send + Sync {
    fn contains(&self, fingerprint: &str) -> Result<bool, IndexError>;
}

/// Compute the dedup fingerprint of a physical transaction.
///
/// The identity of a movement is its account, posting date, amount and
/// description — the same movement re-imported from the same statement file
/// (or an overlapping one) hashes identically.
pub fn fingerprint(
    account_number: Option<&str>,
    transaction_date: NaiveDate,
    amount: Decimal,
    description: &str,
) -> String {
    let canonical = format!(
        "{}|{}|{}|{}",
        account_number.unwrap_or(""),
        transaction_date,
        amount.normalize(),
        description.trim(),
    );
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn transaction_fingerprint(txn: &Transaction) -> String {
    fingerprint(
        txn.account_number.as_deref(),
        txn.transaction_date,
        txn.amount,
        &txn.description,
    )
}

/// Drop transactions the index already knows. Re-importing a statement is a
/// no-op, not an error; a failed lookup keeps the transaction.
pub fn filter_new(
    transactions: Vec<Transaction>,
    index: &dyn TransactionIndex,
) -> Vec<Transaction> {
    transactions
        .into_iter()
        .filter(|txn| {
            let fp = transaction_fingerprint(txn);
            match index.contains(&fp) {
                Ok(true) => {
                    tracing::debug!(fingerprint = %fp, "dropping duplicate transaction");
                    false
                }
                Ok(false) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "fingerprint lookup failed, keeping transaction");
                    true
                }
            }
        })
        .collect()
}

/// In-memory index — for tests and single-process embedding.
#[derive(Default)]
pub struct MemoryIndex {
    seen: RwLock<HashSet<String>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, fingerprint: String) {
        self.seen
            .write()
            .expect("fingerprint index lock poisoned")
            .insert(fingerprint);
    }

    pub fn record_transaction(&self, txn: &Transaction) {
        self.record(transaction_fingerprint(txn));
    }
}

impl TransactionIndex for MemoryIndex {
    fn contains(&self, fingerprint: &str) -> Result<bool, IndexError> {
        Ok(self
            .seen
            .read()
            .expect("fingerprint index lock poisoned")
            .contains(fingerprint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decont_core::{TransactionStatus, TransactionType};

    fn txn(account: Option<&str>, amount: &str, description: &str) -> Transaction {
        Transaction {
            id: None,
            transaction_date: NaiveDate::from_ymd_opt(2024, 11, 15).unwrap(),
            value_date: NaiveDate::from_ymd_opt(2024, 11, 15).unwrap(),
            amount: amount.parse().unwrap(),
            currency: "RON".to_string(),
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
            description: description.to_string(),
            card_number: None,
            auth_code: None,
            company_name: None,
            company_cui: None,
            account_number: account.map(|a| a.to_string()),
            statement_file: None,
            transaction_type: TransactionType::Other,
            vendor_name: None,
            matched_supplier: None,
            status: TransactionStatus::Pending,
            invoice_id: None,
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = txn(Some("RO49X"), "-100.00", "POS purchase SHOP");
        let b = txn(Some("RO49X"), "-100.00", "POS purchase SHOP");
        assert_eq!(transaction_fingerprint(&a), transaction_fingerprint(&b));
    }

    #[test]
    fn fingerprint_is_sensitive_to_each_component() {
        let base = txn(Some("RO49X"), "-100.00", "POS purchase SHOP");
        let fp = transaction_fingerprint(&base);
        assert_ne!(
            fp,
            transaction_fingerprint(&txn(Some("RO49Y"), "-100.00", "POS purchase SHOP"))
        );
        assert_ne!(
            fp,
            transaction_fingerprint(&txn(Some("RO49X"), "-100.01", "POS purchase SHOP"))
        );
        assert_ne!(
            fp,
            transaction_fingerprint(&txn(Some("RO49X"), "-100.00", "POS purchase OTHER"))
        );
    }

    #[test]
    fn fingerprint_ignores_trailing_zero_noise() {
        // `-100.0` and `-100.00` are the same amount.
        let a = txn(Some("RO49X"), "-100.0", "X");
        let b = txn(Some("RO49X"), "-100.00", "X");
        assert_eq!(transaction_fingerprint(&a), transaction_fingerprint(&b));
    }

    #[test]
    fn reimport_is_a_noop() {
        let index = MemoryIndex::new();
        let first = filter_new(vec![txn(Some("RO49X"), "-100.00", "SHOP")], &index);
        assert_eq!(first.len(), 1);
        for t in &first {
            index.record_transaction(t);
        }

        let second = filter_new(vec![txn(Some("RO49X"), "-100.00", "SHOP")], &index);
        assert!(second.is_empty());
    }

    #[test]
    fn distinct_transactions_pass_through() {
        let index = MemoryIndex::new();
        index.record_transaction(&txn(Some("RO49X"), "-100.00", "SHOP"));
        let kept = filter_new(
            vec![
                txn(Some("RO49X"), "-100.00", "SHOP"),
                txn(Some("RO49X"), "-200.00", "OTHER SHOP"),
            ],
            &index,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].description, "OTHER SHOP");
    }

    #[test]
    fn lookup_failure_keeps_transaction() {
        struct BrokenIndex;
        impl TransactionIndex for BrokenIndex {
            fn contains(&self, _fingerprint: &str) -> Result<bool, IndexError> {
                Err(IndexError::Lookup("db down".into()))
            }
        }
        let kept = filter_new(vec![txn(None, "-10.00", "SHOP")], &BrokenIndex);
        assert_eq!(kept.len(), 1);
    }
}
