use chrono::NaiveDate;
use rust_decimal::Decimal;

use decont_core::{SkipReason, StatementHeader, Transaction, TransactionStatus};

use crate::classify::classify_description;
use crate::header::re;
use crate::value::{parse_date, parse_value};

re!(re_start_line,
    r"^(\d{2}\.\d{2}\.\d{4})\s+(\d{2}\.\d{2}\.\d{4})\s*(.*)$");
re!(re_ron_debit,
    r"-([\d.,]+)\s*RON\s*$");
re!(re_value_suffix,
    r"([\d.,]+)\s*(RON|EUR|USD)\s*$");
re!(re_forex_rate,
    r"([\d.,]+)\s*(EUR|USD)\s*@([\d.,]+)\s*[A-Z]{3}-RON");
re!(re_card_number,
    r"Card[:\s]*(\d{4}-[\dX]{2}XX-XXXX-\d{4})");
re!(re_auth_code,
    r"Auth code\s+(\d+)");

/// Boilerplate fragments that never affect parser state.
const SKIP_MARKERS: &[&str] = &[
    "Sold deschidere",
    "Sold inchidere",
    "Credit total",
    "Debit total",
    "Totalul tranzactiilor",
    "Data inregistrarii",
    "Lista Tranzactii",
    "Istoric",
    "Titular de cont",
    "CUI/CNP",
    "Cont ales",
    "CONT:",
    "IBAN:",
    "LA:UNICREDIT",
    "UniCredit Bank",
    "Nr op.:",
    "pag.",
    "Pagina",
];

#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Absolute amounts above this are considered misreads (IBAN digits or
    /// balance lines that slipped past the boilerplate filter).
    pub max_amount: Decimal,
    /// Settlement currency assumed when no value line states one.
    pub home_currency: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_amount: Decimal::from(10_000_000),
            home_currency: "RON".to_string(),
        }
    }
}

/// In-progress transaction while the scanner is between start lines.
struct Draft {
    transaction_date: NaiveDate,
    value_date: NaiveDate,
    amount: Option<Decimal>,
    currency: Option<String>,
    original_amount: Option<Decimal>,
    original_currency: Option<String>,
    exchange_rate: Option<Decimal>,
    fragments: Vec<String>,
}

impl Draft {
    fn new(transaction_date: NaiveDate, value_date: NaiveDate, rest: &str) -> Self {
        let mut fragments = Vec::new();
        if !rest.trim().is_empty() {
            fragments.push(rest.trim().to_string());
        }
        Self {
            transaction_date,
            value_date,
            amount: None,
            currency: None,
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
            fragments,
        }
    }

    fn finalize(
        self,
        header: &StatementHeader,
        config: &ParserConfig,
        filename: Option<&str>,
    ) -> Result<Transaction, SkipReason> {
        if self.fragments.is_empty() {
            return Err(SkipReason::EmptyDescription);
        }

        let amount = match self.amount {
            Some(a) if !a.is_zero() => a,
            _ => return Err(SkipReason::MissingAmount),
        };
        if amount.abs() > config.max_amount {
            tracing::warn!(%amount, "dropping transaction with out-of-bounds amount");
            return Err(SkipReason::AmountOutOfBounds(amount));
        }

        let description = self.fragments.join(" ");
        let card_number = re_card_number()
            .captures(&description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        let auth_code = re_auth_code()
            .captures(&description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        let transaction_type = classify_description(&description);

        Ok(Transaction {
            id: None,
            transaction_date: self.transaction_date,
            value_date: self.value_date,
            amount,
            currency: self
                .currency
                .unwrap_or_else(|| config.home_currency.clone()),
            original_amount: self.original_amount,
            original_currency: self.original_currency,
            exchange_rate: self.exchange_rate,
            description,
            card_number,
            auth_code,
            company_name: header.company_name.clone(),
            company_cui: header.company_cui.clone(),
            account_number: header.account_number.clone(),
            statement_file: filename.map(|f| f.to_string()),
            transaction_type,
            vendor_name: None,
            matched_supplier: None,
            status: TransactionStatus::Pending,
            invoice_id: None,
        })
    }
}

fn is_boilerplate(line: &str) -> bool {
    if line.to_lowercase().contains("printat de") {
        return true;
    }
    SKIP_MARKERS.iter().any(|marker| line.contains(marker))
}

/// Walk statement lines and recover transactions.
///
/// Two states: scanning for a start line, or accumulating an in-progress
/// transaction. A start line carries two `DD.MM.YYYY` dates; value lines end
/// in `<number> <currency>`; everything else while in a transaction is a
/// description fragment. Line order is load-bearing — boundaries only exist
/// by layout convention.
pub fn extract_transactions(
    text: &str,
    header: &StatementHeader,
    config: &ParserConfig,
    filename: Option<&str>,
) -> (Vec<Transaction>, Vec<SkipReason>) {
    let mut transactions = Vec::new();
    let mut skipped = Vec::new();
    let mut current: Option<Draft> = None;

    let finish = |draft: Draft, skipped: &mut Vec<SkipReason>, out: &mut Vec<Transaction>| {
        match draft.finalize(header, config, filename) {
            Ok(txn) => out.push(txn),
            Err(reason) => {
                tracing::debug!(%reason, "skipped statement line-group");
                skipped.push(reason);
            }
        }
    };

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || is_boilerplate(line) {
            continue;
        }

        // A line opening with two dates starts a new transaction and closes
        // the previous one.
        if let Some(caps) = re_start_line().captures(line) {
            let dates = (
                parse_date(caps.get(1).map_or("", |m| m.as_str())),
                parse_date(caps.get(2).map_or("", |m| m.as_str())),
            );
            if let (Some(td), Some(vd)) = dates {
                if let Some(draft) = current.take() {
                    finish(draft, &mut skipped, &mut transactions);
                }
                let rest = caps.get(3).map_or("", |m| m.as_str());
                current = Some(Draft::new(td, vd, rest));
                continue;
            }
            // Dates out of range — fall through and treat as description.
        }

        let Some(draft) = current.as_mut() else {
            continue;
        };

        // Negative RON amount: the settlement debit. This also closes the
        // two-line foreign-currency protocol, overwriting any tentative
        // amount with the converted RON value.
        if let Some(caps) = re_ron_debit().captures(line) {
            if let Some(v) = caps.get(1).and_then(|m| parse_value(m.as_str())) {
                draft.amount = Some(-v);
                draft.currency = Some(config.home_currency.clone());
                continue;
            }
        }

        if let Some(caps) = re_value_suffix().captures(line) {
            let amount = caps.get(1).and_then(|m| parse_value(m.as_str()));
            let currency = caps.get(2).map_or("", |m| m.as_str());

            if let Some(amount) = amount {
                if let Some(fx) = re_forex_rate().captures(line) {
                    // `<amount> <FX> @<rate>` — the converted RON debit is
                    // expected on a following line.
                    draft.original_amount = fx.get(1).and_then(|m| parse_value(m.as_str()));
                    draft.original_currency = fx.get(2).map(|m| m.as_str().to_string());
                    draft.exchange_rate = fx.get(3).and_then(|m| parse_value(m.as_str()));
                } else if currency != config.home_currency {
                    // Foreign amount with no conversion shown yet.
                    draft.original_amount = Some(amount);
                    draft.original_currency = Some(currency.to_string());
                } else if draft.amount.is_none() {
                    // Plain positive home-currency line: a credit.
                    draft.amount = Some(amount);
                    draft.currency = Some(currency.to_string());
                }

                // Text preceding the numeric suffix is still description.
                let prefix = line[..caps.get(0).map_or(0, |m| m.start())].trim();
                if !prefix.is_empty() {
                    draft.fragments.push(prefix.to_string());
                }
                continue;
            }
        }

        // Default: a description continuation line.
        if !line.starts_with("Data") {
            draft.fragments.push(line.to_string());
        }
    }

    if let Some(draft) = current.take() {
        finish(draft, &mut skipped, &mut transactions);
    }

    (transactions, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use decont_core::TransactionType;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn parse(text: &str) -> (Vec<Transaction>, Vec<SkipReason>) {
        extract_transactions(
            text,
            &StatementHeader::default(),
            &ParserConfig::default(),
            None,
        )
    }

    #[test]
    fn single_debit_transaction() {
        let text = "\
03.11.2024 04.11.2024 POS purchase FACEBK *9DGR2CRV62
Card: 1234-56XX-XXXX-7890 Auth code 123456
-250,00 RON
";
        let (txs, skipped) = parse(text);
        assert_eq!(txs.len(), 1);
        assert!(skipped.is_empty());
        let t = &txs[0];
        assert_eq!(t.amount, dec("-250.00"));
        assert_eq!(t.currency, "RON");
        assert_eq!(
            t.transaction_date,
            NaiveDate::from_ymd_opt(2024, 11, 3).unwrap()
        );
        assert_eq!(t.value_date, NaiveDate::from_ymd_opt(2024, 11, 4).unwrap());
        assert_eq!(t.card_number.as_deref(), Some("1234-56XX-XXXX-7890"));
        assert_eq!(t.auth_code.as_deref(), Some("123456"));
        assert_eq!(t.transaction_type, TransactionType::CardPurchase);
    }

    #[test]
    fn description_spans_multiple_lines() {
        let text = "\
03.11.2024 04.11.2024 POS purchase GOOGLE
*ADS3555304242
continued description text
-100,00 RON
";
        let (txs, _) = parse(text);
        assert_eq!(txs.len(), 1);
        assert_eq!(
            txs[0].description,
            "POS purchase GOOGLE *ADS3555304242 continued description text"
        );
    }

    #[test]
    fn credit_in_home_currency() {
        let text = "\
05.11.2024 05.11.2024 Return from merchant
1.500,00 RON
";
        let (txs, _) = parse(text);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].amount, dec("1500.00"));
        assert_eq!(txs[0].transaction_type, TransactionType::Refund);
    }

    #[test]
    fn foreign_currency_with_rate_then_ron_debit() {
        let text = "\
07.11.2024 08.11.2024 POS purchase CLAUDE.AI SUBSCRIPTION
20,00 EUR @4,9750 EUR-RON 20,00 EUR
-99,50 RON
";
        let (txs, _) = parse(text);
        assert_eq!(txs.len(), 1);
        let t = &txs[0];
        assert_eq!(t.amount, dec("-99.50"));
        assert_eq!(t.currency, "RON");
        assert_eq!(t.original_amount, Some(dec("20.00")));
        assert_eq!(t.original_currency.as_deref(), Some("EUR"));
        assert_eq!(t.exchange_rate, Some(dec("4.9750")));
    }

    #[test]
    fn foreign_currency_without_rate_then_ron_debit() {
        let text = "\
07.11.2024 08.11.2024 POS purchase DIGITALOCEAN.COM
12,00 USD
-55,80 RON
";
        let (txs, _) = parse(text);
        assert_eq!(txs.len(), 1);
        let t = &txs[0];
        assert_eq!(t.amount, dec("-55.80"));
        assert_eq!(t.original_amount, Some(dec("12.00")));
        assert_eq!(t.original_currency.as_deref(), Some("USD"));
        assert!(t.exchange_rate.is_none());
    }

    #[test]
    fn ron_debit_before_fx_line_keeps_settlement_amount() {
        // Out-of-order variant of the two-line protocol: the settlement
        // amount survives and the FX line only adds the original values.
        let text = "\
07.11.2024 08.11.2024 POS purchase AIRALO
-99,50 RON
20,00 EUR @4,9750 EUR-RON 20,00 EUR
";
        let (txs, _) = parse(text);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].amount, dec("-99.50"));
        assert_eq!(txs[0].original_amount, Some(dec("20.00")));
        assert_eq!(txs[0].exchange_rate, Some(dec("4.9750")));
    }

    #[test]
    fn two_transactions_back_to_back() {
        let text = "\
03.11.2024 04.11.2024 POS purchase SHOP ONE
-10,00 RON
05.11.2024 05.11.2024 POS purchase SHOP TWO
-20,00 RON
";
        let (txs, _) = parse(text);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].amount, dec("-10.00"));
        assert_eq!(txs[1].amount, dec("-20.00"));
    }

    #[test]
    fn value_line_keeps_leading_description() {
        let text = "\
03.11.2024 04.11.2024 Incoming transfer
from client settlement 300,00 RON
";
        let (txs, _) = parse(text);
        assert_eq!(txs.len(), 1);
        assert_eq!(
            txs[0].description,
            "Incoming transfer from client settlement"
        );
        assert_eq!(txs[0].amount, dec("300.00"));
    }

    #[test]
    fn boilerplate_never_affects_state() {
        let text = "\
03.11.2024 04.11.2024 POS purchase SHOP
Pagina 2 din 7
UniCredit Bank S.A.
Printat de utilizator
-10,00 RON
Sold inchidere 30.11.2024 1.234,56 RON
";
        let (txs, skipped) = parse(text);
        assert_eq!(txs.len(), 1);
        assert!(skipped.is_empty());
        assert_eq!(txs[0].description, "POS purchase SHOP");
    }

    #[test]
    fn missing_amount_is_skipped_not_error() {
        let text = "\
03.11.2024 04.11.2024 POS purchase SHOP
no value line follows
";
        let (txs, skipped) = parse(text);
        assert!(txs.is_empty());
        assert_eq!(skipped, vec![SkipReason::MissingAmount]);
    }

    #[test]
    fn out_of_bounds_amount_is_dropped() {
        let text = "\
03.11.2024 04.11.2024 misread balance line
-12.345.678,00 RON
";
        let (txs, skipped) = parse(text);
        assert!(txs.is_empty());
        assert!(matches!(skipped[0], SkipReason::AmountOutOfBounds(_)));
    }

    #[test]
    fn emitted_count_never_exceeds_start_lines() {
        let text = "\
03.11.2024 04.11.2024 first
-10,00 RON
04.11.2024 05.11.2024 second without amount
05.11.2024 06.11.2024 third
-30,00 RON
";
        let (txs, skipped) = parse(text);
        // Three start lines, one dropped by the amount filter.
        assert_eq!(txs.len() + skipped.len(), 3);
        assert_eq!(txs.len(), 2);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let (txs, skipped) = parse("");
        assert!(txs.is_empty());
        assert!(skipped.is_empty());
    }

    #[test]
    fn header_metadata_attached_to_all_transactions() {
        let header = StatementHeader {
            company_name: Some("ACME SRL".to_string()),
            company_cui: Some("12345678".to_string()),
            account_number: Some("RO49AAAA1231007593840000".to_string()),
            period_from: None,
            period_to: None,
        };
        let text = "\
03.11.2024 04.11.2024 POS purchase SHOP
-10,00 RON
";
        let (txs, _) =
            extract_transactions(text, &header, &ParserConfig::default(), Some("nov.pdf"));
        assert_eq!(txs[0].company_name.as_deref(), Some("ACME SRL"));
        assert_eq!(txs[0].company_cui.as_deref(), Some("12345678"));
        assert_eq!(
            txs[0].account_number.as_deref(),
            Some("RO49AAAA1231007593840000")
        );
        assert_eq!(txs[0].statement_file.as_deref(), Some("nov.pdf"));
    }

    #[test]
    fn zero_amount_treated_as_missing() {
        let text = "\
03.11.2024 04.11.2024 zero value movement
0,00 RON
";
        let (txs, skipped) = parse(text);
        assert!(txs.is_empty());
        assert_eq!(skipped, vec![SkipReason::MissingAmount]);
    }
}
