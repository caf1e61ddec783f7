use decont_core::{StatementHeader, StatementSummary};

use crate::value::{parse_date, parse_value};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        pub(crate) fn $name() -> &'static ::regex::Regex {
            static R: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            R.get_or_init(|| ::regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub(crate) use re;

re!(re_company,
    r"(?i)Titular de cont\s+(.+?)(?:\n|CUI)");
re!(re_cui,
    r"CUI/CNP\s+(\d+)");
re!(re_account,
    r"Cont ales\s+(RO\d{2}\s*[A-Z]{4}\s*[\d\s]+)");
re!(re_period,
    r"(?s)De la\s+Pana la.*?(\d{2}\.\d{2}\.\d{4})\s+(\d{2}\.\d{2}\.\d{4})");

re!(re_opening_balance,
    r"Sold deschidere\s+\d{2}\.\d{2}\.\d{4}\s+([\d.,]+)\s*RON");
re!(re_closing_balance,
    r"Sold inchidere\s+\d{2}\.\d{2}\.\d{4}\s+([\d.,]+)\s*RON");
re!(re_credit_total,
    r"Credit total.*?\((\d+)\)\s+([\d.,]+)\s*RON");
re!(re_debit_total,
    r"Debit total.*?\((\d+)\)\s+([\d.,]+)\s*RON");

// ── Extraction ───────────────────────────────────────────────────────────────

/// Extract account-holder metadata from the statement header.
/// Stateless and purely regex-driven; a missing field is `None`, never an
/// error.
pub fn extract_header(text: &str) -> StatementHeader {
    let mut header = StatementHeader::default();

    if let Some(c) = re_company().captures(text) {
        header.company_name = c.get(1).map(|m| m.as_str().trim().to_string());
    }
    if let Some(c) = re_cui().captures(text) {
        header.company_cui = c.get(1).map(|m| m.as_str().trim().to_string());
    }
    if let Some(c) = re_account().captures(text) {
        // IBANs are printed with grouping spaces — strip them.
        header.account_number = c
            .get(1)
            .map(|m| m.as_str().chars().filter(|ch| !ch.is_whitespace()).collect());
    }
    if let Some(c) = re_period().captures(text) {
        header.period_from = c.get(1).and_then(|m| parse_date(m.as_str()));
        header.period_to = c.get(2).and_then(|m| parse_date(m.as_str()));
    }

    header
}

/// Extract balance totals from the statement footer.
pub fn extract_summary(text: &str) -> StatementSummary {
    let mut summary = StatementSummary::default();

    if let Some(c) = re_opening_balance().captures(text) {
        summary.opening_balance = c.get(1).and_then(|m| parse_value(m.as_str()));
    }
    if let Some(c) = re_closing_balance().captures(text) {
        summary.closing_balance = c.get(1).and_then(|m| parse_value(m.as_str()));
    }
    if let Some(c) = re_credit_total().captures(text) {
        summary.credit_count = c
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or_default();
        summary.credit_total = c.get(2).and_then(|m| parse_value(m.as_str()));
    }
    if let Some(c) = re_debit_total().captures(text) {
        summary.debit_count = c
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or_default();
        summary.debit_total = c.get(2).and_then(|m| parse_value(m.as_str()));
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER_TEXT: &str = "\
Titular de cont ACME INDUSTRIES SRL
CUI/CNP 12345678
Cont ales RO49 AAAA 1231 0075 9384 0000
De la  Pana la
01.11.2024  30.11.2024
";

    #[test]
    fn extracts_company_and_cui() {
        let h = extract_header(HEADER_TEXT);
        assert_eq!(h.company_name.as_deref(), Some("ACME INDUSTRIES SRL"));
        assert_eq!(h.company_cui.as_deref(), Some("12345678"));
    }

    #[test]
    fn account_number_strips_spaces() {
        let h = extract_header(HEADER_TEXT);
        assert_eq!(
            h.account_number.as_deref(),
            Some("RO49AAAA1231007593840000")
        );
    }

    #[test]
    fn extracts_period() {
        let h = extract_header(HEADER_TEXT);
        assert_eq!(h.period_from, NaiveDate::from_ymd_opt(2024, 11, 1));
        assert_eq!(h.period_to, NaiveDate::from_ymd_opt(2024, 11, 30));
    }

    #[test]
    fn missing_fields_are_none() {
        let h = extract_header("nothing recognizable here");
        assert!(h.company_name.is_none());
        assert!(h.company_cui.is_none());
        assert!(h.account_number.is_none());
        assert!(h.period_from.is_none());
    }

    #[test]
    fn extracts_summary_totals() {
        let text = "\
Sold deschidere 01.11.2024 12.345,67 RON
Credit total (3) 5.000,00 RON
Debit total (12) 3.210,45 RON
Sold inchidere 30.11.2024 14.135,22 RON
";
        let s = extract_summary(text);
        assert_eq!(s.opening_balance, Some("12345.67".parse().unwrap()));
        assert_eq!(s.closing_balance, Some("14135.22".parse().unwrap()));
        assert_eq!(s.credit_count, 3);
        assert_eq!(s.credit_total, Some("5000.00".parse().unwrap()));
        assert_eq!(s.debit_count, 12);
        assert_eq!(s.debit_total, Some("3210.45".parse().unwrap()));
    }

    #[test]
    fn summary_tolerates_missing_footer() {
        let s = extract_summary("no totals in this text");
        assert!(s.opening_balance.is_none());
        assert_eq!(s.debit_count, 0);
    }
}
