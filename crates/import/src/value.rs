use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a locale-formatted statement number into a canonical decimal.
///
/// Statements in this family print European groupings (`1.234.567,89`) but
/// exported text occasionally carries US groupings (`1,234,567.89`). When
/// both separators appear, the last-occurring one is the decimal point and
/// the other groups thousands. A lone separator is the decimal point.
pub fn parse_value(raw: &str) -> Option<Decimal> {
    let s: String = raw.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return None;
    }

    let normalized = match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (None, Some(_)) => s.replace(',', "."),
        _ => s,
    };

    match Decimal::from_str(&normalized) {
        Ok(d) => Some(d),
        Err(_) => {
            tracing::warn!(value = raw, "could not parse statement value");
            None
        }
    }
}

/// Parse a `DD.MM.YYYY` statement date. Any other shape is absence.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d.%m.%Y").ok()
}
