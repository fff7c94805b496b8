//! Field parsers shared by the importers.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a number, tolerating thousands separators and surrounding quotes.
pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Parse a broker date-time.
///
/// Accepts `YYYYMMDD;HHMMSS`, `YYYY-MM-DD;HH:MM:SS`, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DD, HH:MM:SS` and bare dates in either form. A bare date gets
/// `default_time`.
pub(crate) fn parse_datetime(s: &str, default_time: NaiveTime) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }

    let (date_part, time_part) = match s.find([';', ',', ' ']) {
        Some(idx) => (&s[..idx], Some(s[idx + 1..].trim())),
        None => (s, None),
    };

    let date = parse_date(date_part.trim())?;
    let time = match time_part {
        Some(t) if !t.is_empty() => parse_time(t)?,
        _ => default_time,
    };
    Some(date.and_time(time))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.contains('-') {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    } else if s.contains('/') {
        NaiveDate::parse_from_str(s, "%Y/%m/%d").ok()
    } else {
        NaiveDate::parse_from_str(s, "%Y%m%d").ok()
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    if s.contains(':') {
        NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .ok()
    } else {
        NaiveTime::parse_from_str(s, "%H%M%S").ok()
    }
}

/// Native currency implied by an exchange suffix on the symbol.
pub fn currency_for_symbol(symbol: &str) -> &'static str {
    if symbol.ends_with(".TO") {
        "CAD"
    } else if symbol.ends_with(".HK") {
        "HKD"
    } else {
        "USD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn expected(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("100.00"), Some(dec!(100)));
        assert_eq!(parse_decimal("1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_decimal("-50"), Some(dec!(-50)));
        assert_eq!(parse_decimal("\"1.3512\""), Some(dec!(1.3512)));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("N/A"), None);
    }

    #[test]
    fn test_datetime_forms() {
        let t = noon();
        assert_eq!(parse_datetime("20240315;093005", t), Some(expected(9, 30, 5)));
        assert_eq!(parse_datetime("2024-03-15;09:30:05", t), Some(expected(9, 30, 5)));
        assert_eq!(parse_datetime("2024-03-15 09:30:05", t), Some(expected(9, 30, 5)));
        assert_eq!(parse_datetime("2024-03-15, 09:30:05", t), Some(expected(9, 30, 5)));
        assert_eq!(parse_datetime("2024-03-15", t), Some(expected(12, 0, 0)));
        assert_eq!(parse_datetime("20240315", t), Some(expected(12, 0, 0)));
    }

    #[test]
    fn test_datetime_rejects_garbage() {
        assert_eq!(parse_datetime("", noon()), None);
        assert_eq!(parse_datetime("yesterday", noon()), None);
        assert_eq!(parse_datetime("2024-13-01", noon()), None);
        assert_eq!(parse_datetime("2024-03-15;25:00:00", noon()), None);
    }

    #[test]
    fn test_currency_for_symbol() {
        assert_eq!(currency_for_symbol("SHOP.TO"), "CAD");
        assert_eq!(currency_for_symbol("0700.HK"), "HKD");
        assert_eq!(currency_for_symbol("AAPL"), "USD");
    }
}
