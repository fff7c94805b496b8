//! Display filters over ledger output.
//!
//! Filters select which entries feed the tax-year report and the audit
//! trail. They never change how pools are computed: the fold and the
//! position report always see the complete history.

use acbledger_core::LedgerEntry;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;

/// Which timestamps an entry may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    /// Every entry.
    #[default]
    All,
    /// Entries in one calendar year.
    Year(i32),
    /// Entries between two instants, both inclusive.
    Between {
        /// First included instant.
        start: NaiveDateTime,
        /// Last included instant.
        end: NaiveDateTime,
    },
}

impl DateRange {
    /// From the start of `start` to the end of `end`.
    #[must_use]
    pub fn between_dates(start: NaiveDate, end: NaiveDate) -> Self {
        let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
        Self::Between {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_time(last),
        }
    }

    /// Whether `at` falls in the range.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        match self {
            Self::All => true,
            Self::Year(year) => at.year() == *year,
            Self::Between { start, end } => *start <= at && at <= *end,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all time"),
            Self::Year(year) => write!(f, "{year} tax year"),
            Self::Between { start, end } => write!(
                f,
                "{} to {}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
        }
    }
}

/// Which instrument an entry may be for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SymbolFilter {
    /// Every instrument.
    #[default]
    All,
    /// Exactly one symbol.
    Exact(String),
}

impl SymbolFilter {
    /// Whether `symbol` passes.
    #[must_use]
    pub fn matches(&self, symbol: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(wanted) => wanted == symbol,
        }
    }
}

impl FromStr for SymbolFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("symbol filter is empty".to_string());
        }
        if s.eq_ignore_ascii_case("ALL") {
            Ok(Self::All)
        } else {
            Ok(Self::Exact(s.to_string()))
        }
    }
}

impl fmt::Display for SymbolFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Exact(symbol) => f.write_str(symbol),
        }
    }
}

/// A date range and a symbol filter applied together.
///
/// # Examples
///
/// ```
/// use acbledger_engine::{DateRange, LedgerFilter, SymbolFilter};
///
/// let filter = LedgerFilter::default()
///     .with_dates(DateRange::Year(2024))
///     .with_symbol(SymbolFilter::Exact("AAPL".into()));
/// assert_eq!(filter.to_string(), "AAPL, 2024 tax year");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerFilter {
    /// Date range.
    pub dates: DateRange,
    /// Symbol filter.
    pub symbol: SymbolFilter,
}

impl LedgerFilter {
    /// A filter that passes everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Set the date range.
    #[must_use]
    pub fn with_dates(mut self, dates: DateRange) -> Self {
        self.dates = dates;
        self
    }

    /// Set the symbol filter.
    #[must_use]
    pub fn with_symbol(mut self, symbol: SymbolFilter) -> Self {
        self.symbol = symbol;
        self
    }

    /// Whether `entry` passes both filters.
    #[must_use]
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.dates.contains(entry.timestamp()) && self.symbol.matches(entry.symbol())
    }
}

impl fmt::Display for LedgerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.symbol, self.dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_year_boundaries() {
        let range = DateRange::Year(2024);
        let last_minute = date(2024, 12, 31).and_hms_opt(23, 59, 0).unwrap();
        let new_year = date(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap();

        assert!(range.contains(last_minute));
        assert!(!range.contains(new_year));
    }

    #[test]
    fn test_between_dates_is_inclusive() {
        let range = DateRange::between_dates(date(2024, 3, 1), date(2024, 3, 31));

        assert!(range.contains(date(2024, 3, 1).and_hms_opt(0, 0, 0).unwrap()));
        assert!(range.contains(date(2024, 3, 31).and_hms_opt(23, 59, 59).unwrap()));
        assert!(!range.contains(date(2024, 4, 1).and_hms_opt(0, 0, 0).unwrap()));
        assert!(!range.contains(date(2024, 2, 29).and_hms_opt(23, 59, 59).unwrap()));
    }

    #[test]
    fn test_symbol_filter_parse() {
        assert_eq!("ALL".parse::<SymbolFilter>(), Ok(SymbolFilter::All));
        assert_eq!("all".parse::<SymbolFilter>(), Ok(SymbolFilter::All));
        assert_eq!(
            "SHOP.TO".parse::<SymbolFilter>(),
            Ok(SymbolFilter::Exact("SHOP.TO".to_string()))
        );
        assert!("".parse::<SymbolFilter>().is_err());
    }

    #[test]
    fn test_symbol_filter_is_exact() {
        let filter = SymbolFilter::Exact("SHOP".to_string());
        assert!(filter.matches("SHOP"));
        assert!(!filter.matches("SHOP.TO"));
        assert!(SymbolFilter::All.matches("anything"));
    }
}
