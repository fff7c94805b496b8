//! Superficial-loss detection.
//!
//! A losing sale is superficial when the same instrument is bought within
//! the window around the sale and shares are still held after it. The
//! repurchase search covers the complete transaction set, including buys
//! dated after the sale, so it does not depend on how far the fold has
//! progressed.
//!
//! The check is a necessary-condition approximation of the rule: it does not
//! re-attribute the denied loss lot by lot, and it does not require the
//! repurchased shares to still be held at the end of the window.

use acbledger_core::{RawTransaction, TransactionKind};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;

/// Sorted buy timestamps per symbol.
///
/// Built once per computation; each window query is a binary search.
#[derive(Debug, Clone, Default)]
pub struct RepurchaseIndex {
    buys: HashMap<String, Vec<NaiveDateTime>>,
}

impl RepurchaseIndex {
    /// Index every buy in `transactions`.
    pub fn build<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a RawTransaction>,
    {
        let mut buys: HashMap<String, Vec<NaiveDateTime>> = HashMap::new();
        for txn in transactions {
            if txn.kind == TransactionKind::Buy {
                buys.entry(txn.symbol.clone())
                    .or_default()
                    .push(txn.timestamp);
            }
        }
        for timestamps in buys.values_mut() {
            timestamps.sort_unstable();
        }
        Self { buys }
    }

    /// Whether `symbol` was bought within `days` days of `at`, both ends inclusive.
    pub fn has_buy_within(&self, symbol: &str, at: NaiveDateTime, days: u32) -> bool {
        self.first_buy_within(symbol, at, days).is_some()
    }

    /// The earliest buy of `symbol` within `days` days of `at`, both ends inclusive.
    ///
    /// A window reaching past the representable date range is clamped to it.
    pub fn first_buy_within(
        &self,
        symbol: &str,
        at: NaiveDateTime,
        days: u32,
    ) -> Option<NaiveDateTime> {
        let timestamps = self.buys.get(symbol)?;
        let span = Duration::try_days(i64::from(days)).unwrap_or(Duration::MAX);
        let start = at.checked_sub_signed(span).unwrap_or(NaiveDateTime::MIN);
        let end = at.checked_add_signed(span).unwrap_or(NaiveDateTime::MAX);

        let idx = timestamps.partition_point(|t| *t < start);
        timestamps.get(idx).copied().filter(|t| *t <= end)
    }

    /// Number of indexed buys of `symbol`.
    pub fn buy_count(&self, symbol: &str) -> usize {
        self.buys.get(symbol).map_or(0, Vec::len)
    }
}
