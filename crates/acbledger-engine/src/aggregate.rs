//! Reductions over a computed ledger.
//!
//! Each function is a pure pass over ledger entries in processing order and
//! accepts any iterator of `&LedgerEntry`, so a filtered view can be passed
//! as easily as the full ledger.

use acbledger_core::{Decimal, LedgerEntry, PositionSummary, TaxYearSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current holdings, one per symbol, sorted by symbol.
///
/// The last entry for each symbol defines its position. Symbols whose final
/// share count is not positive are left out.
pub fn position_summaries<'a, I>(entries: I) -> Vec<PositionSummary>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut last: BTreeMap<&str, &LedgerEntry> = BTreeMap::new();
    for entry in entries {
        last.insert(entry.symbol(), entry);
    }

    last.into_values()
        .filter(|entry| entry.after.shares > Decimal::ZERO)
        .map(|entry| PositionSummary {
            symbol: entry.transaction.symbol.clone(),
            shares: entry.after.shares,
            cost_pool: entry.after.cost_pool,
            native_cost: entry.after.native_cost,
            currency: entry.transaction.currency.clone(),
            cost_per_share: entry.cost_per_share,
            foreign: entry.transaction.is_foreign(),
            last_fx_rate: entry.transaction.fx_rate,
        })
        .collect()
}

/// Realized results per calendar year, most recent year first.
pub fn tax_year_summaries<'a, I>(entries: I) -> Vec<TaxYearSummary>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut years: BTreeMap<i32, TaxYearSummary> = BTreeMap::new();
    for entry in entries {
        let year = entry.year();
        years
            .entry(year)
            .or_insert_with(|| TaxYearSummary::new(year))
            .record(entry.realized_gain_loss);
    }
    years.into_values().rev().collect()
}

/// The first entry whose figures cannot be added into the yearly or
/// portfolio totals without overflowing.
///
/// Checking this once per computation lets the summaries above use plain
/// arithmetic.
pub(crate) fn first_unsummable(entries: &[LedgerEntry]) -> Option<&LedgerEntry> {
    let mut years: BTreeMap<i32, TaxYearSummary> = BTreeMap::new();
    let mut total = Decimal::ZERO;
    for entry in entries {
        let year = entry.year();
        let summary = years
            .entry(year)
            .or_insert_with(|| TaxYearSummary::new(year));
        let realized = entry.realized_gain_loss;
        match (summary.checked_record(realized), total.checked_add(realized)) {
            (Some(()), Some(sum)) => total = sum,
            _ => return Some(entry),
        }
    }

    let mut cost = Decimal::ZERO;
    let mut native: BTreeMap<String, Decimal> = BTreeMap::new();
    for position in position_summaries(entries) {
        let subtotal = native.entry(position.currency.clone()).or_default();
        match (
            cost.checked_add(position.cost_pool),
            subtotal.checked_add(position.native_cost),
        ) {
            (Some(c), Some(n)) => {
                cost = c;
                *subtotal = n;
            }
            _ => return entries.iter().rev().find(|e| e.symbol() == position.symbol),
        }
    }
    None
}

/// Portfolio-level figures across open positions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioOverview {
    /// Number of instruments with shares held.
    pub open_positions: usize,
    /// Home-currency cost pool across all open positions.
    pub total_cost_pool: Decimal,
    /// Home-currency cost pool of positions whose last fx rate differs from 1.
    pub foreign_cost_pool: Decimal,
    /// Native cost basis summed per native currency.
    pub native_cost_by_currency: BTreeMap<String, Decimal>,
    /// Entries whose loss was denied as superficial.
    pub superficial_count: usize,
}

impl PortfolioOverview {
    /// Build an overview from current positions and the entries to count superficial losses in.
    pub fn build<'a, I>(positions: &[PositionSummary], entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut overview = Self {
            open_positions: positions.len(),
            superficial_count: entries.into_iter().filter(|e| e.superficial).count(),
            ..Self::default()
        };
        for position in positions {
            overview.total_cost_pool += position.cost_pool;
            if position.foreign {
                overview.foreign_cost_pool += position.cost_pool;
            }
            *overview
                .native_cost_by_currency
                .entry(position.currency.clone())
                .or_default() += position.native_cost;
        }
        overview
    }
}
