//! The computed ledger.

use acbledger_core::{Decimal, LedgerEntry, PositionSummary, TaxYearSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::aggregate::{position_summaries, tax_year_summaries, PortfolioOverview};
use crate::filter::LedgerFilter;

/// Ledger entries in processing order.
///
/// Produced by [`compute_ledger`](crate::compute_ledger). The entry list is
/// the audit trail; positions and tax years are derived from it on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub(crate) const fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        Self { entries }
    }

    /// All entries in processing order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Iterate over entries in processing order.
    pub fn iter(&self) -> std::slice::Iter<'_, LedgerEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the ledger, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<LedgerEntry> {
        self.entries
    }

    /// Current holdings from the complete history.
    #[must_use]
    pub fn positions(&self) -> Vec<PositionSummary> {
        position_summaries(&self.entries)
    }

    /// Realized results per year, most recent first.
    #[must_use]
    pub fn tax_years(&self) -> Vec<TaxYearSummary> {
        tax_year_summaries(&self.entries)
    }

    /// Portfolio figures over current holdings.
    #[must_use]
    pub fn overview(&self) -> PortfolioOverview {
        PortfolioOverview::build(&self.positions(), &self.entries)
    }

    /// Every symbol that appears, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(LedgerEntry::symbol)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every year that appears, most recent first.
    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        self.entries
            .iter()
            .map(LedgerEntry::year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    /// Entries that pass `filter`, in processing order.
    pub fn filter<'a>(
        &'a self,
        filter: &'a LedgerFilter,
    ) -> impl Iterator<Item = &'a LedgerEntry> + 'a {
        self.entries.iter().filter(move |e| filter.matches(e))
    }

    /// Sum of realized gains and losses over every entry.
    #[must_use]
    pub fn total_realized(&self) -> Decimal {
        self.entries.iter().map(|e| e.realized_gain_loss).sum()
    }

    /// Number of entries whose loss was denied as superficial.
    #[must_use]
    pub fn superficial_count(&self) -> usize {
        self.entries.iter().filter(|e| e.superficial).count()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a LedgerEntry;
    type IntoIter = std::slice::Iter<'a, LedgerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Ledger {
    type Item = LedgerEntry;
    type IntoIter = std::vec::IntoIter<LedgerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
