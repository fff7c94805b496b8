//! Read-only summaries derived from a ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current holding of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSummary {
    /// Instrument symbol.
    pub symbol: String,
    /// Shares held.
    pub shares: Decimal,
    /// Home-currency cost pool.
    pub cost_pool: Decimal,
    /// Native-currency cost basis.
    pub native_cost: Decimal,
    /// Native currency of the instrument.
    pub currency: String,
    /// Home-currency cost per share.
    pub cost_per_share: Decimal,
    /// Whether the most recent exchange rate differs from 1.
    pub foreign: bool,
    /// Exchange rate of the most recent event.
    pub last_fx_rate: Decimal,
}

/// Realized gains and losses for one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxYearSummary {
    /// Calendar year.
    pub year: i32,
    /// Sum of positive realized figures.
    pub gains: Decimal,
    /// Sum of the magnitudes of negative realized figures.
    pub losses: Decimal,
    /// Signed sum of realized figures.
    pub net: Decimal,
}

impl TaxYearSummary {
    /// An empty summary for `year`.
    #[must_use]
    pub const fn new(year: i32) -> Self {
        Self {
            year,
            gains: Decimal::ZERO,
            losses: Decimal::ZERO,
            net: Decimal::ZERO,
        }
    }

    /// Fold one realized figure into the summary.
    pub fn record(&mut self, realized: Decimal) {
        if realized > Decimal::ZERO {
            self.gains += realized;
        } else if realized < Decimal::ZERO {
            self.losses += realized.abs();
        }
        self.net += realized;
    }

    /// Like [`record`](Self::record), but leaves the summary unchanged and
    /// returns `None` when a total would overflow.
    pub fn checked_record(&mut self, realized: Decimal) -> Option<()> {
        let mut next = *self;
        if realized > Decimal::ZERO {
            next.gains = next.gains.checked_add(realized)?;
        } else if realized < Decimal::ZERO {
            next.losses = next.losses.checked_add(realized.abs())?;
        }
        next.net = next.net.checked_add(realized)?;
        *self = next;
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_splits_gains_and_losses() {
        let mut summary = TaxYearSummary::new(2024);
        summary.record(dec!(120));
        summary.record(dec!(-45.5));
        summary.record(Decimal::ZERO);

        assert_eq!(summary.gains, dec!(120));
        assert_eq!(summary.losses, dec!(45.5));
        assert_eq!(summary.net, dec!(74.5));
        assert_eq!(summary.gains - summary.losses, summary.net);
    }

    #[test]
    fn test_checked_record_stops_at_overflow() {
        let mut summary = TaxYearSummary::new(2024);
        assert_eq!(summary.checked_record(Decimal::MAX), Some(()));
        assert_eq!(summary.checked_record(dec!(-1)), Some(()));
        assert_eq!(summary.checked_record(dec!(1)), None);
        assert_eq!(summary.gains, Decimal::MAX);
        assert_eq!(summary.losses, dec!(1));
        assert_eq!(summary.net, Decimal::MAX - dec!(1));
    }
}
