//! The cost-pool fold.
//!
//! [`CostPoolTracker`] walks transactions in processing order, keeping one
//! [`PoolState`] per symbol, and emits one [`LedgerEntry`] per transaction.
//! Pools start empty the first time a symbol is seen. The tracker is owned by
//! a single computation and discarded with it.

use acbledger_core::{LedgerEntry, PoolOverflow, PoolState, RawTransaction, TransactionKind};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use crate::superficial::RepurchaseIndex;
use crate::EngineOptions;

/// Outcome of one disposal before it is written to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Disposal {
    realized: Decimal,
    superficial: bool,
    denied_loss: Decimal,
}

/// Per-symbol cost pools for one ledger computation.
pub(crate) struct CostPoolTracker<'a> {
    options: &'a EngineOptions,
    repurchases: &'a RepurchaseIndex,
    pools: HashMap<String, PoolState>,
}

impl<'a> CostPoolTracker<'a> {
    pub(crate) fn new(options: &'a EngineOptions, repurchases: &'a RepurchaseIndex) -> Self {
        Self {
            options,
            repurchases,
            pools: HashMap::new(),
        }
    }

    /// Apply one transaction and return its ledger entry.
    ///
    /// On overflow the symbol's pool is left as it was before `txn`.
    pub(crate) fn apply(&mut self, txn: &RawTransaction) -> Result<LedgerEntry, PoolOverflow> {
        let pool = self.pools.entry(txn.symbol.clone()).or_default();
        let before = *pool;

        let outcome = match txn.kind {
            TransactionKind::Buy => pool
                .acquire(txn.quantity, txn.home_cost(), txn.native_cost())
                .map(|()| Disposal::default()),
            TransactionKind::Sell => Self::dispose(self.options, self.repurchases, pool, txn),
            TransactionKind::Split => pool
                .adjust_shares(txn.quantity)
                .map(|()| Disposal::default()),
        };
        let disposal = match outcome {
            Ok(disposal) => disposal,
            Err(e) => {
                *pool = before;
                return Err(e);
            }
        };

        if pool.normalize(self.options.zero_tolerance) && !before.is_empty() {
            debug!(symbol = %txn.symbol, id = %txn.id, "position closed");
        }
        let after = *pool;

        Ok(LedgerEntry {
            transaction: txn.clone(),
            before,
            after,
            cost_per_share: after.cost_per_share(),
            realized_gain_loss: disposal.realized,
            superficial: disposal.superficial,
            denied_loss: disposal.denied_loss,
        })
    }

    fn dispose(
        options: &EngineOptions,
        repurchases: &RepurchaseIndex,
        pool: &mut PoolState,
        txn: &RawTransaction,
    ) -> Result<Disposal, PoolOverflow> {
        let Some(release) = pool.dispose(txn.quantity)? else {
            debug!(
                symbol = %txn.symbol,
                id = %txn.id,
                "sell with no shares held, recorded as zero-effect disposal"
            );
            return Ok(Disposal::default());
        };

        let realized = txn
            .home_proceeds()
            .checked_sub(release.cost_pool)
            .ok_or(PoolOverflow)?;
        if realized >= Decimal::ZERO {
            return Ok(Disposal {
                realized,
                ..Disposal::default()
            });
        }

        // The position must survive normalization for the denied loss to stay in the pool.
        let still_held = pool.shares >= options.zero_tolerance;
        if still_held
            && repurchases.has_buy_within(
                &txn.symbol,
                txn.timestamp,
                options.superficial_window_days,
            )
        {
            let denied_loss = realized.abs();
            pool.add_cost(denied_loss)?;
            debug!(
                symbol = %txn.symbol,
                id = %txn.id,
                %denied_loss,
                "loss reclassified as superficial"
            );
            return Ok(Disposal {
                realized: Decimal::ZERO,
                superficial: true,
                denied_loss,
            });
        }

        Ok(Disposal {
            realized,
            ..Disposal::default()
        })
    }

    /// Current pool for `symbol`, if it has been seen.
    #[cfg(test)]
    pub(crate) fn pool(&self, symbol: &str) -> Option<&PoolState> {
        self.pools.get(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn run(txns: &[RawTransaction]) -> Vec<LedgerEntry> {
        let options = EngineOptions::default();
        let index = RepurchaseIndex::build(txns);
        let mut tracker = CostPoolTracker::new(&options, &index);
        txns.iter().map(|t| tracker.apply(t).unwrap()).collect()
    }

    #[test]
    fn test_buy_adds_cost_with_fx() {
        let entries = run(&[RawTransaction::buy("AAPL", at(1, 2), dec!(10), dec!(100))
            .with_commission(dec!(2))
            .with_fx_rate(dec!(1.5))]);

        let e = &entries[0];
        assert_eq!(e.before, PoolState::EMPTY);
        assert_eq!(e.after.shares, dec!(10));
        assert_eq!(e.after.cost_pool, dec!(1503));
        assert_eq!(e.after.native_cost, dec!(1002));
        assert_eq!(e.cost_per_share, dec!(150.3));
        assert_eq!(e.realized_gain_loss, Decimal::ZERO);
    }

    #[test]
    fn test_partial_sell_gain() {
        let entries = run(&[
            RawTransaction::buy("AAPL", at(1, 2), dec!(100), dec!(10)),
            RawTransaction::sell("AAPL", at(2, 2), dec!(40), dec!(15)).with_commission(dec!(10)),
        ]);

        let sell = &entries[1];
        assert_eq!(sell.realized_gain_loss, dec!(190));
        assert_eq!(sell.after, PoolState::new(dec!(60), dec!(600), dec!(600)));
        assert_eq!(sell.cost_per_share, dec!(10));
        assert!(!sell.superficial);
    }

    #[test]
    fn test_sell_without_shares_is_zero_effect() {
        let entries = run(&[RawTransaction::sell("AAPL", at(1, 2), dec!(5), dec!(10))]);

        let e = &entries[0];
        assert_eq!(e.realized_gain_loss, Decimal::ZERO);
        assert_eq!(e.before, PoolState::EMPTY);
        assert_eq!(e.after, PoolState::EMPTY);
        assert!(!e.superficial);
    }

    #[test]
    fn test_split_changes_shares_only() {
        let entries = run(&[
            RawTransaction::buy("AAPL", at(1, 2), dec!(10), dec!(100)),
            RawTransaction::split("AAPL", at(3, 1), dec!(30)),
        ]);

        let split = &entries[1];
        assert_eq!(split.after.shares, dec!(40));
        assert_eq!(split.after.cost_pool, dec!(1000));
        assert_eq!(split.after.native_cost, dec!(1000));
        assert_eq!(split.cost_per_share, dec!(25));
    }

    #[test]
    fn test_superficial_loss_folds_into_pool() {
        let entries = run(&[
            RawTransaction::buy("XYZ", at(1, 2), dec!(100), dec!(10)),
            RawTransaction::sell("XYZ", at(3, 1), dec!(50), dec!(8)),
            RawTransaction::buy("XYZ", at(3, 10), dec!(10), dec!(8)),
        ]);

        let sell = &entries[1];
        assert!(sell.superficial);
        assert_eq!(sell.realized_gain_loss, Decimal::ZERO);
        assert_eq!(sell.denied_loss, dec!(100));
        assert_eq!(sell.after.cost_pool, dec!(600));
        assert_eq!(sell.after.native_cost, dec!(500));
    }

    #[test]
    fn test_loss_on_full_disposal_is_allowed() {
        let entries = run(&[
            RawTransaction::buy("XYZ", at(1, 2), dec!(100), dec!(10)),
            RawTransaction::sell("XYZ", at(3, 1), dec!(100), dec!(8)),
            RawTransaction::buy("XYZ", at(3, 10), dec!(10), dec!(8)),
        ]);

        let sell = &entries[1];
        assert!(!sell.superficial);
        assert_eq!(sell.realized_gain_loss, dec!(-200));
        assert_eq!(sell.after, PoolState::EMPTY);
    }

    #[test]
    fn test_overflow_restores_pool() {
        let options = EngineOptions::default();
        let txns = [
            RawTransaction::buy("X", at(1, 2), dec!(1), Decimal::MAX),
            RawTransaction::buy("X", at(1, 3), dec!(1), Decimal::MAX),
        ];
        let index = RepurchaseIndex::build(&txns);
        let mut tracker = CostPoolTracker::new(&options, &index);

        tracker.apply(&txns[0]).unwrap();
        assert_eq!(tracker.apply(&txns[1]), Err(PoolOverflow));
        assert_eq!(
            *tracker.pool("X").unwrap(),
            PoolState::new(dec!(1), Decimal::MAX, Decimal::MAX)
        );
    }

    #[test]
    fn test_pools_are_per_symbol() {
        let options = EngineOptions::default();
        let txns = [
            RawTransaction::buy("A", at(1, 2), dec!(1), dec!(10)),
            RawTransaction::buy("B", at(1, 3), dec!(2), dec!(20)),
        ];
        let index = RepurchaseIndex::build(&txns);
        let mut tracker = CostPoolTracker::new(&options, &index);
        for txn in &txns {
            tracker.apply(txn).unwrap();
        }

        assert_eq!(tracker.pool("A").unwrap().cost_pool, dec!(10));
        assert_eq!(tracker.pool("B").unwrap().cost_pool, dec!(40));
        assert!(tracker.pool("C").is_none());
    }
}
