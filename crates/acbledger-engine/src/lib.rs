//! Adjusted cost base engine.
//!
//! This crate turns a set of [`RawTransaction`]s into a [`Ledger`]:
//! - Chronological processing with a stable tie-break on input order
//! - One weighted-average cost pool per symbol
//! - Realized gain or loss on every sale, in home currency
//! - Superficial-loss detection with a ±30 day repurchase window
//! - Position and tax-year summaries derived from the ledger
//!
//! # Example
//!
//! ```
//! use acbledger_core::{NaiveDate, RawTransaction};
//! use acbledger_engine::compute_ledger;
//! use rust_decimal_macros::dec;
//!
//! let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap().and_hms_opt(10, 0, 0).unwrap();
//! let txns = vec![
//!     RawTransaction::buy("AAPL", day(1, 2), dec!(100), dec!(10)),
//!     RawTransaction::sell("AAPL", day(2, 2), dec!(40), dec!(15)).with_commission(dec!(10)),
//! ];
//!
//! let ledger = compute_ledger(&txns).unwrap();
//! assert_eq!(ledger.total_realized(), dec!(190));
//! assert_eq!(ledger.positions()[0].shares, dec!(60));
//! ```
//!
//! The engine is a pure function of its input. It keeps no state between
//! invocations, so concurrent computations over separate inputs never
//! interfere.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod aggregate;
mod filter;
mod fold;
mod ledger;
mod options;
mod planner;
pub mod superficial;

pub use aggregate::{position_summaries, tax_year_summaries, PortfolioOverview};
pub use filter::{DateRange, LedgerFilter, SymbolFilter};
pub use ledger::Ledger;
pub use options::{EngineOptions, DEFAULT_WINDOW_DAYS};
pub use planner::{HarvestCandidate, HarvestPlan, HarvestPlanner, PlanError, SimulatedDisposal};
pub use superficial::RepurchaseIndex;

use acbledger_core::{sort_transactions, RawTransaction, ValidationError};
use thiserror::Error;
use tracing::debug_span;

use crate::fold::CostPoolTracker;

/// Errors from a ledger computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A transaction failed validation; nothing was computed.
    #[error("invalid transaction {id}: {source}")]
    InvalidTransaction {
        /// Id of the offending transaction.
        id: String,
        /// What was wrong with it.
        #[source]
        source: ValidationError,
    },
    /// A cost pool or realized total left the representable range.
    #[error("amounts overflow at transaction {id}")]
    Overflow {
        /// Id of the transaction being applied or totalled.
        id: String,
    },
}

/// Compute the ledger with default options.
///
/// # Errors
///
/// Returns [`EngineError::InvalidTransaction`] for the first transaction that
/// fails validation and [`EngineError::Overflow`] when pool arithmetic leaves
/// the range of `Decimal`. No partial ledger is produced.
pub fn compute_ledger(transactions: &[RawTransaction]) -> Result<Ledger, EngineError> {
    compute_ledger_with(transactions, &EngineOptions::default())
}

/// Compute the ledger with the given options.
///
/// Transactions are validated, ordered by timestamp (ties keep input order),
/// and folded through one cost pool per symbol. The superficial-loss check
/// sees the whole input, so buys dated after a sale still count.
///
/// # Errors
///
/// Returns [`EngineError::InvalidTransaction`] for the first transaction that
/// fails validation and [`EngineError::Overflow`] when pool arithmetic or a
/// summary total leaves the range of `Decimal`. No partial ledger is produced.
pub fn compute_ledger_with(
    transactions: &[RawTransaction],
    options: &EngineOptions,
) -> Result<Ledger, EngineError> {
    let _span = debug_span!("compute_ledger", transactions = transactions.len()).entered();

    for txn in transactions {
        txn.validate()
            .map_err(|source| EngineError::InvalidTransaction {
                id: txn.id.clone(),
                source,
            })?;
    }

    let ordered = sort_transactions(transactions);
    let repurchases = RepurchaseIndex::build(ordered.iter().copied());
    let mut tracker = CostPoolTracker::new(options, &repurchases);

    let entries = ordered
        .into_iter()
        .map(|txn| {
            tracker.apply(txn).map_err(|_| EngineError::Overflow {
                id: txn.id.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(entry) = aggregate::first_unsummable(&entries) {
        return Err(EngineError::Overflow {
            id: entry.transaction.id.clone(),
        });
    }
    Ok(Ledger::from_entries(entries))
}
