//! Core types for acbledger
//!
//! This crate provides the data model shared by the engine, importers and
//! command-line tools:
//!
//! - [`RawTransaction`] - One buy, sell, or split event as imported
//! - [`TransactionKind`] - The exhaustive set of event kinds
//! - [`PoolState`] - The running cost pool of one instrument
//! - [`LedgerEntry`] - A transaction with its before/after pool and realized result
//! - [`PositionSummary`] - The current holding of one instrument
//! - [`TaxYearSummary`] - Realized gains and losses for one calendar year
//!
//! # Example
//!
//! ```
//! use acbledger_core::{PoolState, RawTransaction, TransactionKind, sort_transactions};
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(10, 0, 0).unwrap();
//! let txns = vec![
//!     RawTransaction::sell("AAPL", day(20), dec!(5), dec!(160)),
//!     RawTransaction::buy("AAPL", day(2), dec!(10), dec!(150)),
//! ];
//!
//! let mut pool = PoolState::default();
//! for txn in sort_transactions(&txns) {
//!     match txn.kind {
//!         TransactionKind::Buy => {
//!             pool.acquire(txn.quantity, txn.home_cost(), txn.native_cost()).unwrap();
//!         }
//!         TransactionKind::Sell => {
//!             pool.dispose(txn.quantity).unwrap();
//!         }
//!         TransactionKind::Split => {
//!             pool.adjust_shares(txn.quantity).unwrap();
//!         }
//!     }
//! }
//! assert_eq!(pool.shares, dec!(5));
//! assert_eq!(pool.cost_pool, dec!(750));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod entry;
pub mod format;
pub mod pool;
pub mod summary;
pub mod transaction;

pub use entry::LedgerEntry;
pub use format::{
    format_entry, format_money, format_positions, format_shares, format_tax_years, FormatConfig,
};
pub use pool::{PoolOverflow, PoolState, Release, ZERO_TOLERANCE};
pub use summary::{PositionSummary, TaxYearSummary};
pub use transaction::{sort_transactions, RawTransaction, TransactionKind, ValidationError};

// Re-export commonly used external types
pub use chrono::{NaiveDate, NaiveDateTime};
pub use rust_decimal::Decimal;
