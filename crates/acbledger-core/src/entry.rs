//! Ledger entries produced by the engine.

use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PoolState, RawTransaction, TransactionKind};

/// One computed ledger row.
///
/// A `LedgerEntry` pairs the originating transaction with the instrument's
/// pool before and after it, plus the realized gain or loss the event
/// produced. Entries are created once by the engine and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// The transaction this entry was computed from.
    #[serde(flatten)]
    pub transaction: RawTransaction,
    /// Pool before the event.
    pub before: PoolState,
    /// Pool after the event, including any superficial-loss adjustment.
    pub after: PoolState,
    /// Home-currency cost per share after the event.
    pub cost_per_share: Decimal,
    /// Realized gain (positive) or loss (negative) in home currency.
    pub realized_gain_loss: Decimal,
    /// Whether a loss on this disposal was denied as superficial.
    pub superficial: bool,
    /// Loss magnitude added back to the pool when `superficial` is set.
    pub denied_loss: Decimal,
}

impl LedgerEntry {
    /// Instrument symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.transaction.symbol
    }

    /// Event timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.transaction.timestamp
    }

    /// Calendar year the entry is reported in.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.transaction.timestamp.year()
    }

    /// Event kind.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.transaction.kind
    }

    /// Whether this entry is a sell.
    #[must_use]
    pub fn is_disposal(&self) -> bool {
        self.transaction.kind == TransactionKind::Sell
    }

    /// Home-currency proceeds of a disposal; zero for other kinds.
    #[must_use]
    pub fn proceeds(&self) -> Decimal {
        if self.is_disposal() {
            self.transaction.home_proceeds()
        } else {
            Decimal::ZERO
        }
    }

    /// Cost released by a disposal, as reported against its proceeds.
    ///
    /// For a superficial disposal this is the cost that makes the reported
    /// gain zero, i.e. the proceeds themselves.
    #[must_use]
    pub fn cost_of_disposal(&self) -> Decimal {
        if self.is_disposal() {
            self.proceeds() - self.realized_gain_loss
        } else {
            Decimal::ZERO
        }
    }
}
