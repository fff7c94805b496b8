//! Raw transaction types.
//!
//! A [`RawTransaction`] is one immutable buy, sell, or split event as it
//! arrives from an importer or from manual entry. Transactions are never
//! modified by the engine; the engine folds an ordered view of them into
//! [`LedgerEntry`](crate::LedgerEntry) records.
//!
//! Timestamps are [`NaiveDateTime`] values interpreted as the wall-clock time
//! the broker reported. Year bucketing and window arithmetic both operate on
//! that wall-clock value, so a trade reported at `2024-12-31 23:30` always
//! belongs to 2024 regardless of the machine's time zone.

use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The kind of event a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// An acquisition. Adds shares and cost to the pool.
    Buy,
    /// A disposal. Releases a proportional share of the pool.
    Sell,
    /// A share-count adjustment. `quantity` is a signed delta; cost is unchanged.
    Split,
}

impl TransactionKind {
    /// The upper-case tag used in files and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Split => "SPLIT",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            "SPLIT" => Ok(Self::Split),
            _ => Err(format!("unknown transaction kind: {s}")),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a transaction is rejected before it reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The transaction has no identifier.
    #[error("transaction id is empty")]
    EmptyId,
    /// The transaction has no instrument symbol.
    #[error("symbol is empty")]
    EmptySymbol,
    /// The transaction has no native currency code.
    #[error("currency is empty")]
    EmptyCurrency,
    /// A buy or sell with a zero or negative quantity.
    #[error("{kind} quantity must be positive, got {quantity}")]
    NonPositiveQuantity {
        /// Kind of the offending transaction.
        kind: TransactionKind,
        /// The quantity found.
        quantity: Decimal,
    },
    /// A split that changes nothing.
    #[error("split quantity must not be zero")]
    ZeroSplit,
    /// A negative unit price.
    #[error("price must not be negative, got {0}")]
    NegativePrice(Decimal),
    /// A negative commission.
    #[error("commission must not be negative, got {0}")]
    NegativeCommission(Decimal),
    /// A zero or negative exchange rate.
    #[error("exchange rate must be positive, got {0}")]
    NonPositiveFxRate(Decimal),
    /// The cost or proceeds of the transaction cannot be represented.
    #[error("amount of {quantity} x {price} at {fx_rate} is out of range")]
    AmountOutOfRange {
        /// The quantity found.
        quantity: Decimal,
        /// The unit price found.
        price: Decimal,
        /// The exchange rate found.
        fx_rate: Decimal,
    },
}

/// One buy, sell, or split event on an instrument.
///
/// The JSON shape matches the persisted transaction book: camelCase keys,
/// `type` for the kind and `dateTime` for the timestamp.
///
/// # Examples
///
/// ```
/// use acbledger_core::{RawTransaction, TransactionKind};
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
///
/// let at = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
/// let txn = RawTransaction::buy("AAPL", at, dec!(10), dec!(150))
///     .with_commission(dec!(1))
///     .with_fx_rate(dec!(1.35));
///
/// assert_eq!(txn.kind, TransactionKind::Buy);
/// assert_eq!(txn.native_cost(), dec!(1501));
/// assert_eq!(txn.home_cost(), dec!(2026.35));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    /// Unique identifier within the transaction book.
    pub id: String,
    /// Instrument symbol (e.g. `AAPL`, `SHOP.TO`).
    pub symbol: String,
    /// Native currency code of the instrument.
    pub currency: String,
    /// Wall-clock time of the event.
    #[serde(rename = "dateTime", with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    /// What happened.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Share count for buys and sells, signed delta for splits.
    pub quantity: Decimal,
    /// Unit price in native currency. Zero for splits.
    pub price: Decimal,
    /// Commission in native currency.
    #[serde(default)]
    pub commission: Decimal,
    /// Home-currency value of one native-currency unit.
    #[serde(default = "default_fx_rate")]
    pub fx_rate: Decimal,
    /// Free-form note, e.g. the corporate-action description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

const fn default_fx_rate() -> Decimal {
    Decimal::ONE
}

impl RawTransaction {
    /// Create a transaction with no commission, an fx rate of 1 and a `USD` currency.
    ///
    /// The id is derived from the kind, symbol and timestamp; use
    /// [`with_id`](Self::with_id) when the caller owns identifiers.
    #[must_use]
    pub fn new(
        kind: TransactionKind,
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        let symbol = symbol.into();
        let id = format!(
            "{}-{}-{}",
            kind.as_str().to_lowercase(),
            symbol,
            timestamp.format("%Y%m%d%H%M%S")
        );
        Self {
            id,
            symbol,
            currency: "USD".to_string(),
            timestamp,
            kind,
            quantity,
            price,
            commission: Decimal::ZERO,
            fx_rate: Decimal::ONE,
            description: None,
        }
    }

    /// Create a buy.
    #[must_use]
    pub fn buy(
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self::new(TransactionKind::Buy, symbol, timestamp, quantity, price)
    }

    /// Create a sell.
    #[must_use]
    pub fn sell(
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self::new(TransactionKind::Sell, symbol, timestamp, quantity, price)
    }

    /// Create a split adding `delta` shares (negative for a consolidation).
    #[must_use]
    pub fn split(symbol: impl Into<String>, timestamp: NaiveDateTime, delta: Decimal) -> Self {
        Self::new(TransactionKind::Split, symbol, timestamp, delta, Decimal::ZERO)
    }

    /// Set the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the native currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the commission.
    #[must_use]
    pub fn with_commission(mut self, commission: Decimal) -> Self {
        self.commission = commission;
        self
    }

    /// Set the exchange rate.
    #[must_use]
    pub fn with_fx_rate(mut self, fx_rate: Decimal) -> Self {
        self.fx_rate = fx_rate;
        self
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Calendar year of the timestamp.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    /// Quantity times price, in native currency.
    ///
    /// The unchecked money helpers cannot overflow on a transaction that
    /// passed [`validate`](Self::validate).
    #[must_use]
    pub fn gross_native(&self) -> Decimal {
        self.quantity * self.price
    }

    /// Native-currency cost of an acquisition, commission included.
    #[must_use]
    pub fn native_cost(&self) -> Decimal {
        self.gross_native() + self.commission
    }

    /// Home-currency cost of an acquisition, commission included.
    #[must_use]
    pub fn home_cost(&self) -> Decimal {
        self.gross_native() * self.fx_rate + self.commission * self.fx_rate
    }

    /// Home-currency proceeds of a disposal, net of commission.
    #[must_use]
    pub fn home_proceeds(&self) -> Decimal {
        self.gross_native() * self.fx_rate - self.commission * self.fx_rate
    }

    /// [`native_cost`](Self::native_cost), or `None` on overflow.
    #[must_use]
    pub fn checked_native_cost(&self) -> Option<Decimal> {
        self.quantity
            .checked_mul(self.price)?
            .checked_add(self.commission)
    }

    /// [`home_cost`](Self::home_cost), or `None` on overflow.
    #[must_use]
    pub fn checked_home_cost(&self) -> Option<Decimal> {
        let gross = self.quantity.checked_mul(self.price)?.checked_mul(self.fx_rate)?;
        let commission = self.commission.checked_mul(self.fx_rate)?;
        gross.checked_add(commission)
    }

    /// Whether the trade was converted at a rate other than 1.
    #[must_use]
    pub fn is_foreign(&self) -> bool {
        self.fx_rate != Decimal::ONE
    }

    /// Check the fields the engine relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if self.currency.trim().is_empty() {
            return Err(ValidationError::EmptyCurrency);
        }
        match self.kind {
            TransactionKind::Buy | TransactionKind::Sell => {
                if self.quantity <= Decimal::ZERO {
                    return Err(ValidationError::NonPositiveQuantity {
                        kind: self.kind,
                        quantity: self.quantity,
                    });
                }
            }
            TransactionKind::Split => {
                if self.quantity.is_zero() {
                    return Err(ValidationError::ZeroSplit);
                }
            }
        }
        if self.price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice(self.price));
        }
        if self.commission < Decimal::ZERO {
            return Err(ValidationError::NegativeCommission(self.commission));
        }
        if self.fx_rate <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveFxRate(self.fx_rate));
        }
        if self.checked_home_cost().is_none() || self.checked_native_cost().is_none() {
            return Err(ValidationError::AmountOutOfRange {
                quantity: self.quantity,
                price: self.price,
                fx_rate: self.fx_rate,
            });
        }
        Ok(())
    }
}

impl fmt::Display for RawTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind,
            self.quantity,
            self.symbol
        )?;
        if self.kind != TransactionKind::Split {
            write!(f, " @ {} {}", self.price, self.currency)?;
        }
        Ok(())
    }
}

/// Order transactions for processing.
///
/// Ascending by timestamp. This is a stable sort, so transactions with the
/// same timestamp keep their input order.
pub fn sort_transactions(transactions: &[RawTransaction]) -> Vec<&RawTransaction> {
    let mut ordered: Vec<&RawTransaction> = transactions.iter().collect();
    ordered.sort_by_key(|txn| txn.timestamp);
    ordered
}

/// Text form of timestamps in the transaction book.
///
/// Written as `YYYY-MM-DDTHH:MM:SS[.fff]`. Reading also accepts RFC 3339
/// values with an offset; the wall-clock time in that offset is kept.
pub mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    /// Serialize a timestamp.
    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    /// Deserialize a timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(serde::de::Error::custom)
    }

    /// Parse the accepted timestamp forms.
    pub fn parse(text: &str) -> Result<NaiveDateTime, String> {
        let text = text.trim();
        if let Ok(value) = NaiveDateTime::parse_from_str(text, FORMAT) {
            return Ok(value);
        }
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.naive_local())
            .map_err(|e| format!("invalid timestamp '{text}': {e}"))
    }
}
