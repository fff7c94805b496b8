//! Engine options.

use acbledger_core::ZERO_TOLERANCE;
use rust_decimal::Decimal;

/// Default superficial-loss window, in calendar days either side of a sale.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Knobs for a ledger computation.
///
/// The defaults reproduce the standard rule: a ±30 day window and a
/// one-millionth-of-a-share zero tolerance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Days before and after a losing sale in which a repurchase makes the loss superficial.
    pub superficial_window_days: u32,
    /// Share counts with a smaller magnitude reset the pool to zero.
    pub zero_tolerance: Decimal,
    /// Reporting currency. Only used to label output.
    pub home_currency: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            superficial_window_days: DEFAULT_WINDOW_DAYS,
            zero_tolerance: ZERO_TOLERANCE,
            home_currency: "CAD".to_string(),
        }
    }
}

impl EngineOptions {
    /// Set the superficial-loss window.
    #[must_use]
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.superficial_window_days = days;
        self
    }

    /// Set the zero tolerance.
    #[must_use]
    pub fn with_zero_tolerance(mut self, tolerance: Decimal) -> Self {
        self.zero_tolerance = tolerance;
        self
    }

    /// Set the home currency label.
    #[must_use]
    pub fn with_home_currency(mut self, currency: impl Into<String>) -> Self {
        self.home_currency = currency.into();
        self
    }
}
