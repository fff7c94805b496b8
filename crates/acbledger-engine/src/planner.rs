//! Tax-loss harvest planning.
//!
//! Given current positions and a target price per symbol, the planner shows
//! what a full disposal at that price would realize and, for positions under
//! water, how many shares would have to be sold to offset the year's net
//! realized gain. It works on position summaries only and never touches the
//! ledger.

use acbledger_core::{Decimal, PositionSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Slack allowed when judging a full offset.
const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Errors from building a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A target price was zero or negative.
    #[error("target price for {symbol} must be positive, got {price}")]
    NonPositivePrice {
        /// Symbol the price was given for.
        symbol: String,
        /// The rejected price.
        price: Decimal,
    },
    /// An fx override was zero or negative.
    #[error("fx rate for {currency} must be positive, got {rate}")]
    NonPositiveFxRate {
        /// Currency the rate was given for.
        currency: String,
        /// The rejected rate.
        rate: Decimal,
    },
    /// A target price was given for a symbol with no open position.
    #[error("no open position in {0}")]
    UnknownSymbol(String),
    /// The simulated figures for a symbol left the range of `Decimal`.
    #[error("simulated amounts for {0} are out of range")]
    Overflow(String),
}

/// A full disposal of one position at its target price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedDisposal {
    /// Instrument symbol.
    pub symbol: String,
    /// Shares that would be sold.
    pub shares: Decimal,
    /// Target price in native currency.
    pub target_price: Decimal,
    /// Fx rate used to convert the target price.
    pub fx_rate: Decimal,
    /// Home-currency proceeds.
    pub proceeds: Decimal,
    /// Home-currency gain (positive) or loss (negative).
    pub gain_loss: Decimal,
}

/// A position whose target price is below its cost per share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestCandidate {
    /// Instrument symbol.
    pub symbol: String,
    /// Home-currency loss per share at the target price (negative).
    pub unrealized_per_share: Decimal,
    /// Shares to sell to offset the net realized gain; zero when there is nothing to offset.
    pub suggested_shares: Decimal,
    /// Loss that selling the suggested shares would realize.
    pub predicted_deduction: Decimal,
    /// Fx rate used to convert the target price.
    pub fx_rate: Decimal,
    /// Whether the predicted deduction covers the net realized gain.
    pub full_offset: bool,
}

/// Output of [`HarvestPlanner::plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestPlan {
    /// Net realized gain or loss the plan tries to offset.
    pub net_realized: Decimal,
    /// One row per position with a target price, sorted by symbol.
    pub disposals: Vec<SimulatedDisposal>,
    /// Positions under water at their target price, sorted by symbol.
    pub candidates: Vec<HarvestCandidate>,
}

/// Target prices and fx overrides for a plan.
///
/// # Examples
///
/// ```
/// use acbledger_core::PositionSummary;
/// use acbledger_engine::HarvestPlanner;
/// use rust_decimal_macros::dec;
///
/// let position = PositionSummary {
///     symbol: "XYZ".into(),
///     shares: dec!(100),
///     cost_pool: dec!(1000),
///     native_cost: dec!(1000),
///     currency: "CAD".into(),
///     cost_per_share: dec!(10),
///     foreign: false,
///     last_fx_rate: dec!(1),
/// };
///
/// let plan = HarvestPlanner::new("CAD")
///     .with_price("XYZ", dec!(6))
///     .plan(&[position], dec!(100))
///     .unwrap();
/// assert_eq!(plan.candidates[0].suggested_shares, dec!(25));
/// assert!(plan.candidates[0].full_offset);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestPlanner {
    home_currency: String,
    prices: BTreeMap<String, Decimal>,
    fx_rates: BTreeMap<String, Decimal>,
}

impl HarvestPlanner {
    /// A planner reporting in `home_currency`.
    #[must_use]
    pub fn new(home_currency: impl Into<String>) -> Self {
        Self {
            home_currency: home_currency.into(),
            ..Self::default()
        }
    }

    /// Set the native target price for `symbol`.
    #[must_use]
    pub fn with_price(mut self, symbol: impl Into<String>, price: Decimal) -> Self {
        self.prices.insert(symbol.into(), price);
        self
    }

    /// Use `rate` for every position in `currency` instead of its last fx rate.
    #[must_use]
    pub fn with_fx_rate(mut self, currency: impl Into<String>, rate: Decimal) -> Self {
        self.fx_rates.insert(currency.into(), rate);
        self
    }

    /// Rate that converts `position`'s native price to home currency.
    fn fx_for(&self, position: &PositionSummary) -> Decimal {
        if position.currency == self.home_currency {
            return Decimal::ONE;
        }
        self.fx_rates
            .get(&position.currency)
            .copied()
            .unwrap_or(position.last_fx_rate)
    }

    fn validate(&self, positions: &[PositionSummary]) -> Result<(), PlanError> {
        for (currency, rate) in &self.fx_rates {
            if *rate <= Decimal::ZERO {
                return Err(PlanError::NonPositiveFxRate {
                    currency: currency.clone(),
                    rate: *rate,
                });
            }
        }
        for (symbol, price) in &self.prices {
            if *price <= Decimal::ZERO {
                return Err(PlanError::NonPositivePrice {
                    symbol: symbol.clone(),
                    price: *price,
                });
            }
            if !positions.iter().any(|p| &p.symbol == symbol) {
                return Err(PlanError::UnknownSymbol(symbol.clone()));
            }
        }
        Ok(())
    }

    /// Full disposal of `position` at `target_price`, plus a harvest
    /// candidate when that price is below cost. `None` on overflow.
    fn simulate(
        &self,
        position: &PositionSummary,
        target_price: Decimal,
        net_realized: Decimal,
    ) -> Option<(SimulatedDisposal, Option<HarvestCandidate>)> {
        let fx_rate = self.fx_for(position);
        let home_price = target_price.checked_mul(fx_rate)?;
        let proceeds = position.shares.checked_mul(home_price)?;
        let disposal = SimulatedDisposal {
            symbol: position.symbol.clone(),
            shares: position.shares,
            target_price,
            fx_rate,
            proceeds,
            gain_loss: proceeds.checked_sub(position.cost_pool)?,
        };

        let per_share = home_price.checked_sub(position.cost_per_share)?;
        if per_share >= Decimal::ZERO {
            return Some((disposal, None));
        }

        let (suggested_shares, predicted_deduction) = if net_realized > Decimal::ZERO {
            let needed = net_realized.checked_div(per_share)?.abs().ceil();
            let shares = needed.min(position.shares);
            (shares, shares.checked_mul(per_share)?.abs())
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        let candidate = HarvestCandidate {
            symbol: position.symbol.clone(),
            unrealized_per_share: per_share,
            suggested_shares,
            predicted_deduction,
            fx_rate,
            full_offset: predicted_deduction >= net_realized.saturating_sub(CENT),
        };
        Some((disposal, Some(candidate)))
    }

    /// Build the plan against `positions` and the year's `net_realized` figure.
    ///
    /// # Errors
    ///
    /// Fails if a price or fx rate is not positive, a price names a symbol
    /// with no open position, or a simulated figure overflows.
    pub fn plan(
        &self,
        positions: &[PositionSummary],
        net_realized: Decimal,
    ) -> Result<HarvestPlan, PlanError> {
        self.validate(positions)?;

        let mut disposals = Vec::new();
        let mut candidates = Vec::new();
        for position in positions {
            let Some(&target_price) = self.prices.get(&position.symbol) else {
                continue;
            };
            let (disposal, candidate) = self
                .simulate(position, target_price, net_realized)
                .ok_or_else(|| PlanError::Overflow(position.symbol.clone()))?;
            disposals.push(disposal);
            candidates.extend(candidate);
        }

        disposals.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        candidates.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        Ok(HarvestPlan {
            net_realized,
            disposals,
            candidates,
        })
    }
}
