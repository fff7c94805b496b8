//! Cost-pool state for a single instrument.
//!
//! A [`PoolState`] is the running average-cost accumulator for one symbol:
//! how many shares are held, what they cost in home currency, and what they
//! cost in the instrument's native currency. The engine carries one
//! `PoolState` per symbol through the fold and snapshots it before and after
//! every event.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Share counts with a magnitude below this are treated as zero.
pub const ZERO_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// A pool figure left the range of [`Decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cost pool arithmetic overflowed")]
pub struct PoolOverflow;

/// Cost released from a pool by a disposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Release {
    /// Home-currency cost released.
    pub cost_pool: Decimal,
    /// Native-currency cost released.
    pub native_cost: Decimal,
}

/// Running cost pool of one instrument.
///
/// # Examples
///
/// ```
/// use acbledger_core::PoolState;
/// use rust_decimal_macros::dec;
///
/// let mut pool = PoolState::default();
/// pool.acquire(dec!(100), dec!(1000), dec!(1000)).unwrap();
/// assert_eq!(pool.cost_per_share(), dec!(10));
///
/// let released = pool.dispose(dec!(25)).unwrap().unwrap();
/// assert_eq!(released.cost_pool, dec!(250));
/// assert_eq!(pool.shares, dec!(75));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolState {
    /// Shares held.
    pub shares: Decimal,
    /// Aggregate home-currency cost of the shares held.
    pub cost_pool: Decimal,
    /// Aggregate native-currency cost of the shares held.
    pub native_cost: Decimal,
}

impl PoolState {
    /// An empty pool.
    pub const EMPTY: Self = Self {
        shares: Decimal::ZERO,
        cost_pool: Decimal::ZERO,
        native_cost: Decimal::ZERO,
    };

    /// Create a pool from its three figures.
    #[must_use]
    pub const fn new(shares: Decimal, cost_pool: Decimal, native_cost: Decimal) -> Self {
        Self {
            shares,
            cost_pool,
            native_cost,
        }
    }

    /// Whether no shares are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shares.is_zero()
    }

    /// Home-currency cost per share, or zero when no shares are held.
    #[must_use]
    pub fn cost_per_share(&self) -> Decimal {
        if self.shares > Decimal::ZERO {
            self.cost_pool / self.shares
        } else {
            Decimal::ZERO
        }
    }

    /// Add shares bought for the given home and native costs.
    ///
    /// The pool is unchanged when the result would overflow.
    pub fn acquire(
        &mut self,
        quantity: Decimal,
        home_cost: Decimal,
        native_cost: Decimal,
    ) -> Result<(), PoolOverflow> {
        *self = Self {
            shares: self.shares.checked_add(quantity).ok_or(PoolOverflow)?,
            cost_pool: self.cost_pool.checked_add(home_cost).ok_or(PoolOverflow)?,
            native_cost: self.native_cost.checked_add(native_cost).ok_or(PoolOverflow)?,
        };
        Ok(())
    }

    /// Remove `quantity` shares and release their proportional cost.
    ///
    /// Returns `Ok(None)` and leaves the pool untouched when no shares are
    /// held, since there is no ratio to release by.
    pub fn dispose(&mut self, quantity: Decimal) -> Result<Option<Release>, PoolOverflow> {
        if self.shares <= Decimal::ZERO {
            return Ok(None);
        }
        let ratio = quantity.checked_div(self.shares).ok_or(PoolOverflow)?;
        let release = Release {
            cost_pool: ratio.checked_mul(self.cost_pool).ok_or(PoolOverflow)?,
            native_cost: ratio.checked_mul(self.native_cost).ok_or(PoolOverflow)?,
        };
        *self = Self {
            shares: self.shares.checked_sub(quantity).ok_or(PoolOverflow)?,
            cost_pool: self.cost_pool.checked_sub(release.cost_pool).ok_or(PoolOverflow)?,
            native_cost: self
                .native_cost
                .checked_sub(release.native_cost)
                .ok_or(PoolOverflow)?,
        };
        Ok(Some(release))
    }

    /// Change the share count without touching cost.
    pub fn adjust_shares(&mut self, delta: Decimal) -> Result<(), PoolOverflow> {
        self.shares = self.shares.checked_add(delta).ok_or(PoolOverflow)?;
        Ok(())
    }

    /// Add to the home-currency cost without changing the share count.
    pub fn add_cost(&mut self, amount: Decimal) -> Result<(), PoolOverflow> {
        self.cost_pool = self.cost_pool.checked_add(amount).ok_or(PoolOverflow)?;
        Ok(())
    }

    /// Reset all figures to exactly zero when the share count is within `tolerance` of zero.
    ///
    /// Returns `true` if the pool was reset.
    pub fn normalize(&mut self, tolerance: Decimal) -> bool {
        if self.shares.abs() < tolerance {
            *self = Self::EMPTY;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sh / {} pool / {} native",
            self.shares.normalize(),
            self.cost_pool.round_dp(2),
            self.native_cost.round_dp(2)
        )
    }
}
