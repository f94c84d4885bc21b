//! Divergence loss detection for the yield pool.
//!
//! A large yield-pool deposit with exactly zero accrued interest usually means
//! the deposited stablecoins were above peg at deposit time.

use crate::amount::NativeAmount;
use crate::consts::portal_consts::DIVERGENCE_THRESHOLD_UNITS;

/// Whole-unit balance a zero-interest yield deposit must exceed to be flagged.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DivergenceThreshold(u64);

impl DivergenceThreshold {
    pub fn new(units: u64) -> Self {
        Self(units)
    }

    pub fn units(&self) -> u64 {
        self.0
    }
}

impl Default for DivergenceThreshold {
    fn default() -> Self {
        Self(DIVERGENCE_THRESHOLD_UNITS)
    }
}

/// Returns `None` until both raw figures have resolved.
pub fn detect_divergence(
    yield_pool_raw_interest: Option<NativeAmount>,
    yield_pool_raw_balance: Option<NativeAmount>,
    threshold: DivergenceThreshold,
) -> Option<bool> {
    let interest = yield_pool_raw_interest?;
    let balance = yield_pool_raw_balance?;
    Some(interest.is_zero() && exceeds_units(balance, threshold.units()))
}

/// `balance / 10^18 > units`, compared exactly in fixed point.
fn exceeds_units(balance: NativeAmount, units: u64) -> bool {
    balance > NativeAmount::from_units(units)
}
