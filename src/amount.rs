//! Native fixed-point amounts, USD amounts and the normalization between them.

use crate::consts::portal_consts::{NATIVE_DECIMALS, WAD};
use crate::pool::{Pool, PoolUnit};
use alloy_primitives::U256;
use num_format::{Locale, ToFormattedString};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Largest mantissa a `Decimal` can hold (2^96 - 1).
const MAX_DECIMAL_MANTISSA: u128 = 79_228_162_514_264_337_593_543_950_335;

/// A contract violation on an amount. Never coerced to zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Malformed amount: {0:?}")]
    Malformed(String),

    #[error("Negative amount: {0}")]
    Negative(String),

    #[error("Amount overflow")]
    Overflow,
}

/// A raw balance, interest or rate figure: an unsigned integer at 18-decimal scale.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeAmount(U256);

impl NativeAmount {
    pub const ZERO: NativeAmount = NativeAmount(U256::ZERO);

    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// `units * 10^18`, convenient for whole-unit figures.
    pub fn from_units(units: u64) -> Self {
        Self(U256::from(units) * U256::from(WAD))
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for NativeAmount {
    type Err = AmountError;

    /// Parses a base-10 unsigned integer string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(AmountError::Negative(trimmed.to_string()));
        }
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(AmountError::Malformed(s.to_string()));
        }
        U256::from_str_radix(trimmed, 10)
            .map(NativeAmount)
            .map_err(|_| AmountError::Malformed(s.to_string()))
    }
}

impl Display for NativeAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative USD value, summable across pools.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UsdAmount(Decimal);

impl UsdAmount {
    pub const ZERO: UsdAmount = UsdAmount(Decimal::ZERO);

    /// Decimal-converts an 18-decimal fixed-point USD figure.
    pub fn from_native(amount: NativeAmount) -> Result<Self, AmountError> {
        fixed_to_decimal(amount.raw(), NATIVE_DECIMALS).map(UsdAmount)
    }

    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value.to_string()));
        }
        Ok(UsdAmount(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `self + rhs`, or [`AmountError::Overflow`] past the largest representable value.
    pub fn checked_add(self, rhs: Self) -> Result<Self, AmountError> {
        self.0
            .checked_add(rhs.0)
            .map(UsdAmount)
            .ok_or(AmountError::Overflow)
    }

    /// Formats as `$1,234.56`.
    pub fn format_usd(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let fixed = format!("{:.2}", rounded);
        let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        let whole = whole
            .parse::<u128>()
            .map(|w| w.to_formatted_string(&Locale::en))
            .unwrap_or_else(|_| whole.to_string());
        format!("${}.{}", whole, cents)
    }
}

/// Adds up USD amounts, failing instead of overflowing.
pub fn checked_sum<I>(amounts: I) -> Result<UsdAmount, AmountError>
where
    I: IntoIterator<Item = Result<UsdAmount, AmountError>>,
{
    amounts
        .into_iter()
        .try_fold(UsdAmount::ZERO, |total, amount| total.checked_add(amount?))
}

impl Display for UsdAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_usd())
    }
}

/// Converts a native amount from `pool` into USD.
///
/// USD-pegged pools are decimal-converted as is. Ether amounts are first
/// multiplied by `eth_usd_rate` (an 18-decimal ratio): `amount * rate / 10^18`.
pub fn normalize(
    amount: NativeAmount,
    pool: Pool,
    eth_usd_rate: NativeAmount,
) -> Result<UsdAmount, AmountError> {
    let usd_raw = match pool.unit() {
        PoolUnit::Usd => amount.raw(),
        PoolUnit::Eth => {
            amount
                .raw()
                .checked_mul(eth_usd_rate.raw())
                .ok_or(AmountError::Overflow)?
                / U256::from(WAD)
        }
    };
    UsdAmount::from_native(NativeAmount(usd_raw))
}

/// Turns `raw / 10^scale` into a `Decimal`, dropping trailing precision only
/// when the mantissa does not fit.
fn fixed_to_decimal(raw: U256, scale: u32) -> Result<Decimal, AmountError> {
    let max = U256::from(MAX_DECIMAL_MANTISSA);
    let ten = U256::from(10u8);
    let mut mantissa = raw;
    let mut scale = scale;

    while mantissa > max {
        if scale == 0 {
            return Err(AmountError::Overflow);
        }
        mantissa /= ten;
        scale -= 1;
    }

    let mantissa = u128::try_from(mantissa).map_err(|_| AmountError::Overflow)?;
    let mantissa = i128::try_from(mantissa).map_err(|_| AmountError::Overflow)?;
    Ok(Decimal::from_i128_with_scale(mantissa, scale).normalize())
}
