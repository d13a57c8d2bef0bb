//! Slippage guard: reference price + tolerance → minimum acceptable output.
//!
//! Rounding: every intermediate step rounds **up**. The returned bound is
//! therefore never below the exact rational bound
//! `expected_out * (10_000 - tolerance) / 10_000`, so truncation can never
//! let a swap through at a price worse than the tolerance allows. The cost is
//! that a swap landing exactly on the bound may be rejected by one wei.

use alloy_primitives::{Address, U160, U256};
use serde::{Deserialize, Serialize};

use crate::constants::{BPS_DENOMINATOR, MAX_SLIPPAGE_BPS, Q96};
use crate::error::{LiquidError, Result};
use crate::math::{mul_div_rounding_up, sqrt_price_to_u256};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Tolerance plus the quoter that supplies the reference output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageConfig {
    pub tolerance_bps: u16,
    pub quoter:        Option<Address>,
}

impl SlippageConfig {
    pub fn new(tolerance_bps: u16, quoter: Option<Address>) -> Result<Self> {
        let config = Self { tolerance_bps, quoter };
        config.validate()?;
        Ok(config)
    }

    /// Tolerance is capped, and a non-zero tolerance needs a real quoter.
    pub fn validate(&self) -> Result<()> {
        validate_tolerance(self.tolerance_bps)?;
        let has_quoter = matches!(self.quoter, Some(q) if q != Address::ZERO);
        if self.tolerance_bps > 0 && !has_quoter {
            return Err(LiquidError::QuoterRequired);
        }
        Ok(())
    }

    /// Protection is off when the tolerance is zero.
    pub fn is_protected(&self) -> bool {
        self.tolerance_bps > 0
    }
}

pub fn validate_tolerance(tolerance_bps: u16) -> Result<()> {
    if tolerance_bps > MAX_SLIPPAGE_BPS {
        return Err(LiquidError::ToleranceTooHigh(tolerance_bps));
    }
    Ok(())
}

// ─── Bounds ───────────────────────────────────────────────────────────────────

/// Output implied by a Q64.96 sqrt price, rounded up.
///
/// `price = (sqrt_price / 2^96)^2` is token1 per token0, so a zero-for-one
/// swap yields `amount * price` and one-for-zero yields `amount / price`.
pub fn expected_amount_out(sqrt_price_x96: U160, amount_in: U256, zero_for_one: bool) -> Result<U256> {
    let sqrt_price = sqrt_price_to_u256(sqrt_price_x96);
    if sqrt_price.is_zero() {
        return Err(LiquidError::ZeroPrice);
    }
    if zero_for_one {
        let half = mul_div_rounding_up(amount_in, sqrt_price, Q96)?;
        mul_div_rounding_up(half, sqrt_price, Q96)
    } else {
        let half = mul_div_rounding_up(amount_in, Q96, sqrt_price)?;
        mul_div_rounding_up(half, Q96, sqrt_price)
    }
}

/// Shave `tolerance_bps` off a reference output, rounding up.
///
/// A zero tolerance returns zero: the caller opted out of protection.
pub fn min_amount_out_from_quote(quoted_out: U256, tolerance_bps: u16) -> Result<U256> {
    if tolerance_bps == 0 {
        return Ok(U256::ZERO);
    }
    debug_assert!(tolerance_bps <= BPS_DENOMINATOR);
    let keep = BPS_DENOMINATOR.saturating_sub(tolerance_bps);
    mul_div_rounding_up(quoted_out, U256::from(keep), U256::from(BPS_DENOMINATOR))
}

/// Minimum acceptable output for swapping `amount_in` at a reference sqrt
/// price with `tolerance_bps` of slack.
pub fn min_amount_out(
    sqrt_price_x96: U160,
    amount_in: U256,
    tolerance_bps: u16,
    zero_for_one: bool,
) -> Result<U256> {
    if tolerance_bps == 0 {
        return Ok(U256::ZERO);
    }
    let expected = expected_amount_out(sqrt_price_x96, amount_in, zero_for_one)?;
    min_amount_out_from_quote(expected, tolerance_bps)
}
