//! Full-precision integer math.
//!
//! Products are taken in 512 bits so `a * b / d` never overflows before the
//! division; only a quotient that does not fit 256 bits is an error.

use alloy_primitives::{U160, U256, U512};

use crate::error::{LiquidError, Result};

fn widen(x: U256) -> U512 {
    let l = x.as_limbs();
    U512::from_limbs([l[0], l[1], l[2], l[3], 0, 0, 0, 0])
}

fn narrow(x: U512) -> Result<U256> {
    let l = x.as_limbs();
    if l[4..].iter().any(|&w| w != 0) {
        return Err(LiquidError::MathOverflow);
    }
    Ok(U256::from_limbs([l[0], l[1], l[2], l[3]]))
}

/// `floor(a * b / d)`
pub fn mul_div(a: U256, b: U256, d: U256) -> Result<U256> {
    if d.is_zero() {
        return Err(LiquidError::MathOverflow);
    }
    narrow(widen(a) * widen(b) / widen(d))
}

/// `ceil(a * b / d)`
pub fn mul_div_rounding_up(a: U256, b: U256, d: U256) -> Result<U256> {
    if d.is_zero() {
        return Err(LiquidError::MathOverflow);
    }
    let product = widen(a) * widen(b);
    let d = widen(d);
    let q = product / d;
    if (product % d).is_zero() {
        narrow(q)
    } else {
        narrow(q + U512::from(1u64))
    }
}

/// `floor(amount * bps / 10_000)`
pub fn apply_bps(amount: U256, bps: u16) -> Result<U256> {
    mul_div(amount, U256::from(bps), U256::from(crate::constants::BPS_DENOMINATOR))
}

pub fn sqrt_price_to_u256(sqrt_price_x96: U160) -> U256 {
    let l = sqrt_price_x96.as_limbs();
    U256::from_limbs([l[0], l[1], l[2], 0])
}

pub fn u256_to_sqrt_price(x: U256) -> Result<U160> {
    let l = x.as_limbs();
    if l[3] != 0 || l[2] >> 32 != 0 {
        return Err(LiquidError::MathOverflow);
    }
    Ok(U160::from_limbs([l[0], l[1], l[2]]))
}

// ─── Integer square root (Babylonian method) ──────────────────────────────
pub fn isqrt(n: U256) -> U256 {
    if n.is_zero() {
        return U256::ZERO;
    }
    let one = U256::from(1u64);
    let mut x = n;
    let mut y = (x >> 1) + (x & one);
    while y < x {
        x = y;
        y = (y + n / y) >> 1;
    }
    x
}
