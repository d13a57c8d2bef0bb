use alloy_primitives::{address, Address, U256};

/// Denominator for basis-point math
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Hard cap on any slippage tolerance: 10 %
pub const MAX_SLIPPAGE_BPS: u16 = 1_000;

/// Hard cap on the primary trade fee: 10 %
pub const MAX_TRADE_FEE_BPS: u16 = 1_000;

/// Pool LP fee denominator (v4 "pips": 1_000_000 = 100 %)
pub const FEE_PIPS_DENOMINATOR: u32 = 1_000_000;

/// Q64.96 fixed-point scale (2^96)
pub const Q96: U256 = U256::from_limbs([0, 1 << 32, 0, 0]);

/// 2^192, the scale of a squared Q64.96 price
pub const Q192: U256 = U256::from_limbs([0, 0, 0, 1]);

/// Native ETH is addressed as the zero address, the lowest canonical ordinal
pub const NATIVE_ETH: Address = Address::ZERO;

/// Conventional burn sink
pub const DEAD_ADDRESS: Address = address!("000000000000000000000000000000000000dEaD");

/// Default slippage tolerance for secondary conversions and burns: 3 %
pub const DEFAULT_SLIPPAGE_BPS: u16 = 300;

/// Default primary trade fee: 1 %
pub const DEFAULT_TRADE_FEE_BPS: u16 = 100;

/// Default share of the trade fee routed to the burn accumulator: 20 %
pub const DEFAULT_BURN_SHARE_BPS: u16 = 2_000;
