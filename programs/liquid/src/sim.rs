//! In-memory collaborators.
//!
//! Deterministic stand-ins for the AMM, the quoter, and the fee distributor.
//! The simulator binary and the test suites drive the protocol against these.

use std::collections::HashMap;

use alloy_primitives::{Address, U160, U256};

use crate::constants::{BPS_DENOMINATOR, FEE_PIPS_DENOMINATOR, Q192};
use crate::interfaces::{
    Distribution, DistributionError, FeeDistributor, FeesCollected, PoolError, PriceQuoter,
    QuoteError, SettlementPool, SwapError, SwapRequest,
};
use crate::math::{isqrt, mul_div, u256_to_sqrt_price};
use crate::pool_id::{PoolId, PoolKey};

// ─── Constant-product math ─────────────────────────────────────────────────

/// Output and fee of a constant-product swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapAmounts {
    /// LP fee taken from `amount_in` (stays with the LP, outside the curve).
    pub lp_fee:     U256,
    /// Portion of `amount_in` entering the x·y=k formula.
    pub after_fee:  U256,
    pub amount_out: U256,
}

/// `dy = y * dx_net / (x + dx_net)` with the LP fee taken from `dx` first.
pub fn constant_product_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_pips: u32,
) -> Result<SwapAmounts, SwapError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(SwapError::InsufficientLiquidity);
    }
    let overflow = |_| swap_overflow();
    let lp_fee = mul_div(amount_in, U256::from(fee_pips), U256::from(FEE_PIPS_DENOMINATOR))
        .map_err(overflow)?;
    let after_fee = amount_in - lp_fee; // lp_fee <= amount_in
    let denominator = reserve_in
        .checked_add(after_fee)
        .ok_or_else(swap_overflow)?;
    let amount_out = mul_div(reserve_out, after_fee, denominator).map_err(overflow)?;
    Ok(SwapAmounts { lp_fee, after_fee, amount_out })
}

fn swap_overflow() -> SwapError {
    SwapError::Reverted("math overflow".into())
}

/// Q64.96 sqrt price of `reserve1 / reserve0`.
pub fn sqrt_price_of(reserve0: U256, reserve1: U256) -> Option<U160> {
    if reserve0.is_zero() {
        return None;
    }
    let ratio_x192 = mul_div(reserve1, Q192, reserve0).ok()?;
    u256_to_sqrt_price(isqrt(ratio_x192)).ok()
}

// ─── MemoryPool ────────────────────────────────────────────────────────────

/// One x·y=k pool held by [`MemoryPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReserves {
    pub key:        PoolKey,
    pub reserve0:   U256,
    pub reserve1:   U256,
    /// Sole LP; every LP fee accrues to it.
    pub lp_owner:   Address,
    pub fees_owed0: U256,
    pub fees_owed1: U256,
}

impl PoolReserves {
    fn quote(&self, amount_in: U256, zero_for_one: bool) -> Result<SwapAmounts, SwapError> {
        let (reserve_in, reserve_out) = if zero_for_one {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        };
        constant_product_out(amount_in, reserve_in, reserve_out, self.key.fee)
    }
}

/// Pool manager hosting any number of constant-product pools.
#[derive(Debug, Clone)]
pub struct MemoryPool {
    address:      Address,
    pools:        HashMap<PoolId, PoolReserves>,
    swaps_revert: bool,
}

impl MemoryPool {
    pub fn new(address: Address) -> Self {
        Self { address, pools: HashMap::new(), swaps_revert: false }
    }

    pub fn initialize(&mut self, key: PoolKey, reserve0: U256, reserve1: U256, lp_owner: Address) {
        self.pools.insert(key.id(), PoolReserves {
            key,
            reserve0,
            reserve1,
            lp_owner,
            fees_owed0: U256::ZERO,
            fees_owed1: U256::ZERO,
        });
    }

    pub fn reserves(&self, key: &PoolKey) -> Option<&PoolReserves> {
        self.pools.get(&key.id())
    }

    /// Make every subsequent swap revert (or stop doing so).
    pub fn set_swaps_revert(&mut self, revert: bool) {
        self.swaps_revert = revert;
    }

    /// Credit LP fees directly, as if trades had happened.
    pub fn accrue_fees(&mut self, key: &PoolKey, amount0: U256, amount1: U256) -> Result<(), PoolError> {
        let pool = self.pools.get_mut(&key.id()).ok_or(PoolError::UnknownPool)?;
        let overflow = || PoolError::Reverted("fee overflow".into());
        let owed0 = pool.fees_owed0.checked_add(amount0).ok_or_else(overflow)?;
        let owed1 = pool.fees_owed1.checked_add(amount1).ok_or_else(overflow)?;
        pool.fees_owed0 = owed0;
        pool.fees_owed1 = owed1;
        Ok(())
    }

    /// Unguarded swap by a third party, moving the price.
    pub fn push_price(&mut self, key: &PoolKey, amount_in: U256, zero_for_one: bool) -> Result<U256, SwapError> {
        let request = SwapRequest {
            amount_in,
            min_amount_out:       U256::ZERO,
            zero_for_one,
            sqrt_price_limit_x96: None,
            recipient:            Address::ZERO,
        };
        self.execute(key, &request)
    }

    /// Quoter that answers as this pool would right now, frozen in time.
    pub fn snapshot_quoter(&self, key: &PoolKey) -> SimQuoter {
        match self.reserves(key) {
            Some(pool) => SimQuoter::Snapshot {
                pool:     key.id(),
                reserve0: pool.reserve0,
                reserve1: pool.reserve1,
                fee_pips: pool.key.fee,
            },
            None => SimQuoter::Reverting("unknown pool".into()),
        }
    }

    /// Snapshot quoters for every initialized pool.
    pub fn snapshot_book(&self) -> QuoteBook {
        let mut book = QuoteBook::default();
        for pool in self.pools.values() {
            book.insert(pool.key.id(), self.snapshot_quoter(&pool.key));
        }
        book
    }

    fn execute(&mut self, key: &PoolKey, request: &SwapRequest) -> Result<U256, SwapError> {
        let pool = self.pools.get_mut(&key.id()).ok_or(SwapError::UnknownPool)?;
        let amounts = pool.quote(request.amount_in, request.zero_for_one)?;
        if amounts.amount_out < request.min_amount_out {
            return Err(SwapError::SlippageExceeded {
                amount_out:     amounts.amount_out,
                min_amount_out: request.min_amount_out,
            });
        }
        if amounts.amount_out.is_zero() {
            return Err(SwapError::InsufficientLiquidity);
        }

        // amount_out < reserve_out, so only the inbound side can overflow
        let (reserve0, reserve1) = if request.zero_for_one {
            let reserve0 = pool.reserve0.checked_add(amounts.after_fee).ok_or_else(swap_overflow)?;
            (reserve0, pool.reserve1 - amounts.amount_out)
        } else {
            let reserve1 = pool.reserve1.checked_add(amounts.after_fee).ok_or_else(swap_overflow)?;
            (pool.reserve0 - amounts.amount_out, reserve1)
        };
        let (fees_owed0, fees_owed1) = if request.zero_for_one {
            (pool.fees_owed0.checked_add(amounts.lp_fee).ok_or_else(swap_overflow)?, pool.fees_owed1)
        } else {
            (pool.fees_owed0, pool.fees_owed1.checked_add(amounts.lp_fee).ok_or_else(swap_overflow)?)
        };
        if let Some(limit) = request.sqrt_price_limit_x96 {
            let next = sqrt_price_of(reserve0, reserve1).ok_or(SwapError::InsufficientLiquidity)?;
            // zero-for-one pushes the price down, one-for-zero pushes it up
            let crossed = if request.zero_for_one { next < limit } else { next > limit };
            if crossed {
                return Err(SwapError::PriceLimitReached);
            }
        }

        pool.reserve0 = reserve0;
        pool.reserve1 = reserve1;
        pool.fees_owed0 = fees_owed0;
        pool.fees_owed1 = fees_owed1;
        Ok(amounts.amount_out)
    }
}

impl SettlementPool for MemoryPool {
    fn address(&self) -> Address {
        self.address
    }

    fn swap(&mut self, pool: &PoolKey, request: &SwapRequest) -> Result<U256, SwapError> {
        if self.swaps_revert {
            return Err(SwapError::Reverted("swaps disabled".into()));
        }
        self.execute(pool, request)
    }

    fn current_sqrt_price(&self, pool: &PoolKey) -> Result<U160, PoolError> {
        let p = self.reserves(pool).ok_or(PoolError::UnknownPool)?;
        sqrt_price_of(p.reserve0, p.reserve1).ok_or(PoolError::Reverted("price out of range".into()))
    }

    fn collect_fees(&mut self, pool: &PoolKey, owner: Address) -> Result<FeesCollected, PoolError> {
        let p = self.pools.get_mut(&pool.id()).ok_or(PoolError::UnknownPool)?;
        if p.lp_owner != owner {
            return Ok(FeesCollected::default());
        }
        let collected = FeesCollected { amount0: p.fees_owed0, amount1: p.fees_owed1 };
        p.fees_owed0 = U256::ZERO;
        p.fees_owed1 = U256::ZERO;
        Ok(collected)
    }
}

// ─── SimQuoter ─────────────────────────────────────────────────────────────

/// Scriptable price quoter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimQuoter {
    /// Quotes from reserves recorded earlier; goes stale as the pool moves.
    Snapshot { pool: PoolId, reserve0: U256, reserve1: U256, fee_pips: u32 },
    /// Always answers the same amount.
    Fixed(U256),
    Reverting(String),
    Zero,
}

impl PriceQuoter for SimQuoter {
    fn quote(&self, pool: &PoolKey, amount_in: U256, zero_for_one: bool) -> Result<U256, QuoteError> {
        match self {
            SimQuoter::Snapshot { pool: id, reserve0, reserve1, fee_pips } => {
                if *id != pool.id() {
                    return Err(QuoteError::UnknownPool);
                }
                let (reserve_in, reserve_out) = if zero_for_one {
                    (*reserve0, *reserve1)
                } else {
                    (*reserve1, *reserve0)
                };
                constant_product_out(amount_in, reserve_in, reserve_out, *fee_pips)
                    .map(|a| a.amount_out)
                    .map_err(|e| QuoteError::Reverted(e.to_string()))
            }
            SimQuoter::Fixed(amount) => Ok(*amount),
            SimQuoter::Reverting(reason) => Err(QuoteError::Reverted(reason.clone())),
            SimQuoter::Zero => Ok(U256::ZERO),
        }
    }
}

/// One quoter per pool, for callers that trade against several pools.
#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    quotes: HashMap<PoolId, SimQuoter>,
}

impl QuoteBook {
    pub fn insert(&mut self, pool: PoolId, quoter: SimQuoter) {
        self.quotes.insert(pool, quoter);
    }
}

impl PriceQuoter for QuoteBook {
    fn quote(&self, pool: &PoolKey, amount_in: U256, zero_for_one: bool) -> Result<U256, QuoteError> {
        self.quotes
            .get(&pool.id())
            .ok_or(QuoteError::UnknownPool)?
            .quote(pool, amount_in, zero_for_one)
    }
}

// ─── SplitDistributor ──────────────────────────────────────────────────────

/// Splits settlement proceeds by basis points and records what each
/// recipient received.
#[derive(Debug, Clone)]
pub struct SplitDistributor {
    pub protocol:     Address,
    pub creator:      Address,
    /// `Address::ZERO` means no referrer; its share goes to the protocol.
    pub referrer:     Address,
    pub creator_bps:  u16,
    pub referrer_bps: u16,
    received:         HashMap<Address, U256>,
    fail:             bool,
}

impl SplitDistributor {
    pub fn new(protocol: Address, creator: Address, creator_bps: u16) -> Self {
        Self {
            protocol,
            creator,
            referrer: Address::ZERO,
            creator_bps,
            referrer_bps: 0,
            received: HashMap::new(),
            fail: false,
        }
    }

    pub fn with_referrer(mut self, referrer: Address, referrer_bps: u16) -> Self {
        self.referrer = referrer;
        self.referrer_bps = referrer_bps;
        self
    }

    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }

    pub fn received(&self, recipient: Address) -> U256 {
        self.received.get(&recipient).copied().unwrap_or_default()
    }

    pub fn total(&self) -> U256 {
        self.received.values().fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }

    fn share(&self, amount: U256, bps: u16) -> Result<U256, DistributionError> {
        mul_div(amount, U256::from(bps.min(BPS_DENOMINATOR)), U256::from(BPS_DENOMINATOR))
            .map_err(|_| DistributionError::TransferFailed { recipient: self.protocol, amount })
    }
}

impl FeeDistributor for SplitDistributor {
    fn distribute(&mut self, _source: Address, amount: U256) -> Result<Distribution, DistributionError> {
        if self.fail {
            return Err(DistributionError::TransferFailed { recipient: self.creator, amount });
        }
        let creator = self.share(amount, self.creator_bps)?;
        let referrer = if self.referrer == Address::ZERO {
            U256::ZERO
        } else {
            self.share(amount, self.referrer_bps)?
        };
        let protocol = amount.saturating_sub(creator).saturating_sub(referrer);

        // Credit on a copy so an overflowing recipient leaves every total as it was.
        let mut received = self.received.clone();
        for (recipient, value) in [(self.protocol, protocol), (self.creator, creator), (self.referrer, referrer)] {
            if value.is_zero() {
                continue;
            }
            let slot = received.entry(recipient).or_default();
            *slot = slot
                .checked_add(value)
                .ok_or(DistributionError::TransferFailed { recipient, amount: value })?;
        }
        self.received = received;
        Ok(Distribution { protocol, creator, referrer })
    }
}
