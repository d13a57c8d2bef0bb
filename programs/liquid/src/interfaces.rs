//! Capability interfaces for the external collaborators.
//!
//! The protocol never assumes a collaborator behaves: every call returns a
//! `Result` and every call site matches on it. Implementations for tests and
//! the simulator live in [`crate::sim`].

use alloy_primitives::{Address, U160, U256};
use serde::Serialize;

use crate::pool_id::PoolKey;

// ─── Failure reasons ──────────────────────────────────────────────────────────

/// Why a price quote could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("quoter reverted: {0}")]
    Reverted(String),
    #[error("quoter does not know pool")]
    UnknownPool,
}

/// Why a swap did not execute. A failed swap has no effect on the pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapError {
    #[error("output {amount_out} below minimum {min_amount_out}")]
    SlippageExceeded { amount_out: U256, min_amount_out: U256 },
    #[error("swap would cross the price limit")]
    PriceLimitReached,
    #[error("pool has insufficient liquidity")]
    InsufficientLiquidity,
    #[error("pool not initialized")]
    UnknownPool,
    #[error("swap reverted: {0}")]
    Reverted(String),
}

/// Failures of pool reads and fee collection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pool not initialized")]
    UnknownPool,
    #[error("pool call reverted: {0}")]
    Reverted(String),
}

/// A direct transfer to a fee recipient failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DistributionError {
    #[error("transfer of {amount} to {recipient} failed")]
    TransferFailed { recipient: Address, amount: U256 },
}

// ─── Values ───────────────────────────────────────────────────────────────────

/// Parameters of a guarded swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub amount_in:            U256,
    /// The pool must fail the swap rather than pay out less than this.
    pub min_amount_out:       U256,
    pub zero_for_one:         bool,
    /// Optional bound on the post-swap sqrt price.
    pub sqrt_price_limit_x96: Option<U160>,
    /// Receiver of the output asset.
    pub recipient:            Address,
}

/// LP fees pulled out of a pool, per currency of the pool key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeesCollected {
    pub amount0: U256,
    pub amount1: U256,
}

/// How a settlement amount was split by the distributor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub protocol: U256,
    pub creator:  U256,
    pub referrer: U256,
}

impl Distribution {
    pub fn total(&self) -> U256 {
        self.protocol
            .saturating_add(self.creator)
            .saturating_add(self.referrer)
    }
}

// ─── Traits ───────────────────────────────────────────────────────────────────

/// External price oracle. May be stale, may revert, may return zero.
pub trait PriceQuoter {
    /// Estimated output for swapping `amount_in` through `pool`.
    fn quote(&self, pool: &PoolKey, amount_in: U256, zero_for_one: bool)
        -> Result<U256, QuoteError>;
}

/// AMM the protocol trades against.
pub trait SettlementPool {
    /// Address of the pool manager contract.
    fn address(&self) -> Address;

    /// Execute a swap; fails atomically when the output would be below
    /// `request.min_amount_out`.
    fn swap(&mut self, pool: &PoolKey, request: &SwapRequest) -> Result<U256, SwapError>;

    /// Current Q64.96 sqrt price of `pool`.
    fn current_sqrt_price(&self, pool: &PoolKey) -> Result<U160, PoolError>;

    /// Pull every LP fee owed to `owner` in `pool`.
    fn collect_fees(&mut self, pool: &PoolKey, owner: Address) -> Result<FeesCollected, PoolError>;
}

/// Splits settlement-asset proceeds between the fee recipients.
pub trait FeeDistributor {
    fn distribute(&mut self, source: Address, amount: U256)
        -> Result<Distribution, DistributionError>;
}

/// Everything a conversion needs to reach outside the protocol.
pub struct Venue<'a> {
    pub pool:        &'a mut dyn SettlementPool,
    pub quoter:      &'a dyn PriceQuoter,
    pub distributor: &'a mut dyn FeeDistributor,
}
