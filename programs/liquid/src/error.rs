//! Protocol error type.

use alloy_primitives::{Address, U256};

use crate::interfaces::{DistributionError, PoolError, SwapError};
use crate::pool_id::PoolId;

/// Every fatal failure the protocol reports. Transient market failures are
/// not errors; they become deferrals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiquidError {
    // ── Configuration ────────────────────────────────────────────────────────
    /// A required address was left empty.
    #[error("{0} must not be the zero address")]
    ZeroAddress(&'static str),

    /// Tolerance above the 10 % hard cap.
    #[error("Slippage tolerance {0} bps exceeds the 1000 bps cap")]
    ToleranceTooHigh(u16),

    /// Non-zero tolerance configured without a quoter to supply the reference.
    #[error("A quoter is required when slippage tolerance is non-zero")]
    QuoterRequired,

    /// Trade fee or burn share outside its allowed range.
    #[error("Fee setting {0} bps is out of range")]
    InvalidFeeBps(u16),

    /// The asset is neither currency of the pool key.
    #[error("Pool key does not contain {0}")]
    AssetNotInPool(Address),

    // ── Access control ───────────────────────────────────────────────────────
    /// Owner-only operation called by someone else.
    #[error("Caller {0} is not the owner")]
    Unauthorized(Address),

    /// The pool handed in is not the one registered at construction.
    #[error("Caller {0} is not the registered pool manager")]
    NotPoolManager(Address),

    // ── State ────────────────────────────────────────────────────────────────
    /// Deposits, flushes and withdrawals are refused while paused.
    #[error("Accumulator is paused")]
    Paused,

    /// The single-entry latch was already held.
    #[error("Reentrant call rejected")]
    Reentrancy,

    // ── Resources ────────────────────────────────────────────────────────────
    /// Withdrawal larger than the accounted pending balance.
    #[error("Requested {requested} exceeds pending balance {available}")]
    InsufficientPending { requested: U256, available: U256 },

    /// Held balance does not exceed pending; nothing to sweep.
    #[error("No excess balance to sweep")]
    NoExcess,

    // ── Input ────────────────────────────────────────────────────────────────
    /// Zero amount where a positive one is required.
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// Zero sqrt price handed to the slippage guard.
    #[error("Price must be greater than zero")]
    ZeroPrice,

    /// A checked operation overflowed or divided by zero.
    #[error("Math overflow")]
    MathOverflow,

    // ── Invariants ───────────────────────────────────────────────────────────
    /// The recomputed pool fingerprint differs from the recorded one.
    #[error("Pool id mismatch: recorded {expected}, computed {computed}")]
    PoolIdMismatch { expected: PoolId, computed: PoolId },

    // ── Collaborators ────────────────────────────────────────────────────────
    /// The pool rejected a swap the caller required to succeed.
    #[error("Swap failed: {0}")]
    Swap(#[from] SwapError),

    /// Collecting LP fees from the pool failed.
    #[error("Fee harvest failed: {0}")]
    Harvest(#[from] PoolError),

    /// The fee distributor refused a transfer.
    #[error("Fee distribution failed: {0}")]
    Distribution(#[from] DistributionError),
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, LiquidError>;
