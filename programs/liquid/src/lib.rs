//! Liquid protocol: slippage-protected fee conversion and burning for
//! Liquid tokens trading against ETH on a v4-style pool manager.
//!
//! Three state machines:
//!
//! | Type | Role |
//! |------|------|
//! | [`LiquidToken`] | Primary buy / sell, trade-fee skim, optional harvest |
//! | [`RewardsConverter`] | Harvest LP fees, convert the token side to ETH, distribute |
//! | [`BurnAccumulator`] | Buffer ETH, swap it into the governance token, burn it |
//!
//! Every swap the protocol initiates on its own behalf is bounded:
//! a quote (or a caller-supplied reference price) is reduced by the configured
//! tolerance, rounded up, and handed to the pool as the minimum output. A
//! failure anywhere along that path defers the conversion instead of failing
//! the surrounding trade.
//!
//! # Quick Start
//!
//! ```rust
//! use alloy_primitives::{Address, U256};
//! use liquid_protocol::{slippage, PoolIdentityInputs, PoolKey};
//!
//! let token = Address::repeat_byte(0x11);
//! let key = PoolKey::new(token, Address::ZERO, PoolIdentityInputs {
//!     fee:          10_000,
//!     tick_spacing: 200,
//!     hooks:        Address::ZERO,
//! });
//! assert_eq!(key.currency0, Address::ZERO);
//!
//! // 1% below a quote of 1_000_000
//! let min_out = slippage::min_amount_out_from_quote(U256::from(1_000_000u64), 100).unwrap();
//! assert_eq!(min_out, U256::from(990_000u64));
//! ```
//!
//! External collaborators (pool manager, quoter, fee distributor) are traits
//! in [`interfaces`]; [`sim`] has in-memory versions of all three.

pub mod accumulator;
pub mod constants;
pub mod converter;
pub mod error;
pub mod events;
pub mod guard;
pub mod interfaces;
pub mod math;
pub mod pool_id;
pub mod sim;
pub mod slippage;
pub mod state;
pub mod token;

pub use accumulator::{BurnAccumulator, BurnAccumulatorConfig, BurnOutcome, DepositReceipt};
pub use converter::{ConversionOutcome, ConverterConfig, HarvestOverrides, HarvestReport, RewardsConverter};
pub use error::{LiquidError, Result};
pub use events::{DeferReason, Event, EventLog};
pub use interfaces::{FeeDistributor, PriceQuoter, SettlementPool, SwapRequest, Venue};
pub use pool_id::{verify_pool_id, PoolId, PoolIdentityInputs, PoolKey};
pub use slippage::SlippageConfig;
pub use token::{HarvestStatus, LiquidToken, TradeFeeConfig, TradeReceipt, TradeSide, TradeVenue};
