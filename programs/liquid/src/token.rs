//! Primary trades of a Liquid token against its ETH pool.
//!
//! Every buy or sell pays a trade fee on the ETH side. `burn_share_bps` of it
//! goes to the burn accumulator, the rest to the fee distributor. A trade can
//! opt in to harvesting the token's own LP fees afterwards; nothing that
//! happens inside that harvest can fail the trade.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::accumulator::BurnAccumulator;
use crate::constants::{BPS_DENOMINATOR, DEFAULT_BURN_SHARE_BPS, DEFAULT_TRADE_FEE_BPS, MAX_TRADE_FEE_BPS};
use crate::converter::{ConverterConfig, HarvestReport, RewardsConverter};
use crate::error::{LiquidError, Result};
use crate::events::{Event, EventLog};
use crate::guard::only_owner;
use crate::interfaces::{FeeDistributor, PriceQuoter, SettlementPool, SwapRequest, Venue};
use crate::math::{apply_bps, mul_div_rounding_up};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFeeConfig {
    /// Fee on the ETH leg of each trade, capped at 1000 bps.
    pub fee_bps:        u16,
    /// Portion of the fee sent to the burn accumulator.
    pub burn_share_bps: u16,
}

impl Default for TradeFeeConfig {
    fn default() -> Self {
        Self { fee_bps: DEFAULT_TRADE_FEE_BPS, burn_share_bps: DEFAULT_BURN_SHARE_BPS }
    }
}

impl TradeFeeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fee_bps > MAX_TRADE_FEE_BPS {
            return Err(LiquidError::InvalidFeeBps(self.fee_bps));
        }
        if self.burn_share_bps > BPS_DENOMINATOR {
            return Err(LiquidError::InvalidFeeBps(self.burn_share_bps));
        }
        Ok(())
    }
}

/// Collaborators a primary trade touches.
pub struct TradeVenue<'a> {
    pub pool:        &'a mut dyn SettlementPool,
    pub quoter:      &'a dyn PriceQuoter,
    pub distributor: &'a mut dyn FeeDistributor,
    pub accumulator: &'a mut BurnAccumulator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HarvestStatus {
    /// The trade did not ask for a harvest.
    Skipped,
    Completed(HarvestReport),
    /// The harvest errored; the trade went through regardless.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeReceipt {
    pub side:       TradeSide,
    pub trader:     Address,
    pub amount_in:  U256,
    /// Net of fees: tokens for a buy, ETH for a sell.
    pub amount_out: U256,
    pub fee:        U256,
    pub burn_share: U256,
    pub harvest:    HarvestStatus,
}

#[derive(Debug, Clone)]
pub struct LiquidToken {
    address:       Address,
    fees:          TradeFeeConfig,
    converter:     RewardsConverter,
    /// Fee ETH the distributor refused; retried with the next trade.
    undistributed: U256,
    events:        EventLog,
}

impl LiquidToken {
    pub fn new(converter: ConverterConfig, fees: TradeFeeConfig) -> Result<Self> {
        fees.validate()?;
        let converter = RewardsConverter::new(converter)?;
        Ok(Self {
            address: converter.token(),
            fees,
            converter,
            undistributed: U256::ZERO,
            events: EventLog::default(),
        })
    }

    /// Spend `eth_in` (fee included) on tokens sent to `trader`.
    pub fn buy(
        &mut self,
        trader: Address,
        eth_in: U256,
        min_tokens_out: U256,
        harvest: bool,
        venue: &mut TradeVenue<'_>,
    ) -> Result<TradeReceipt> {
        if eth_in.is_zero() {
            return Err(LiquidError::ZeroAmount);
        }
        let fee = apply_bps(eth_in, self.fees.fee_bps)?;
        let net_in = eth_in - fee;
        if net_in.is_zero() {
            return Err(LiquidError::ZeroAmount);
        }

        let request = SwapRequest {
            amount_in:            net_in,
            min_amount_out:       min_tokens_out,
            zero_for_one:         self.converter.pool_key().zero_for_one(self.converter.settlement())?,
            sqrt_price_limit_x96: None,
            recipient:            trader,
        };
        let tokens_out = venue.pool.swap(self.converter.pool_key(), &request)?;
        log::info!("Buy: trader={trader} eth_in={eth_in} fee={fee} tokens_out={tokens_out}");

        let burn_share = self.route_fee(fee, venue)?;
        Ok(TradeReceipt {
            side: TradeSide::Buy,
            trader,
            amount_in: eth_in,
            amount_out: tokens_out,
            fee,
            burn_share,
            harvest: self.maybe_harvest(harvest, venue),
        })
    }

    /// Sell `tokens_in`; the trader receives the ETH output minus the fee,
    /// at least `min_eth_out`.
    pub fn sell(
        &mut self,
        trader: Address,
        tokens_in: U256,
        min_eth_out: U256,
        harvest: bool,
        venue: &mut TradeVenue<'_>,
    ) -> Result<TradeReceipt> {
        if tokens_in.is_zero() {
            return Err(LiquidError::ZeroAmount);
        }
        // Gross bound such that the post-fee amount still meets `min_eth_out`.
        let keep_bps = U256::from(BPS_DENOMINATOR - self.fees.fee_bps);
        let gross_min = mul_div_rounding_up(min_eth_out, U256::from(BPS_DENOMINATOR), keep_bps)?;

        let request = SwapRequest {
            amount_in:            tokens_in,
            min_amount_out:       gross_min,
            zero_for_one:         self.converter.pool_key().zero_for_one(self.address)?,
            sqrt_price_limit_x96: None,
            recipient:            self.address,
        };
        let gross_out = venue.pool.swap(self.converter.pool_key(), &request)?;
        let fee = apply_bps(gross_out, self.fees.fee_bps)?;
        let eth_out = gross_out - fee;
        // gross_out >= ceil(min * 10_000 / keep) and the fee rounds down
        debug_assert!(eth_out >= min_eth_out);
        log::info!("Sell: trader={trader} tokens_in={tokens_in} fee={fee} eth_out={eth_out}");

        let burn_share = self.route_fee(fee, venue)?;
        Ok(TradeReceipt {
            side: TradeSide::Sell,
            trader,
            amount_in: tokens_in,
            amount_out: eth_out,
            fee,
            burn_share,
            harvest: self.maybe_harvest(harvest, venue),
        })
    }

    /// Split the trade fee between the accumulator and the distributor.
    /// Returns the accumulator's share.
    fn route_fee(&mut self, fee: U256, venue: &mut TradeVenue<'_>) -> Result<U256> {
        let burn_share = apply_bps(fee, self.fees.burn_share_bps)?;
        if !burn_share.is_zero() {
            if let Err(e) = venue.accumulator.deposit(self.address, burn_share, &mut *venue.pool, venue.quoter) {
                // Refused (paused); hand it over as a plain transfer instead.
                log::warn!("Accumulator deposit refused ({e}); sending {burn_share} wei as a transfer");
                venue.accumulator.receive(self.address, burn_share, &mut *venue.pool, venue.quoter)?;
            }
        }

        let to_distribute = (fee - burn_share)
            .checked_add(self.undistributed)
            .ok_or(LiquidError::MathOverflow)?;
        if to_distribute.is_zero() {
            return Ok(burn_share);
        }
        match venue.distributor.distribute(self.address, to_distribute) {
            Ok(split) => {
                self.undistributed = U256::ZERO;
                self.events.emit(Event::FeesDistributed {
                    amount:   to_distribute,
                    protocol: split.protocol,
                    creator:  split.creator,
                    referrer: split.referrer,
                });
            }
            Err(e) => {
                log::warn!("Trade fee distribution failed: {e}");
                self.undistributed = to_distribute;
            }
        }
        Ok(burn_share)
    }

    fn maybe_harvest(&mut self, harvest: bool, venue: &mut TradeVenue<'_>) -> HarvestStatus {
        if !harvest {
            return HarvestStatus::Skipped;
        }
        let mut harvest_venue = Venue {
            pool:        &mut *venue.pool,
            quoter:      venue.quoter,
            distributor: &mut *venue.distributor,
        };
        match self.converter.harvest(&mut harvest_venue) {
            Ok(report) => HarvestStatus::Completed(report),
            Err(e) => {
                log::warn!("Harvest after trade failed: {e}");
                HarvestStatus::Failed { reason: e.to_string() }
            }
        }
    }

    pub fn set_trade_fees(&mut self, caller: Address, fees: TradeFeeConfig) -> Result<()> {
        only_owner(self.converter.owner(), caller)?;
        fees.validate()?;
        self.fees = fees;
        log::info!("Trade fees set: fee_bps={} burn_share_bps={}", fees.fee_bps, fees.burn_share_bps);
        Ok(())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn trade_fees(&self) -> TradeFeeConfig {
        self.fees
    }

    pub fn undistributed(&self) -> U256 {
        self.undistributed
    }

    pub fn converter(&self) -> &RewardsConverter {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut RewardsConverter {
        &mut self.converter
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take()
    }
}
