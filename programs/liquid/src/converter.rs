//! Secondary-rewards converter.
//!
//! A Liquid token is the LP of its own ETH pool. Harvesting pulls the LP fees
//! it has earned, forwards the ETH side to the fee distributor, and tries to
//! swap the token side into ETH under a slippage bound. Each attempt walks
//!
//! ```text
//! Harvested → Quoted → Bounded → Swapped
//!          ↘        ↘         ↘
//!                 Deferred
//! ```
//!
//! Any market-side failure (no quoter, quoter reverts or answers zero, the
//! swap breaches its bound) ends in `Deferred`: the un-converted amount stays
//! in the pending ledger and the next attempt converts the whole balance.
//! Only harvesting itself, bad input, and broken invariants are errors.

use alloy_primitives::{Address, U160, U256};
use serde::{Deserialize, Serialize};

use crate::error::{LiquidError, Result};
use crate::events::{DeferReason, Event, EventLog};
use crate::guard::{only_owner, require_nonzero, ReentrancyLatch};
use crate::interfaces::{SwapRequest, Venue};
use crate::pool_id::{verify_pool_id, PoolId, PoolIdentityInputs, PoolKey};
use crate::slippage::{self, validate_tolerance, SlippageConfig};
use crate::state::{AssetKind, PendingRewards};

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    pub owner:            Address,
    /// The Liquid token; it holds the LP position and receives swap output.
    pub token:            Address,
    /// Settlement asset (native ETH is `Address::ZERO`).
    pub settlement:       Address,
    pub pool:             PoolIdentityInputs,
    pub slippage:         SlippageConfig,
    /// Fingerprint the pool must have; computed from `pool` when absent.
    #[serde(default)]
    pub expected_pool_id: Option<PoolId>,
}

/// One-shot overrides for an explicit harvest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestOverrides {
    /// Caller-supplied reference price; replaces the quoter.
    pub sqrt_price_x96:       Option<U160>,
    pub tolerance_bps:        Option<u16>,
    pub sqrt_price_limit_x96: Option<U160>,
}

impl HarvestOverrides {
    pub fn is_empty(&self) -> bool {
        self.sqrt_price_x96.is_none()
            && self.tolerance_bps.is_none()
            && self.sqrt_price_limit_x96.is_none()
    }
}

// ─── Outcomes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// Nothing was pending.
    Idle,
    Swapped {
        amount_in:  U256,
        amount_out: U256,
        min_out:    U256,
    },
    Deferred {
        reason:            DeferReason,
        amount_pending:    U256,
        attempted_min_out: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    pub harvested_settlement: U256,
    pub harvested_traded:     U256,
    /// Settlement amount handed to the distributor in this call.
    pub distributed:          U256,
    pub conversion:           ConversionOutcome,
}

// ─── State machine ────────────────────────────────────────────────────────────

enum Reference {
    Quote(U256),
    SqrtPrice(U160),
}

enum Stage {
    Harvested { amount: U256 },
    Quoted { amount: U256, reference: Reference },
    Bounded { amount: U256, min_out: U256 },
}

enum Step {
    Next(Stage),
    Done(ConversionOutcome),
}

/// Parameters fixed for the duration of one attempt.
struct Attempt {
    tolerance_bps:        u16,
    zero_for_one:         bool,
    sqrt_price:           Option<U160>,
    sqrt_price_limit_x96: Option<U160>,
}

// ─── Converter ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RewardsConverter {
    owner:      Address,
    token:      Address,
    settlement: Address,
    pool_key:   PoolKey,
    pool_id:    PoolId,
    slippage:   SlippageConfig,
    enabled:    bool,
    pending:    PendingRewards,
    latch:      ReentrancyLatch,
    events:     EventLog,
}

impl RewardsConverter {
    pub fn new(config: ConverterConfig) -> Result<Self> {
        require_nonzero(config.owner, "owner")?;
        require_nonzero(config.token, "token")?;
        if config.token == config.settlement {
            return Err(LiquidError::AssetNotInPool(config.settlement));
        }
        config.slippage.validate()?;

        let pool_key = PoolKey::new(config.token, config.settlement, config.pool);
        Ok(Self {
            owner:      config.owner,
            token:      config.token,
            settlement: config.settlement,
            pool_id:    config.expected_pool_id.unwrap_or_else(|| pool_key.id()),
            pool_key,
            slippage:   config.slippage,
            enabled:    true,
            pending:    PendingRewards::default(),
            latch:      ReentrancyLatch::default(),
            events:     EventLog::default(),
        })
    }

    // ── Entry points ─────────────────────────────────────────────────────────

    /// Harvest with the configured tolerance and quoter. This is the form
    /// run after a trade that opted into harvesting.
    pub fn harvest(&mut self, venue: &mut Venue<'_>) -> Result<HarvestReport> {
        self.run(venue, HarvestOverrides::default())
    }

    /// Explicit harvest. Anyone may call it plainly; supplying overrides
    /// (a fresher reference price, a one-shot tolerance, a price limit) is
    /// reserved to the owner.
    pub fn harvest_now(
        &mut self,
        caller: Address,
        venue: &mut Venue<'_>,
        overrides: HarvestOverrides,
    ) -> Result<HarvestReport> {
        if !overrides.is_empty() {
            only_owner(self.owner, caller)?;
        }
        if let Some(bps) = overrides.tolerance_bps {
            validate_tolerance(bps)?;
        }
        self.run(venue, overrides)
    }

    fn run(&mut self, venue: &mut Venue<'_>, overrides: HarvestOverrides) -> Result<HarvestReport> {
        self.latch.enter()?;
        let result = self.harvest_locked(venue, overrides);
        self.latch.exit();
        result
    }

    fn harvest_locked(&mut self, venue: &mut Venue<'_>, overrides: HarvestOverrides) -> Result<HarvestReport> {
        verify_pool_id(self.pool_id, &self.pool_key)?;

        let fees = venue.pool.collect_fees(&self.pool_key, self.token)?;
        let token_is_zero = self.pool_key.currency0 == self.token;
        let (harvested_settlement, harvested_traded) = if token_is_zero {
            (fees.amount1, fees.amount0)
        } else {
            (fees.amount0, fees.amount1)
        };

        // Commit the harvest before any outbound call.
        let mut staged = self.pending;
        staged.credit(AssetKind::Settlement, harvested_settlement)?;
        staged.credit(AssetKind::Traded, harvested_traded)?;
        self.pending = staged;
        log::info!(
            "Harvest: settlement={} traded={} pending_traded={}",
            harvested_settlement, harvested_traded, self.pending.traded
        );

        let attempt = Attempt {
            tolerance_bps:        overrides.tolerance_bps.unwrap_or(self.slippage.tolerance_bps),
            zero_for_one:         token_is_zero,
            sqrt_price:           overrides.sqrt_price_x96,
            sqrt_price_limit_x96: overrides.sqrt_price_limit_x96,
        };
        let conversion = self.convert(venue, &attempt);
        let distributed = self.distribute(venue);

        Ok(HarvestReport {
            harvested_settlement,
            harvested_traded,
            distributed,
            conversion,
        })
    }

    fn convert(&mut self, venue: &mut Venue<'_>, attempt: &Attempt) -> ConversionOutcome {
        let mut stage = Stage::Harvested { amount: self.pending.traded };
        loop {
            match self.advance(stage, venue, attempt) {
                Step::Next(next) => stage = next,
                Step::Done(outcome) => return outcome,
            }
        }
    }

    fn advance(&mut self, stage: Stage, venue: &mut Venue<'_>, attempt: &Attempt) -> Step {
        match stage {
            Stage::Harvested { amount } => {
                if amount.is_zero() {
                    return Step::Done(ConversionOutcome::Idle);
                }
                if !self.enabled {
                    return self.defer(DeferReason::ConversionDisabled, U256::ZERO);
                }
                if attempt.tolerance_bps == 0 {
                    // Unprotected: no reference needed.
                    return Step::Next(Stage::Bounded { amount, min_out: U256::ZERO });
                }
                if let Some(sqrt_price) = attempt.sqrt_price {
                    return Step::Next(Stage::Quoted { amount, reference: Reference::SqrtPrice(sqrt_price) });
                }
                if !matches!(self.slippage.quoter, Some(q) if q != Address::ZERO) {
                    return self.defer(DeferReason::QuoterUnset, U256::ZERO);
                }
                match venue.quoter.quote(&self.pool_key, amount, attempt.zero_for_one) {
                    Ok(quote) if quote.is_zero() => self.defer(DeferReason::ZeroQuote, U256::ZERO),
                    Ok(quote) => {
                        log::debug!("Quote: amount_in={amount} quoted_out={quote}");
                        Step::Next(Stage::Quoted { amount, reference: Reference::Quote(quote) })
                    }
                    Err(e) => {
                        log::warn!("Quoter failed: {e}");
                        self.defer(DeferReason::QuoterReverted, U256::ZERO)
                    }
                }
            }
            Stage::Quoted { amount, reference } => {
                let bound = match reference {
                    Reference::Quote(quote) => {
                        slippage::min_amount_out_from_quote(quote, attempt.tolerance_bps)
                    }
                    Reference::SqrtPrice(sqrt_price) => slippage::min_amount_out(
                        sqrt_price,
                        amount,
                        attempt.tolerance_bps,
                        attempt.zero_for_one,
                    ),
                };
                match bound {
                    Ok(min_out) => Step::Next(Stage::Bounded { amount, min_out }),
                    Err(e) => {
                        log::warn!("Bound computation failed: {e}");
                        self.defer(DeferReason::BoundOverflow, U256::ZERO)
                    }
                }
            }
            Stage::Bounded { amount, min_out } => {
                let request = SwapRequest {
                    amount_in:            amount,
                    min_amount_out:       min_out,
                    zero_for_one:         attempt.zero_for_one,
                    sqrt_price_limit_x96: attempt.sqrt_price_limit_x96,
                    recipient:            self.token,
                };
                match venue.pool.swap(&self.pool_key, &request) {
                    Ok(amount_out) => self.settle_swap(amount, amount_out, min_out),
                    Err(e) => {
                        log::warn!("Secondary swap failed: {e}");
                        self.defer(DeferReason::SwapReverted, min_out)
                    }
                }
            }
        }
    }

    fn settle_swap(&mut self, amount_in: U256, amount_out: U256, min_out: U256) -> Step {
        // The swap already happened; apply its effect on a copy so an
        // accounting overflow cannot leave the ledger half-updated.
        let mut staged = self.pending;
        let applied = staged
            .debit(AssetKind::Traded, amount_in)
            .and_then(|_| staged.credit(AssetKind::Settlement, amount_out));
        if let Err(e) = applied {
            log::error!("Ledger update after swap failed: {e}");
            return self.defer(DeferReason::BoundOverflow, min_out);
        }
        self.pending = staged;
        self.events.emit(Event::SecondaryRewardsSwap {
            amount_in,
            amount_out,
            min_out_used: min_out,
        });
        Step::Done(ConversionOutcome::Swapped { amount_in, amount_out, min_out })
    }

    fn defer(&mut self, reason: DeferReason, attempted_min_out: U256) -> Step {
        let amount_pending = self.pending.traded;
        self.events.emit(Event::SecondaryRewardsDeferred {
            amount_pending,
            reason,
            attempted_min_out,
        });
        Step::Done(ConversionOutcome::Deferred { reason, amount_pending, attempted_min_out })
    }

    /// Forward pending settlement-asset fees and proceeds. Returns the amount
    /// handed over; on failure it stays pending.
    fn distribute(&mut self, venue: &mut Venue<'_>) -> U256 {
        let amount = self.pending.settlement;
        if amount.is_zero() {
            return U256::ZERO;
        }
        match venue.distributor.distribute(self.token, amount) {
            Ok(split) => {
                self.pending.settlement = U256::ZERO;
                self.events.emit(Event::FeesDistributed {
                    amount,
                    protocol: split.protocol,
                    creator:  split.creator,
                    referrer: split.referrer,
                });
                amount
            }
            Err(e) => {
                log::warn!("Fee distribution failed: {e}");
                self.events.emit(Event::SecondaryRewardsDeferred {
                    amount_pending:    amount,
                    reason:            DeferReason::DistributionFailed,
                    attempted_min_out: U256::ZERO,
                });
                U256::ZERO
            }
        }
    }

    // ── Administration ───────────────────────────────────────────────────────

    pub fn set_tolerance(&mut self, caller: Address, tolerance_bps: u16) -> Result<()> {
        only_owner(self.owner, caller)?;
        let next = SlippageConfig::new(tolerance_bps, self.slippage.quoter)?;
        self.slippage = next;
        self.emit_config();
        Ok(())
    }

    pub fn set_quoter(&mut self, caller: Address, quoter: Option<Address>) -> Result<()> {
        only_owner(self.owner, caller)?;
        let next = SlippageConfig::new(self.slippage.tolerance_bps, quoter)?;
        self.slippage = next;
        self.events.emit(Event::QuoterUpdated { quoter });
        Ok(())
    }

    pub fn set_conversion_enabled(&mut self, caller: Address, enabled: bool) -> Result<()> {
        only_owner(self.owner, caller)?;
        self.enabled = enabled;
        self.emit_config();
        Ok(())
    }

    /// Re-point the converter at a pool with different fee tier / tick
    /// spacing / hooks. `expected_pool_id` is recorded as given; harvests
    /// refuse to run until it matches the recomputed fingerprint.
    pub fn set_pool_identity_inputs(
        &mut self,
        caller: Address,
        inputs: PoolIdentityInputs,
        expected_pool_id: PoolId,
    ) -> Result<()> {
        only_owner(self.owner, caller)?;
        self.pool_key = self.pool_key.with_inputs(inputs);
        self.pool_id = expected_pool_id;
        self.events.emit(Event::PoolIdentityUpdated { expected_pool_id });
        Ok(())
    }

    fn emit_config(&mut self) {
        self.events.emit(Event::ConfigUpdated {
            enabled:       self.enabled,
            tolerance_bps: self.slippage.tolerance_bps,
        });
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn settlement(&self) -> Address {
        self.settlement
    }

    pub fn pool_key(&self) -> &PoolKey {
        &self.pool_key
    }

    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    pub fn slippage(&self) -> SlippageConfig {
        self.slippage
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pending(&self) -> PendingRewards {
        self.pending
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{MemoryPool, SimQuoter, SplitDistributor};

    const OWNER: Address = Address::repeat_byte(0x0a);
    const TOKEN: Address = Address::repeat_byte(0x11);
    const QUOTER: Address = Address::repeat_byte(0x22);
    const POOL_MANAGER: Address = Address::repeat_byte(0x33);
    const PROTOCOL: Address = Address::repeat_byte(0x44);
    const CREATOR: Address = Address::repeat_byte(0x55);

    fn inputs() -> PoolIdentityInputs {
        PoolIdentityInputs { fee: 3_000, tick_spacing: 60, hooks: Address::ZERO }
    }

    fn units(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000_000u64)
    }

    fn converter(tolerance_bps: u16, quoter: Option<Address>) -> RewardsConverter {
        RewardsConverter::new(ConverterConfig {
            owner:            OWNER,
            token:            TOKEN,
            settlement:       Address::ZERO,
            pool:             inputs(),
            slippage:         SlippageConfig { tolerance_bps, quoter },
            expected_pool_id: None,
        })
        .unwrap()
    }

    struct Fixture {
        pool:        MemoryPool,
        distributor: SplitDistributor,
    }

    impl Fixture {
        fn new(conv: &RewardsConverter) -> Self {
            let mut pool = MemoryPool::new(POOL_MANAGER);
            pool.initialize(*conv.pool_key(), units(1_000), units(1_000_000), TOKEN);
            Self { pool, distributor: SplitDistributor::new(PROTOCOL, CREATOR, 5_000) }
        }

        /// LP fees in the token (currency1, ETH is currency0).
        fn accrue(&mut self, conv: &RewardsConverter, eth: U256, token: U256) {
            self.pool.accrue_fees(conv.pool_key(), eth, token).unwrap();
        }
    }

    fn harvest(conv: &mut RewardsConverter, fx: &mut Fixture, quoter: &SimQuoter) -> HarvestReport {
        let mut venue = Venue { pool: &mut fx.pool, quoter, distributor: &mut fx.distributor };
        conv.harvest(&mut venue).unwrap()
    }

    #[test]
    fn successful_conversion_distributes_proceeds() {
        let mut conv = converter(300, Some(QUOTER));
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, units(2), units(1_000));
        let quoter = fx.pool.snapshot_quoter(conv.pool_key());

        let report = harvest(&mut conv, &mut fx, &quoter);
        assert_eq!(report.harvested_settlement, units(2));
        assert_eq!(report.harvested_traded, units(1_000));
        let ConversionOutcome::Swapped { amount_in, amount_out, min_out } = report.conversion else {
            panic!("expected swap, got {:?}", report.conversion);
        };
        assert_eq!(amount_in, units(1_000));
        assert!(amount_out >= min_out && !min_out.is_zero());
        assert_eq!(report.distributed, units(2) + amount_out);
        assert_eq!(conv.pending(), PendingRewards::default());
        assert_eq!(fx.distributor.total(), units(2) + amount_out);
        assert!(conv.events().iter().any(|e| matches!(e, Event::SecondaryRewardsSwap { .. })));
    }

    #[test]
    fn reverting_quoter_defers_and_keeps_balance() {
        let mut conv = converter(300, Some(QUOTER));
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(10));

        let report = harvest(&mut conv, &mut fx, &SimQuoter::Reverting("stale".into()));
        assert_eq!(report.conversion, ConversionOutcome::Deferred {
            reason:            DeferReason::QuoterReverted,
            amount_pending:    units(10),
            attempted_min_out: U256::ZERO,
        });
        assert_eq!(conv.pending().traded, units(10));
    }

    #[test]
    fn zero_quote_defers() {
        let mut conv = converter(300, Some(QUOTER));
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(10));
        let report = harvest(&mut conv, &mut fx, &SimQuoter::Zero);
        assert!(matches!(report.conversion, ConversionOutcome::Deferred { reason: DeferReason::ZeroQuote, .. }));
    }

    #[test]
    fn adverse_move_after_quote_defers() {
        let mut conv = converter(10, Some(QUOTER));
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(100));
        let quoter = fx.pool.snapshot_quoter(conv.pool_key());
        // Someone dumps tokens between quote and execution.
        fx.pool.push_price(conv.pool_key(), units(100_000), false).unwrap();

        let report = harvest(&mut conv, &mut fx, &quoter);
        let ConversionOutcome::Deferred { reason, amount_pending, attempted_min_out } = report.conversion else {
            panic!("expected deferral");
        };
        assert_eq!(reason, DeferReason::SwapReverted);
        assert_eq!(amount_pending, units(100));
        assert!(!attempted_min_out.is_zero());
    }

    #[test]
    fn next_success_converts_the_accumulated_balance() {
        let mut conv = converter(300, Some(QUOTER));
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(10));
        harvest(&mut conv, &mut fx, &SimQuoter::Reverting("down".into()));
        fx.accrue(&conv, U256::ZERO, units(5));
        harvest(&mut conv, &mut fx, &SimQuoter::Zero);
        assert_eq!(conv.pending().traded, units(15));

        fx.accrue(&conv, U256::ZERO, units(1));
        let quoter = fx.pool.snapshot_quoter(conv.pool_key());
        let report = harvest(&mut conv, &mut fx, &quoter);
        assert!(matches!(report.conversion, ConversionOutcome::Swapped { amount_in, .. } if amount_in == units(16)));
        assert!(conv.pending().traded.is_zero());
    }

    #[test]
    fn zero_tolerance_swaps_without_a_quoter() {
        let mut conv = converter(0, None);
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(10));
        let report = harvest(&mut conv, &mut fx, &SimQuoter::Reverting("never called".into()));
        assert!(matches!(report.conversion, ConversionOutcome::Swapped { min_out, .. } if min_out.is_zero()));
    }

    #[test]
    fn owner_override_replaces_the_quoter() {
        let mut conv = converter(300, Some(QUOTER));
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(10));
        let sqrt_price = {
            use crate::interfaces::SettlementPool;
            fx.pool.current_sqrt_price(conv.pool_key()).unwrap()
        };
        let overrides = HarvestOverrides { sqrt_price_x96: Some(sqrt_price), tolerance_bps: Some(500), ..Default::default() };

        let quoter = SimQuoter::Reverting("unused".into());
        let mut venue = Venue { pool: &mut fx.pool, quoter: &quoter, distributor: &mut fx.distributor };
        assert_eq!(
            conv.harvest_now(TOKEN, &mut venue, overrides),
            Err(LiquidError::Unauthorized(TOKEN))
        );
        let report = conv.harvest_now(OWNER, &mut venue, overrides).unwrap();
        assert!(matches!(report.conversion, ConversionOutcome::Swapped { .. }));

        let too_loose = HarvestOverrides { tolerance_bps: Some(1_001), ..Default::default() };
        assert_eq!(conv.harvest_now(OWNER, &mut venue, too_loose), Err(LiquidError::ToleranceTooHigh(1_001)));
    }

    #[test]
    fn tolerance_override_without_a_quoter_defers() {
        let mut conv = converter(0, None);
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(6));
        let quoter = SimQuoter::Fixed(units(1));
        let mut venue = Venue { pool: &mut fx.pool, quoter: &quoter, distributor: &mut fx.distributor };

        let overrides = HarvestOverrides { tolerance_bps: Some(100), ..Default::default() };
        let report = conv.harvest_now(OWNER, &mut venue, overrides).unwrap();
        assert_eq!(report.conversion, ConversionOutcome::Deferred {
            reason:            DeferReason::QuoterUnset,
            amount_pending:    units(6),
            attempted_min_out: U256::ZERO,
        });
        assert_eq!(conv.pending().traded, units(6));
    }

    #[test]
    fn price_limit_override_bounds_the_swap() {
        use crate::interfaces::SettlementPool;
        use crate::math::{sqrt_price_to_u256, u256_to_sqrt_price};

        let mut conv = converter(0, None);
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(10));
        // Selling the token (currency1) pushes the price up.
        let spot = fx.pool.current_sqrt_price(conv.pool_key()).unwrap();
        let quoter = SimQuoter::Zero;

        let at_spot = HarvestOverrides { sqrt_price_limit_x96: Some(spot), ..Default::default() };
        let mut venue = Venue { pool: &mut fx.pool, quoter: &quoter, distributor: &mut fx.distributor };
        let report = conv.harvest_now(OWNER, &mut venue, at_spot).unwrap();
        assert!(matches!(report.conversion, ConversionOutcome::Deferred { reason: DeferReason::SwapReverted, .. }));
        assert_eq!(conv.pending().traded, units(10));
        assert_eq!(fx.pool.current_sqrt_price(conv.pool_key()).unwrap(), spot);

        let roomy = u256_to_sqrt_price(sqrt_price_to_u256(spot) * U256::from(2u64)).unwrap();
        let wide = HarvestOverrides { sqrt_price_limit_x96: Some(roomy), ..Default::default() };
        let mut venue = Venue { pool: &mut fx.pool, quoter: &quoter, distributor: &mut fx.distributor };
        let report = conv.harvest_now(OWNER, &mut venue, wide).unwrap();
        assert!(matches!(report.conversion, ConversionOutcome::Swapped { amount_in, .. } if amount_in == units(10)));
        assert!(conv.pending().traded.is_zero());
    }

    #[test]
    fn anyone_may_harvest_without_overrides() {
        let mut conv = converter(0, None);
        let mut fx = Fixture::new(&conv);
        let quoter = SimQuoter::Zero;
        let mut venue = Venue { pool: &mut fx.pool, quoter: &quoter, distributor: &mut fx.distributor };
        let report = conv.harvest_now(Address::repeat_byte(0x99), &mut venue, HarvestOverrides::default()).unwrap();
        assert_eq!(report.conversion, ConversionOutcome::Idle);
    }

    #[test]
    fn distribution_failure_keeps_settlement_pending() {
        let mut conv = converter(0, None);
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, units(3), U256::ZERO);
        fx.distributor.set_failing(true);
        let report = harvest(&mut conv, &mut fx, &SimQuoter::Zero);
        assert_eq!(report.distributed, U256::ZERO);
        assert_eq!(conv.pending().settlement, units(3));

        fx.distributor.set_failing(false);
        let report = harvest(&mut conv, &mut fx, &SimQuoter::Zero);
        assert_eq!(report.distributed, units(3));
        assert!(conv.pending().settlement.is_zero());
    }

    #[test]
    fn disabled_conversion_still_harvests() {
        let mut conv = converter(0, None);
        conv.set_conversion_enabled(OWNER, false).unwrap();
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(4));
        let report = harvest(&mut conv, &mut fx, &SimQuoter::Zero);
        assert!(matches!(report.conversion, ConversionOutcome::Deferred { reason: DeferReason::ConversionDisabled, .. }));
        assert_eq!(conv.pending().traded, units(4));
    }

    #[test]
    fn pool_id_mismatch_is_fatal_and_changes_nothing() {
        let mut conv = converter(0, None);
        let mut fx = Fixture::new(&conv);
        fx.accrue(&conv, U256::ZERO, units(4));
        let wrong = PoolKey::new(TOKEN, Address::ZERO, PoolIdentityInputs { fee: 500, ..inputs() }).id();
        conv.set_pool_identity_inputs(OWNER, inputs(), wrong).unwrap();

        let quoter = SimQuoter::Zero;
        let mut venue = Venue { pool: &mut fx.pool, quoter: &quoter, distributor: &mut fx.distributor };
        assert!(matches!(conv.harvest(&mut venue), Err(LiquidError::PoolIdMismatch { .. })));
        assert_eq!(conv.pending(), PendingRewards::default());
        assert_eq!(fx.pool.reserves(conv.pool_key()).unwrap().fees_owed1, units(4));
    }

    #[test]
    fn reentrant_harvest_is_rejected() {
        let mut conv = converter(0, None);
        let mut fx = Fixture::new(&conv);
        conv.latch.enter().unwrap();
        let quoter = SimQuoter::Zero;
        let mut venue = Venue { pool: &mut fx.pool, quoter: &quoter, distributor: &mut fx.distributor };
        assert_eq!(conv.harvest(&mut venue), Err(LiquidError::Reentrancy));
    }

    #[test]
    fn admin_updates_are_validated() {
        let mut conv = converter(300, Some(QUOTER));
        assert_eq!(conv.set_tolerance(TOKEN, 100), Err(LiquidError::Unauthorized(TOKEN)));
        assert_eq!(conv.set_tolerance(OWNER, 2_000), Err(LiquidError::ToleranceTooHigh(2_000)));
        assert_eq!(conv.set_quoter(OWNER, None), Err(LiquidError::QuoterRequired));
        conv.set_tolerance(OWNER, 0).unwrap();
        conv.set_quoter(OWNER, None).unwrap();
        assert_eq!(conv.slippage(), SlippageConfig { tolerance_bps: 0, quoter: None });
        assert!(conv.take_events().iter().any(|e| matches!(e, Event::ConfigUpdated { tolerance_bps: 0, .. })));
    }

    #[test]
    fn construction_rejects_bad_config() {
        let base = ConverterConfig {
            owner:            OWNER,
            token:            TOKEN,
            settlement:       Address::ZERO,
            pool:             inputs(),
            slippage:         SlippageConfig { tolerance_bps: 100, quoter: None },
            expected_pool_id: None,
        };
        assert_eq!(RewardsConverter::new(base.clone()).unwrap_err(), LiquidError::QuoterRequired);
        let no_owner = ConverterConfig { owner: Address::ZERO, slippage: SlippageConfig::default(), ..base.clone() };
        assert_eq!(RewardsConverter::new(no_owner).unwrap_err(), LiquidError::ZeroAddress("owner"));
    }
}
