//! Burn accumulator.
//!
//! Buffers ETH fee contributions and periodically swaps them into the
//! governance token, sending the output straight to the burn destination.
//! Swaps follow the same quote → bound → swap discipline as the rewards
//! converter; an adverse price, a missing or failing quoter, or a pool whose
//! fingerprint no longer matches leaves the ETH buffered for a later flush.
//!
//! Accounted deposits raise `pending`. ETH that arrives any other way (a raw
//! transfer while paused, a forced balance increase) only raises the held
//! balance; the gap is excess and can only leave through `sweep_excess`.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::constants::{DEAD_ADDRESS, NATIVE_ETH};
use crate::error::{LiquidError, Result};
use crate::events::{DeferReason, Event, EventLog};
use crate::guard::{only_owner, require_nonzero, ReentrancyLatch};
use crate::interfaces::{PriceQuoter, SettlementPool, SwapRequest};
use crate::pool_id::{verify_pool_id, PoolId, PoolIdentityInputs, PoolKey};
use crate::slippage::{self, SlippageConfig};
use crate::state::AccumulatorLedger;

fn default_true() -> bool {
    true
}

fn default_burn_destination() -> Address {
    DEAD_ADDRESS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnAccumulatorConfig {
    pub owner:            Address,
    pub pool_manager:     Address,
    #[serde(default = "default_burn_destination")]
    pub burn_destination: Address,
    pub governance_token: Address,
    #[serde(default)]
    pub settlement:       Address,
    pub pool:             PoolIdentityInputs,
    pub slippage:         SlippageConfig,
    /// Pending amount at which a deposit triggers a burn attempt; zero
    /// leaves burning to explicit flushes.
    #[serde(default)]
    pub burn_threshold:   U256,
    #[serde(default = "default_true")]
    pub enabled:          bool,
    #[serde(default)]
    pub expected_pool_id: Option<PoolId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BurnOutcome {
    /// Burning is switched off; nothing was attempted.
    Disabled,
    /// Nothing pending.
    Idle,
    Burned {
        eth_in:    U256,
        token_out: U256,
        min_out:   U256,
    },
    Deferred {
        reason:            DeferReason,
        eth_pending:       U256,
        attempted_min_out: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositReceipt {
    pub new_pending_total: U256,
    /// Present when the deposit crossed the burn threshold.
    pub burn:              Option<BurnOutcome>,
}

#[derive(Debug, Clone)]
pub struct BurnAccumulator {
    owner:            Address,
    pool_manager:     Address,
    burn_destination: Address,
    settlement:       Address,
    pool_key:         PoolKey,
    expected_pool_id: PoolId,
    slippage:         SlippageConfig,
    burn_threshold:   U256,
    enabled:          bool,
    paused:           bool,
    ledger:           AccumulatorLedger,
    latch:            ReentrancyLatch,
    events:           EventLog,
}

impl BurnAccumulator {
    pub fn new(config: BurnAccumulatorConfig) -> Result<Self> {
        require_nonzero(config.owner, "owner")?;
        require_nonzero(config.pool_manager, "pool manager")?;
        require_nonzero(config.burn_destination, "burn destination")?;
        require_nonzero(config.governance_token, "governance token")?;
        if config.governance_token == config.settlement {
            return Err(LiquidError::AssetNotInPool(config.settlement));
        }
        config.slippage.validate()?;

        let pool_key = PoolKey::new(config.settlement, config.governance_token, config.pool);
        Ok(Self {
            owner:            config.owner,
            pool_manager:     config.pool_manager,
            burn_destination: config.burn_destination,
            settlement:       config.settlement,
            expected_pool_id: config.expected_pool_id.unwrap_or_else(|| pool_key.id()),
            pool_key,
            slippage:         config.slippage,
            burn_threshold:   config.burn_threshold,
            enabled:          config.enabled,
            paused:           false,
            ledger:           AccumulatorLedger::default(),
            latch:            ReentrancyLatch::default(),
            events:           EventLog::default(),
        })
    }

    // ── Inbound ETH ──────────────────────────────────────────────────────────

    /// Accounted deposit. Refused while paused. May trigger a burn attempt,
    /// whose failure never fails the deposit.
    pub fn deposit(
        &mut self,
        depositor: Address,
        amount: U256,
        pool: &mut dyn SettlementPool,
        quoter: &dyn PriceQuoter,
    ) -> Result<DepositReceipt> {
        if self.paused {
            return Err(LiquidError::Paused);
        }
        if amount.is_zero() {
            return Err(LiquidError::ZeroAmount);
        }
        self.latch.enter()?;
        let result = self.deposit_locked(depositor, amount, pool, quoter);
        self.latch.exit();
        result
    }

    fn deposit_locked(
        &mut self,
        depositor: Address,
        amount: U256,
        pool: &mut dyn SettlementPool,
        quoter: &dyn PriceQuoter,
    ) -> Result<DepositReceipt> {
        let new_pending_total = self.ledger.account(amount)?;
        self.events.emit(Event::Deposited { depositor, amount, new_pending_total });

        let crossed = !self.burn_threshold.is_zero() && new_pending_total >= self.burn_threshold;
        let burn = if crossed && self.enabled && pool.address() == self.pool_manager {
            Some(self.try_burn(pool, quoter))
        } else {
            None
        };
        Ok(DepositReceipt {
            new_pending_total: self.ledger.pending,
            burn,
        })
    }

    /// Plain ETH transfer into the accumulator. Always accepted. Unless paused
    /// (or mid-operation) it goes down the deposit path, threshold burn
    /// included, and the receipt is returned; otherwise it is left as excess
    /// and `None` comes back.
    pub fn receive(
        &mut self,
        sender: Address,
        amount: U256,
        pool: &mut dyn SettlementPool,
        quoter: &dyn PriceQuoter,
    ) -> Result<Option<DepositReceipt>> {
        if amount.is_zero() {
            return Ok(None);
        }
        if self.paused || self.latch.is_busy() {
            self.ledger.hold(amount)?;
            self.events.emit(Event::UnaccountedReceipt { sender, amount });
            return Ok(None);
        }
        self.latch.enter()?;
        let result = self.deposit_locked(sender, amount, pool, quoter);
        self.latch.exit();
        result.map(Some)
    }

    /// Balance increase that bypasses every hook (e.g. a self-destruct
    /// payout). Never accounted.
    pub fn force_receive(&mut self, amount: U256) -> Result<()> {
        let held = self.ledger.hold(amount)?;
        self.events.emit(Event::ForcedReceipt { amount, held });
        Ok(())
    }

    // ── Burning ──────────────────────────────────────────────────────────────

    /// Try to swap every pending wei into the governance token and burn it.
    pub fn flush(&mut self, pool: &mut dyn SettlementPool, quoter: &dyn PriceQuoter) -> Result<BurnOutcome> {
        if self.paused {
            return Err(LiquidError::Paused);
        }
        self.latch.enter()?;
        let result = self.flush_locked(pool, quoter);
        self.latch.exit();
        result
    }

    fn flush_locked(&mut self, pool: &mut dyn SettlementPool, quoter: &dyn PriceQuoter) -> Result<BurnOutcome> {
        if !self.enabled {
            log::info!("Burn disabled; {} wei stays buffered", self.ledger.pending);
            return Ok(BurnOutcome::Disabled);
        }
        if pool.address() != self.pool_manager {
            return Err(LiquidError::NotPoolManager(pool.address()));
        }
        Ok(self.try_burn(pool, quoter))
    }

    fn try_burn(&mut self, pool: &mut dyn SettlementPool, quoter: &dyn PriceQuoter) -> BurnOutcome {
        let eth_in = self.ledger.pending;
        if eth_in.is_zero() {
            return BurnOutcome::Idle;
        }
        if let Err(e) = verify_pool_id(self.expected_pool_id, &self.pool_key) {
            log::warn!("Skipping burn: {e}");
            return self.burn_failed(DeferReason::PoolIdMismatch, U256::ZERO);
        }

        let zero_for_one = self.pool_key.currency0 == self.settlement;
        let min_out = match self.min_out(quoter, eth_in, zero_for_one) {
            Ok(min_out) => min_out,
            Err(reason) => return self.burn_failed(reason, U256::ZERO),
        };

        let mut staged = self.ledger;
        if let Err(e) = staged.release_pending(eth_in) {
            log::error!("Burn staging failed: {e}");
            return self.burn_failed(DeferReason::BoundOverflow, min_out);
        }
        let request = SwapRequest {
            amount_in:            eth_in,
            min_amount_out:       min_out,
            zero_for_one,
            sqrt_price_limit_x96: None,
            recipient:            self.burn_destination,
        };
        match pool.swap(&self.pool_key, &request) {
            Ok(token_out) => {
                self.ledger = staged;
                self.events.emit(Event::Burned { eth_in, token_out });
                BurnOutcome::Burned { eth_in, token_out, min_out }
            }
            Err(e) => {
                log::warn!("Burn swap failed: {e}");
                self.burn_failed(DeferReason::SwapReverted, min_out)
            }
        }
    }

    fn min_out(
        &self,
        quoter: &dyn PriceQuoter,
        eth_in: U256,
        zero_for_one: bool,
    ) -> std::result::Result<U256, DeferReason> {
        if !self.slippage.is_protected() {
            return Ok(U256::ZERO);
        }
        if !matches!(self.slippage.quoter, Some(q) if q != Address::ZERO) {
            return Err(DeferReason::QuoterUnset);
        }
        let quote = quoter.quote(&self.pool_key, eth_in, zero_for_one).map_err(|e| {
            log::warn!("Burn quote failed: {e}");
            DeferReason::QuoterReverted
        })?;
        if quote.is_zero() {
            return Err(DeferReason::ZeroQuote);
        }
        log::debug!("Burn quote: eth_in={eth_in} quoted_out={quote}");
        slippage::min_amount_out_from_quote(quote, self.slippage.tolerance_bps)
            .map_err(|_| DeferReason::BoundOverflow)
    }

    fn burn_failed(&mut self, reason: DeferReason, attempted_min_out: U256) -> BurnOutcome {
        let eth_pending = self.ledger.pending;
        self.events.emit(Event::BurnFailed {
            eth_in:      eth_pending,
            reason_code: reason.code(),
            reason,
        });
        BurnOutcome::Deferred { reason, eth_pending, attempted_min_out }
    }

    // ── Outbound ETH (owner) ─────────────────────────────────────────────────

    /// Take accounted ETH back out. `amount == 0` withdraws everything pending.
    pub fn withdraw(&mut self, caller: Address, to: Address, amount: U256) -> Result<U256> {
        only_owner(self.owner, caller)?;
        require_nonzero(to, "recipient")?;
        if self.paused {
            return Err(LiquidError::Paused);
        }
        self.latch.enter()?;
        let result = self.withdraw_locked(to, amount);
        self.latch.exit();
        result
    }

    fn withdraw_locked(&mut self, to: Address, amount: U256) -> Result<U256> {
        let amount = if amount.is_zero() { self.ledger.pending } else { amount };
        if amount.is_zero() {
            return Err(LiquidError::ZeroAmount);
        }
        self.ledger.release_pending(amount)?;
        self.events.emit(Event::Withdrawn { to, amount });
        Ok(amount)
    }

    /// Pay out exactly the unaccounted surplus. Allowed while paused; never
    /// touches `pending`.
    pub fn sweep_excess(&mut self, caller: Address, to: Address) -> Result<U256> {
        only_owner(self.owner, caller)?;
        require_nonzero(to, "recipient")?;
        self.latch.enter()?;
        let result = self.ledger.release_excess();
        self.latch.exit();
        let amount = result?;
        self.events.emit(Event::ExcessSwept { to, amount });
        Ok(amount)
    }

    // ── Administration ───────────────────────────────────────────────────────

    pub fn set_paused(&mut self, caller: Address, paused: bool) -> Result<()> {
        only_owner(self.owner, caller)?;
        self.paused = paused;
        self.events.emit(Event::Paused { is_paused: paused });
        Ok(())
    }

    pub fn set_burn_enabled(&mut self, caller: Address, enabled: bool) -> Result<()> {
        only_owner(self.owner, caller)?;
        self.enabled = enabled;
        self.emit_config();
        Ok(())
    }

    pub fn set_tolerance(&mut self, caller: Address, tolerance_bps: u16) -> Result<()> {
        only_owner(self.owner, caller)?;
        self.slippage = SlippageConfig::new(tolerance_bps, self.slippage.quoter)?;
        self.emit_config();
        Ok(())
    }

    pub fn set_quoter(&mut self, caller: Address, quoter: Option<Address>) -> Result<()> {
        only_owner(self.owner, caller)?;
        self.slippage = SlippageConfig::new(self.slippage.tolerance_bps, quoter)?;
        self.events.emit(Event::QuoterUpdated { quoter });
        Ok(())
    }

    pub fn set_burn_threshold(&mut self, caller: Address, threshold: U256) -> Result<()> {
        only_owner(self.owner, caller)?;
        self.burn_threshold = threshold;
        log::info!("Burn threshold set to {threshold}");
        Ok(())
    }

    /// New fee tier / tick spacing / hooks plus the fingerprint they are
    /// expected to produce. A mismatch is not rejected here; flushes skip
    /// the swap until the two agree.
    pub fn set_pool_identity_inputs(
        &mut self,
        caller: Address,
        inputs: PoolIdentityInputs,
        expected_pool_id: PoolId,
    ) -> Result<()> {
        only_owner(self.owner, caller)?;
        self.pool_key = self.pool_key.with_inputs(inputs);
        self.expected_pool_id = expected_pool_id;
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

    pub fn pool_manager(&self) -> Address {
        self.pool_manager
    }

    pub fn burn_destination(&self) -> Address {
        self.burn_destination
    }

    pub fn pool_key(&self) -> &PoolKey {
        &self.pool_key
    }

    pub fn expected_pool_id(&self) -> PoolId {
        self.expected_pool_id
    }

    pub fn slippage(&self) -> SlippageConfig {
        self.slippage
    }

    pub fn burn_threshold(&self) -> U256 {
        self.burn_threshold
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn ledger(&self) -> AccumulatorLedger {
        self.ledger
    }

    pub fn pending_amount(&self) -> U256 {
        self.ledger.pending
    }

    pub fn held_balance(&self) -> U256 {
        self.ledger.held
    }

    pub fn excess_amount(&self) -> U256 {
        self.ledger.excess()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take()
    }
}

impl Default for BurnAccumulatorConfig {
    fn default() -> Self {
        Self {
            owner:            Address::ZERO,
            pool_manager:     Address::ZERO,
            burn_destination: DEAD_ADDRESS,
            governance_token: Address::ZERO,
            settlement:       NATIVE_ETH,
            pool:             PoolIdentityInputs { fee: 10_000, tick_spacing: 200, hooks: Address::ZERO },
            slippage:         SlippageConfig::default(),
            burn_threshold:   U256::ZERO,
            enabled:          true,
            expected_pool_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{MemoryPool, SimQuoter};

    const OWNER: Address = Address::repeat_byte(0x0a);
    const GOV: Address = Address::repeat_byte(0x66);
    const QUOTER: Address = Address::repeat_byte(0x22);
    const POOL_MANAGER: Address = Address::repeat_byte(0x33);
    const USER: Address = Address::repeat_byte(0x77);

    const ETHER: u128 = 1_000_000_000_000_000_000;

    fn eth(tenths: u128) -> U256 {
        U256::from(tenths * ETHER / 10)
    }

    fn config(tolerance_bps: u16) -> BurnAccumulatorConfig {
        BurnAccumulatorConfig {
            owner:            OWNER,
            pool_manager:     POOL_MANAGER,
            governance_token: GOV,
            slippage:         SlippageConfig { tolerance_bps, quoter: Some(QUOTER) },
            ..Default::default()
        }
    }

    fn setup(tolerance_bps: u16) -> (BurnAccumulator, MemoryPool) {
        let acc = BurnAccumulator::new(config(tolerance_bps)).unwrap();
        let mut pool = MemoryPool::new(POOL_MANAGER);
        pool.initialize(*acc.pool_key(), eth(1_000), eth(1_000_000), Address::repeat_byte(0x01));
        (acc, pool)
    }

    #[test]
    fn sequential_deposits_sum_exactly() {
        let (mut acc, mut pool) = setup(100);
        let quoter = SimQuoter::Zero;
        for amount in [eth(5), eth(3), eth(2)] {
            acc.deposit(USER, amount, &mut pool, &quoter).unwrap();
        }
        assert_eq!(acc.pending_amount(), eth(10));
        assert_eq!(acc.held_balance(), eth(10));
        assert_eq!(acc.excess_amount(), U256::ZERO);
    }

    #[test]
    fn paused_accumulator_leaves_receipts_unaccounted() {
        let (mut acc, mut pool) = setup(100);
        let quoter = SimQuoter::Zero;
        acc.deposit(USER, eth(5), &mut pool, &quoter).unwrap();
        acc.set_paused(OWNER, true).unwrap();

        assert_eq!(acc.deposit(USER, eth(1), &mut pool, &quoter), Err(LiquidError::Paused));
        assert_eq!(acc.receive(USER, eth(10), &mut pool, &quoter).unwrap(), None);
        assert_eq!(acc.pending_amount(), eth(5));
        assert_eq!(acc.held_balance(), eth(15));

        // Excess sweeping stays available while paused.
        assert_eq!(acc.sweep_excess(OWNER, OWNER).unwrap(), eth(10));
        assert_eq!(acc.pending_amount(), eth(5));
        assert_eq!(acc.sweep_excess(OWNER, OWNER), Err(LiquidError::NoExcess));
        assert_eq!(acc.withdraw(OWNER, OWNER, U256::ZERO), Err(LiquidError::Paused));
        assert_eq!(acc.flush(&mut pool, &quoter), Err(LiquidError::Paused));
    }

    #[test]
    fn receive_while_live_is_a_deposit() {
        let (mut acc, mut pool) = setup(100);
        let receipt = acc.receive(USER, eth(4), &mut pool, &SimQuoter::Zero).unwrap();
        assert_eq!(receipt, Some(DepositReceipt { new_pending_total: eth(4), burn: None }));
        assert_eq!(acc.pending_amount(), eth(4));
        assert!(acc.events().iter().any(|e| matches!(e, Event::Deposited { depositor, .. } if *depositor == USER)));
    }

    #[test]
    fn withdraw_is_capped_by_pending() {
        let (mut acc, mut pool) = setup(100);
        acc.deposit(USER, eth(5), &mut pool, &SimQuoter::Zero).unwrap();
        acc.force_receive(eth(7)).unwrap();

        assert_eq!(
            acc.withdraw(OWNER, OWNER, eth(6)),
            Err(LiquidError::InsufficientPending { requested: eth(6), available: eth(5) })
        );
        assert_eq!(acc.withdraw(USER, USER, eth(1)), Err(LiquidError::Unauthorized(USER)));
        assert_eq!(acc.withdraw(OWNER, OWNER, eth(2)).unwrap(), eth(2));
        assert_eq!(acc.withdraw(OWNER, OWNER, U256::ZERO).unwrap(), eth(3));
        assert_eq!(acc.withdraw(OWNER, OWNER, U256::ZERO), Err(LiquidError::ZeroAmount));
        assert_eq!(acc.excess_amount(), eth(7));
    }

    #[test]
    fn flush_burns_into_the_destination() {
        let (mut acc, mut pool) = setup(300);
        acc.deposit(USER, eth(10), &mut pool, &SimQuoter::Zero).unwrap();
        let quoter = pool.snapshot_quoter(acc.pool_key());

        let BurnOutcome::Burned { eth_in, token_out, min_out } = acc.flush(&mut pool, &quoter).unwrap() else {
            panic!("expected burn");
        };
        assert_eq!(eth_in, eth(10));
        assert!(token_out >= min_out && !min_out.is_zero());
        assert_eq!(acc.ledger(), AccumulatorLedger::default());
        assert!(acc.events().contains(&Event::Burned { eth_in, token_out }));
    }

    #[test]
    fn adverse_price_defers_without_reverting() {
        let (mut acc, mut pool) = setup(10);
        acc.deposit(USER, eth(10), &mut pool, &SimQuoter::Zero).unwrap();
        let quoter = pool.snapshot_quoter(acc.pool_key());
        // Front-run: someone buys the governance token first.
        pool.push_price(acc.pool_key(), eth(50), true).unwrap();

        let outcome = acc.flush(&mut pool, &quoter).unwrap();
        assert!(matches!(outcome, BurnOutcome::Deferred { reason: DeferReason::SwapReverted, .. }));
        assert_eq!(acc.pending_amount(), eth(10));
        assert!(acc.events().iter().any(|e| matches!(e, Event::BurnFailed { reason_code: 5, .. })));
    }

    #[test]
    fn quoter_failures_defer() {
        let (mut acc, mut pool) = setup(100);
        acc.deposit(USER, eth(1), &mut pool, &SimQuoter::Zero).unwrap();
        for (quoter, reason) in [
            (SimQuoter::Zero, DeferReason::ZeroQuote),
            (SimQuoter::Reverting("down".into()), DeferReason::QuoterReverted),
        ] {
            let outcome = acc.flush(&mut pool, &quoter).unwrap();
            assert!(matches!(outcome, BurnOutcome::Deferred { reason: r, .. } if r == reason));
        }
        assert_eq!(acc.pending_amount(), eth(1));
    }

    #[test]
    fn disabled_flush_is_a_no_op() {
        let (mut acc, mut pool) = setup(100);
        acc.deposit(USER, eth(1), &mut pool, &SimQuoter::Zero).unwrap();
        acc.set_burn_enabled(OWNER, false).unwrap();
        assert_eq!(acc.flush(&mut pool, &SimQuoter::Zero).unwrap(), BurnOutcome::Disabled);
        assert_eq!(acc.pending_amount(), eth(1));
    }

    #[test]
    fn fingerprint_mismatch_skips_the_swap() {
        let (mut acc, mut pool) = setup(0);
        acc.deposit(USER, eth(1), &mut pool, &SimQuoter::Zero).unwrap();
        let stale_id = acc.expected_pool_id();
        let moved = PoolIdentityInputs { fee: 3_000, tick_spacing: 60, hooks: Address::ZERO };
        acc.set_pool_identity_inputs(OWNER, moved, stale_id).unwrap();

        let outcome = acc.flush(&mut pool, &SimQuoter::Zero).unwrap();
        assert!(matches!(outcome, BurnOutcome::Deferred { reason: DeferReason::PoolIdMismatch, .. }));
        assert_eq!(acc.pending_amount(), eth(1));
    }

    #[test]
    fn flush_requires_the_registered_pool_manager() {
        let (mut acc, _) = setup(0);
        let mut rogue = MemoryPool::new(Address::repeat_byte(0x99));
        assert_eq!(
            acc.flush(&mut rogue, &SimQuoter::Zero),
            Err(LiquidError::NotPoolManager(Address::repeat_byte(0x99)))
        );
    }

    #[test]
    fn threshold_triggers_an_opportunistic_burn() {
        let (mut acc, mut pool) = setup(0);
        acc.set_burn_threshold(OWNER, eth(5)).unwrap();
        let quoter = SimQuoter::Zero;

        let receipt = acc.deposit(USER, eth(2), &mut pool, &quoter).unwrap();
        assert_eq!(receipt.burn, None);
        pool.set_swaps_revert(true);
        let receipt = acc.deposit(USER, eth(3), &mut pool, &quoter).unwrap();
        assert!(matches!(receipt.burn, Some(BurnOutcome::Deferred { .. })));
        assert_eq!(receipt.new_pending_total, eth(5));

        pool.set_swaps_revert(false);
        let receipt = acc.deposit(USER, eth(1), &mut pool, &quoter).unwrap();
        assert!(matches!(receipt.burn, Some(BurnOutcome::Burned { eth_in, .. }) if eth_in == eth(6)));
        assert_eq!(receipt.new_pending_total, U256::ZERO);
    }

    #[test]
    fn receive_crosses_the_threshold_like_a_deposit() {
        let (mut acc, mut pool) = setup(0);
        acc.set_burn_threshold(OWNER, eth(5)).unwrap();
        let quoter = SimQuoter::Zero;

        let receipt = acc.receive(USER, eth(6), &mut pool, &quoter).unwrap().unwrap();
        assert!(matches!(receipt.burn, Some(BurnOutcome::Burned { eth_in, .. }) if eth_in == eth(6)));
        assert_eq!(receipt.new_pending_total, U256::ZERO);
        assert_eq!(acc.held_balance(), U256::ZERO);
    }

    #[test]
    fn forced_receipts_are_reported() {
        let (mut acc, _) = setup(100);
        acc.force_receive(eth(3)).unwrap();
        assert_eq!(acc.pending_amount(), U256::ZERO);
        assert!(acc.events().contains(&Event::ForcedReceipt { amount: eth(3), held: eth(3) }));
    }

    #[test]
    fn missing_quoter_defers_the_burn() {
        let (mut acc, mut pool) = setup(100);
        acc.deposit(USER, eth(2), &mut pool, &SimQuoter::Zero).unwrap();
        // Bypasses validation; the setters never allow this combination.
        acc.slippage = SlippageConfig { tolerance_bps: 100, quoter: None };

        let outcome = acc.flush(&mut pool, &SimQuoter::Fixed(eth(1))).unwrap();
        assert_eq!(outcome, BurnOutcome::Deferred {
            reason:            DeferReason::QuoterUnset,
            eth_pending:       eth(2),
            attempted_min_out: U256::ZERO,
        });
        assert_eq!(acc.pending_amount(), eth(2));
    }

    #[test]
    fn construction_validates_addresses_and_tolerance() {
        let bad = |f: fn(&mut BurnAccumulatorConfig)| {
            let mut c = config(100);
            f(&mut c);
            BurnAccumulator::new(c).unwrap_err()
        };
        assert_eq!(bad(|c| c.pool_manager = Address::ZERO), LiquidError::ZeroAddress("pool manager"));
        assert_eq!(bad(|c| c.burn_destination = Address::ZERO), LiquidError::ZeroAddress("burn destination"));
        assert_eq!(bad(|c| c.slippage.quoter = None), LiquidError::QuoterRequired);
        assert_eq!(bad(|c| c.slippage.tolerance_bps = 1_500), LiquidError::ToleranceTooHigh(1_500));
    }

    #[test]
    fn admin_is_owner_only() {
        let (mut acc, _) = setup(100);
        assert_eq!(acc.set_paused(USER, true), Err(LiquidError::Unauthorized(USER)));
        assert_eq!(acc.sweep_excess(USER, USER), Err(LiquidError::Unauthorized(USER)));
        assert_eq!(acc.set_quoter(OWNER, None), Err(LiquidError::QuoterRequired));
        acc.set_paused(OWNER, true).unwrap();
        assert!(acc.take_events().contains(&Event::Paused { is_paused: true }));
    }
}
