//! TOML-scripted simulations against the in-memory pool manager.

use std::path::Path;

use alloy_primitives::{Address, U256};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use liquid_protocol::constants::{DEAD_ADDRESS, DEFAULT_SLIPPAGE_BPS};
use liquid_protocol::sim::{MemoryPool, QuoteBook, SimQuoter, SplitDistributor};
use liquid_protocol::{
    BurnAccumulator, BurnAccumulatorConfig, ConverterConfig, Event, HarvestOverrides, LiquidToken,
    PoolIdentityInputs, PoolKey, PriceQuoter, SettlementPool, SlippageConfig, TradeFeeConfig, TradeVenue,
    Venue,
};

const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;

// ─── Amounts ──────────────────────────────────────────────────────────────────

/// An amount written as an integer number of wei, a decimal string of wei,
/// or a string with an `eth` suffix (`"0.5 eth"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAmount")]
pub struct Amount(pub U256);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Int(u64),
    Text(String),
}

impl TryFrom<RawAmount> for Amount {
    type Error = String;

    fn try_from(raw: RawAmount) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawAmount::Int(v) => Ok(Amount(U256::from(v))),
            RawAmount::Text(s) => parse_amount(&s).map(Amount).map_err(|e| e.to_string()),
        }
    }
}

/// Parse `"1500"`, `"0x5dc"`, `"1.5 eth"`, or `"2eth"` into wei.
pub fn parse_amount(text: &str) -> Result<U256> {
    let text = text.trim();
    let Some(number) = text.strip_suffix("eth").map(str::trim_end) else {
        return text.parse::<U256>().map_err(|e| anyhow!("invalid amount '{text}': {e}"));
    };
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if frac.len() > 18 {
        bail!("'{text}' has more than 18 decimals");
    }
    let whole: U256 = if whole.is_empty() { U256::ZERO } else { whole.parse()? };
    let frac_wei: U256 = if frac.is_empty() {
        U256::ZERO
    } else {
        format!("{frac:0<18}").parse()?
    };
    whole
        .checked_mul(U256::from(WEI_PER_ETH))
        .and_then(|w| w.checked_add(frac_wei))
        .ok_or_else(|| anyhow!("'{text}' overflows 256 bits"))
}

// ─── Scenario file ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Accounts {
    pub owner:            Address,
    pub token:            Address,
    pub governance_token: Address,
    pub pool_manager:     Address,
    pub trader:           Address,
    /// Quoter address registered with the converter and the accumulator.
    #[serde(default)]
    pub quoter:           Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolSetup {
    pub fee:           u32,
    pub tick_spacing:  i32,
    #[serde(default)]
    pub hooks:         Address,
    pub eth_reserve:   Amount,
    pub token_reserve: Amount,
}

impl PoolSetup {
    fn inputs(&self) -> PoolIdentityInputs {
        PoolIdentityInputs { fee: self.fee, tick_spacing: self.tick_spacing, hooks: self.hooks }
    }
}

fn default_tolerance() -> u16 {
    DEFAULT_SLIPPAGE_BPS
}

fn default_true() -> bool {
    true
}

fn default_burn_destination() -> Address {
    DEAD_ADDRESS
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConverterSetup {
    #[serde(default = "default_tolerance")]
    pub tolerance_bps: u16,
}

impl Default for ConverterSetup {
    fn default() -> Self {
        Self { tolerance_bps: DEFAULT_SLIPPAGE_BPS }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccumulatorSetup {
    #[serde(default = "default_tolerance")]
    pub tolerance_bps:    u16,
    #[serde(default)]
    pub burn_threshold:   Amount,
    #[serde(default = "default_burn_destination")]
    pub burn_destination: Address,
    #[serde(default = "default_true")]
    pub enabled:          bool,
}

impl Default for AccumulatorSetup {
    fn default() -> Self {
        Self {
            tolerance_bps:    DEFAULT_SLIPPAGE_BPS,
            burn_threshold:   Amount::default(),
            burn_destination: DEAD_ADDRESS,
            enabled:          true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitSetup {
    pub protocol:     Address,
    pub creator:      Address,
    pub creator_bps:  u16,
    #[serde(default)]
    pub referrer:     Option<Address>,
    #[serde(default)]
    pub referrer_bps: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolTarget {
    Token,
    Burn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoterMode {
    /// Quotes track the pool as of the start of each step.
    Live,
    /// Quotes stay at the prices seen when this mode was entered.
    Frozen,
    /// Every quote reverts.
    Offline,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    Buy {
        eth_in:  Amount,
        #[serde(default)]
        min_out: Amount,
        #[serde(default)]
        harvest: bool,
    },
    Sell {
        tokens_in: Amount,
        #[serde(default)]
        min_out:   Amount,
        #[serde(default)]
        harvest:   bool,
    },
    /// Credit LP fees to the token's position directly.
    AccrueFees {
        #[serde(default)]
        eth:   Amount,
        #[serde(default)]
        token: Amount,
    },
    Harvest,
    /// Explicit harvest; `use_pool_price` supplies the live pool price as
    /// the reference instead of asking the quoter.
    HarvestNow {
        #[serde(default)]
        caller:         Option<Address>,
        #[serde(default)]
        tolerance_bps:  Option<u16>,
        #[serde(default)]
        use_pool_price: bool,
    },
    Deposit {
        amount: Amount,
    },
    Receive {
        amount: Amount,
    },
    ForceReceive {
        amount: Amount,
    },
    Flush,
    Withdraw {
        #[serde(default)]
        amount: Amount,
    },
    SweepExcess,
    PushPrice {
        pool:         PoolTarget,
        amount:       Amount,
        zero_for_one: bool,
    },
    Quoter {
        mode: QuoterMode,
    },
    Pause {
        paused: bool,
    },
    SetTolerance {
        target: PoolTarget,
        bps:    u16,
    },
    SetBurnEnabled {
        enabled: bool,
    },
    SetConversionEnabled {
        enabled: bool,
    },
}

// Amount only needs to appear in JSON reports as its wei value.
impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name:        Option<String>,
    pub accounts:    Accounts,
    pub token_pool:  PoolSetup,
    pub burn_pool:   PoolSetup,
    #[serde(default)]
    pub converter:   ConverterSetup,
    #[serde(default)]
    pub accumulator: AccumulatorSetup,
    #[serde(default)]
    pub fees:        TradeFeeConfig,
    pub split:       SplitSetup,
    #[serde(default, rename = "step")]
    pub steps:       Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Failed to parse scenario TOML: {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

// ─── Runner ───────────────────────────────────────────────────────────────────

enum Quotes {
    Live,
    Frozen(QuoteBook),
    Offline,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index:   usize,
    pub step:    Step,
    /// `Ok` payload of the step, or `{"error": ...}` when it failed.
    pub outcome: serde_json::Value,
    pub events:  Vec<Event>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalState {
    pub converter_pending_eth:    U256,
    pub converter_pending_token:  U256,
    pub accumulator_pending:      U256,
    pub accumulator_held:         U256,
    pub accumulator_excess:       U256,
    pub undistributed_trade_fees: U256,
    pub distributed_protocol:     U256,
    pub distributed_creator:      U256,
    pub distributed_referrer:     U256,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub name:        Option<String>,
    pub steps:       Vec<StepRecord>,
    pub final_state: FinalState,
}

pub struct Simulation {
    accounts:    Accounts,
    token:       LiquidToken,
    accumulator: BurnAccumulator,
    pool:        MemoryPool,
    distributor: SplitDistributor,
    quotes:      Quotes,
}

impl Simulation {
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let accounts = scenario.accounts.clone();
        let token = LiquidToken::new(
            ConverterConfig {
                owner:            accounts.owner,
                token:            accounts.token,
                settlement:       Address::ZERO,
                pool:             scenario.token_pool.inputs(),
                slippage:         SlippageConfig::new(scenario.converter.tolerance_bps, accounts.quoter)?,
                expected_pool_id: None,
            },
            scenario.fees,
        )
        .context("converter configuration")?;

        let accumulator = BurnAccumulator::new(BurnAccumulatorConfig {
            owner:            accounts.owner,
            pool_manager:     accounts.pool_manager,
            burn_destination: scenario.accumulator.burn_destination,
            governance_token: accounts.governance_token,
            settlement:       Address::ZERO,
            pool:             scenario.burn_pool.inputs(),
            slippage:         SlippageConfig::new(scenario.accumulator.tolerance_bps, accounts.quoter)?,
            burn_threshold:   scenario.accumulator.burn_threshold.0,
            enabled:          scenario.accumulator.enabled,
            expected_pool_id: None,
        })
        .context("accumulator configuration")?;

        let mut pool = MemoryPool::new(accounts.pool_manager);
        seed_pool(&mut pool, token.converter().pool_key(), &scenario.token_pool, accounts.token);
        seed_pool(&mut pool, accumulator.pool_key(), &scenario.burn_pool, Address::ZERO);

        let split = &scenario.split;
        let mut distributor = SplitDistributor::new(split.protocol, split.creator, split.creator_bps);
        if let Some(referrer) = split.referrer {
            distributor = distributor.with_referrer(referrer, split.referrer_bps);
        }

        Ok(Self { accounts, token, accumulator, pool, distributor, quotes: Quotes::Live })
    }

    pub fn run(mut self, scenario: &Scenario) -> Report {
        let mut steps = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            log::debug!("Step {index}: {step:?}");
            let outcome = match self.apply(step) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Step {index} failed: {e:#}");
                    serde_json::json!({ "error": format!("{e:#}") })
                }
            };
            steps.push(StepRecord { index, step: step.clone(), outcome, events: self.drain_events() });
        }
        Report { name: scenario.name.clone(), steps, final_state: self.final_state() }
    }

    fn quoter(&self) -> Box<dyn PriceQuoter> {
        match &self.quotes {
            Quotes::Live => Box::new(self.pool.snapshot_book()),
            Quotes::Frozen(book) => Box::new(book.clone()),
            Quotes::Offline => Box::new(SimQuoter::Reverting("quoter offline".into())),
        }
    }

    fn apply(&mut self, step: &Step) -> Result<serde_json::Value> {
        let quoter = self.quoter();
        let owner = self.accounts.owner;
        let trader = self.accounts.trader;

        let value = match step {
            Step::Buy { eth_in, min_out, harvest } => {
                let mut venue = TradeVenue {
                    pool:        &mut self.pool,
                    quoter:      quoter.as_ref(),
                    distributor: &mut self.distributor,
                    accumulator: &mut self.accumulator,
                };
                let receipt = self.token.buy(trader, eth_in.0, min_out.0, *harvest, &mut venue)?;
                serde_json::to_value(receipt)?
            }
            Step::Sell { tokens_in, min_out, harvest } => {
                let mut venue = TradeVenue {
                    pool:        &mut self.pool,
                    quoter:      quoter.as_ref(),
                    distributor: &mut self.distributor,
                    accumulator: &mut self.accumulator,
                };
                let receipt = self.token.sell(trader, tokens_in.0, min_out.0, *harvest, &mut venue)?;
                serde_json::to_value(receipt)?
            }
            Step::AccrueFees { eth, token } => {
                let key = *self.token.converter().pool_key();
                // ETH is always currency0
                self.pool.accrue_fees(&key, eth.0, token.0)?;
                serde_json::json!({ "accrued_eth": eth.0, "accrued_token": token.0 })
            }
            Step::Harvest => {
                let mut venue = Venue {
                    pool:        &mut self.pool,
                    quoter:      quoter.as_ref(),
                    distributor: &mut self.distributor,
                };
                serde_json::to_value(self.token.converter_mut().harvest(&mut venue)?)?
            }
            Step::HarvestNow { caller, tolerance_bps, use_pool_price } => {
                let key = *self.token.converter().pool_key();
                let sqrt_price_x96 = if *use_pool_price {
                    Some(self.pool.current_sqrt_price(&key)?)
                } else {
                    None
                };
                let overrides = HarvestOverrides {
                    sqrt_price_x96,
                    tolerance_bps: *tolerance_bps,
                    sqrt_price_limit_x96: None,
                };
                let mut venue = Venue {
                    pool:        &mut self.pool,
                    quoter:      quoter.as_ref(),
                    distributor: &mut self.distributor,
                };
                let report = self
                    .token
                    .converter_mut()
                    .harvest_now(caller.unwrap_or(owner), &mut venue, overrides)?;
                serde_json::to_value(report)?
            }
            Step::Deposit { amount } => {
                let receipt = self.accumulator.deposit(trader, amount.0, &mut self.pool, quoter.as_ref())?;
                serde_json::to_value(receipt)?
            }
            Step::Receive { amount } => {
                match self.accumulator.receive(trader, amount.0, &mut self.pool, quoter.as_ref())? {
                    Some(receipt) => serde_json::json!({ "accounted": true, "receipt": receipt }),
                    None => serde_json::json!({ "accounted": false }),
                }
            }
            Step::ForceReceive { amount } => {
                self.accumulator.force_receive(amount.0)?;
                serde_json::json!({ "held": self.accumulator.held_balance() })
            }
            Step::Flush => serde_json::to_value(self.accumulator.flush(&mut self.pool, quoter.as_ref())?)?,
            Step::Withdraw { amount } => {
                let taken = self.accumulator.withdraw(owner, owner, amount.0)?;
                serde_json::json!({ "withdrawn": taken })
            }
            Step::SweepExcess => {
                let swept = self.accumulator.sweep_excess(owner, owner)?;
                serde_json::json!({ "swept": swept })
            }
            Step::PushPrice { pool, amount, zero_for_one } => {
                let key = self.pool_key(*pool);
                let out = self.pool.push_price(&key, amount.0, *zero_for_one)?;
                serde_json::json!({ "amount_out": out })
            }
            Step::Quoter { mode } => {
                self.quotes = match mode {
                    QuoterMode::Live => Quotes::Live,
                    QuoterMode::Frozen => Quotes::Frozen(self.pool.snapshot_book()),
                    QuoterMode::Offline => Quotes::Offline,
                };
                serde_json::json!({ "quoter": mode })
            }
            Step::Pause { paused } => {
                self.accumulator.set_paused(owner, *paused)?;
                serde_json::json!({ "paused": paused })
            }
            Step::SetTolerance { target, bps } => {
                match target {
                    PoolTarget::Token => self.token.converter_mut().set_tolerance(owner, *bps)?,
                    PoolTarget::Burn => self.accumulator.set_tolerance(owner, *bps)?,
                }
                serde_json::json!({ "tolerance_bps": bps })
            }
            Step::SetBurnEnabled { enabled } => {
                self.accumulator.set_burn_enabled(owner, *enabled)?;
                serde_json::json!({ "burn_enabled": enabled })
            }
            Step::SetConversionEnabled { enabled } => {
                self.token.converter_mut().set_conversion_enabled(owner, *enabled)?;
                serde_json::json!({ "conversion_enabled": enabled })
            }
        };
        Ok(value)
    }

    fn pool_key(&self, target: PoolTarget) -> PoolKey {
        match target {
            PoolTarget::Token => *self.token.converter().pool_key(),
            PoolTarget::Burn => *self.accumulator.pool_key(),
        }
    }

    fn drain_events(&mut self) -> Vec<Event> {
        let mut events = self.token.take_events();
        events.extend(self.token.converter_mut().take_events());
        events.extend(self.accumulator.take_events());
        events
    }

    fn final_state(&self) -> FinalState {
        let pending = self.token.converter().pending();
        let split = &self.distributor;
        FinalState {
            converter_pending_eth:    pending.settlement,
            converter_pending_token:  pending.traded,
            accumulator_pending:      self.accumulator.pending_amount(),
            accumulator_held:         self.accumulator.held_balance(),
            accumulator_excess:       self.accumulator.excess_amount(),
            undistributed_trade_fees: self.token.undistributed(),
            distributed_protocol:     split.received(split.protocol),
            distributed_creator:      split.received(split.creator),
            distributed_referrer:     split.received(split.referrer),
        }
    }
}

fn seed_pool(pool: &mut MemoryPool, key: &PoolKey, setup: &PoolSetup, lp_owner: Address) {
    // ETH is the zero address, so it always sorts into currency0.
    pool.initialize(*key, setup.eth_reserve.0, setup.token_reserve.0, lp_owner);
}
