mod scenario;

use std::path::{Path, PathBuf};

use alloy_primitives::{Address, U160};
use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;

use liquid_protocol::constants::MAX_SLIPPAGE_BPS;
use liquid_protocol::{slippage, PoolIdentityInputs, PoolKey};

use crate::scenario::{parse_amount, Report, Scenario, Simulation};

// ─── Version banner ───────────────────────────────────────────────────────────

fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  Liquid  v{ver}  ·  fee conversion and burn tooling");
    println!("  {}", "─".repeat(62));
    println!("  Slippage  quote × (1 − tolerance), rounded up, capped at {MAX_SLIPPAGE_BPS} bps");
    println!("  Pools     v4 PoolKey, native ETH = 0x0000…0000");
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// Liquid: slippage bounds, pool ids, and offline simulations.
///
/// Every command supports --json for machine-readable output.
/// Set RUST_LOG=debug to see quotes and bounds as they are computed.
#[derive(Parser)]
#[command(
    name        = "liquid",
    version     = env!("CARGO_PKG_VERSION"),
    about       = "Operator tooling for Liquid token fee conversion and burning.",
    after_help  = "\
ENVIRONMENT:
  LIQUID_JSON    Set to true to default to JSON output
  RUST_LOG       Log filter for protocol tracing  [default: warn]

QUICK START:
  liquid min-out  --sqrt-price 79228162514264337593543950336 --amount 1000000 --tolerance-bps 100
  liquid pool-id  --token-a 0x0000000000000000000000000000000000000000 \\
                  --token-b 0x1111111111111111111111111111111111111111 --fee 10000 --tick-spacing 200
  liquid simulate --config packages/cli/scenarios/adverse-move.toml"
)]
struct Cli {
    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false, env = "LIQUID_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the minimum acceptable output for a swap
    ///
    /// Uses either a reference sqrt price (Q64.96) or a quoted output.
    /// Every rounding step rounds up, so the bound is never looser than
    /// the exact one. A tolerance of 0 disables the bound.
    #[command(
        after_help = "\
EXAMPLES:
  # 1% below a price of 1.0, token0 → token1
  liquid min-out --sqrt-price 79228162514264337593543950336 --amount 1000000 --tolerance-bps 100

  # 0.5% below a quote
  liquid min-out --quote 2500000000 --tolerance-bps 50 --json"
    )]
    MinOut {
        /// Reference Q64.96 sqrt price (token1 per token0)
        #[arg(long, value_name = "SQRT_PRICE_X96", conflicts_with = "quote")]
        sqrt_price: Option<String>,

        /// Quoted output to shave instead of a price
        #[arg(long, value_name = "AMOUNT")]
        quote: Option<String>,

        /// Input amount (wei, or e.g. "1.5eth"); required with --sqrt-price
        #[arg(long, value_name = "AMOUNT")]
        amount: Option<String>,

        /// Tolerance in basis points (max 1000)
        #[arg(long, value_name = "BPS", default_value_t = 300)]
        tolerance_bps: u16,

        /// Swap direction is token1 → token0
        #[arg(long, default_value_t = false)]
        one_for_zero: bool,
    },

    /// Compute the canonical pool id for a pair and its identity inputs
    #[command(
        after_help = "\
EXAMPLES:
  liquid pool-id --token-a 0x1111111111111111111111111111111111111111 \\
                 --token-b 0x0000000000000000000000000000000000000000 --fee 10000 --tick-spacing 200

NOTES:
  Token order does not matter; the lower address becomes currency0."
    )]
    PoolId {
        #[arg(long, value_name = "ADDRESS")]
        token_a: Address,

        #[arg(long, value_name = "ADDRESS")]
        token_b: Address,

        /// LP fee in pips (1_000_000 = 100%)
        #[arg(long, value_name = "PIPS")]
        fee: u32,

        #[arg(long, value_name = "TICKS", allow_hyphen_values = true)]
        tick_spacing: i32,

        #[arg(long, value_name = "ADDRESS", default_value = "0x0000000000000000000000000000000000000000")]
        hooks: Address,
    },

    /// Run a TOML scenario against in-memory pools and print every event
    #[command(
        after_help = "\
EXAMPLES:
  liquid simulate --config packages/cli/scenarios/adverse-move.toml
  RUST_LOG=info liquid simulate --config my-scenario.toml --json"
    )]
    Simulate {
        /// Scenario file
        #[arg(long, value_name = "PATH", env = "LIQUID_SCENARIO")]
        config: PathBuf,
    },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::MinOut { sqrt_price, quote, amount, tolerance_bps, one_for_zero } => {
            cmd_min_out(
                sqrt_price.as_deref(), quote.as_deref(), amount.as_deref(),
                *tolerance_bps, !*one_for_zero,
                cli.json,
            )?;
        }
        Commands::PoolId { token_a, token_b, fee, tick_spacing, hooks } => {
            let inputs = PoolIdentityInputs { fee: *fee, tick_spacing: *tick_spacing, hooks: *hooks };
            cmd_pool_id(*token_a, *token_b, inputs, cli.json)?;
        }
        Commands::Simulate { config } => {
            cmd_simulate(config, cli.json)?;
        }
    }

    Ok(())
}

// ─── min-out ──────────────────────────────────────────────────────────────────

fn cmd_min_out(
    sqrt_price: Option<&str>,
    quote: Option<&str>,
    amount: Option<&str>,
    tolerance_bps: u16,
    zero_for_one: bool,
    json_output: bool,
) -> Result<()> {
    slippage::validate_tolerance(tolerance_bps).context("--tolerance-bps")?;

    let (reference, min_out) = match (sqrt_price, quote) {
        (Some(price), _) => {
            let amount = amount.ok_or_else(|| anyhow!("--amount is required with --sqrt-price"))?;
            let amount = parse_amount(amount).context("--amount")?;
            let price = price.parse::<U160>().map_err(|e| anyhow!("--sqrt-price: {e}"))?;
            let expected = slippage::expected_amount_out(price, amount, zero_for_one)?;
            let min_out = slippage::min_amount_out(price, amount, tolerance_bps, zero_for_one)?;
            (expected, min_out)
        }
        (None, Some(quote)) => {
            let quote = parse_amount(quote).context("--quote")?;
            (quote, slippage::min_amount_out_from_quote(quote, tolerance_bps)?)
        }
        (None, None) => return Err(anyhow!("Pass either --sqrt-price with --amount, or --quote.")),
    };

    if json_output {
        println!("{}", json!({
            "status":         "ok",
            "command":        "min-out",
            "reference_out":  reference,
            "tolerance_bps":  tolerance_bps,
            "zero_for_one":   zero_for_one,
            "min_amount_out": min_out,
        }));
    } else {
        let dir = if zero_for_one { "token0 → token1" } else { "token1 → token0" };
        println!("─── Slippage Bound ───────────────────────────────────────────────");
        println!("  Direction        {dir}");
        println!("  Reference out    {:>40}", reference);
        println!("  Tolerance        {:>36} bps", tolerance_bps);
        println!("  Min amount out   {:>40}", min_out);
        if tolerance_bps == 0 {
            println!();
            println!("  Tolerance 0: the swap runs unprotected (min out = 0).");
        }
    }
    Ok(())
}

// ─── pool-id ──────────────────────────────────────────────────────────────────

fn cmd_pool_id(token_a: Address, token_b: Address, inputs: PoolIdentityInputs, json_output: bool) -> Result<()> {
    if token_a == token_b {
        return Err(anyhow!("--token-a and --token-b must be different."));
    }
    let key = PoolKey::new(token_a, token_b, inputs);
    let id = key.id();

    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "pool-id",
            "key":     key,
            "pool_id": id,
        }));
    } else {
        println!("─── Pool Identity ────────────────────────────────────────────────");
        println!("  currency0        {}", key.currency0);
        println!("  currency1        {}", key.currency1);
        println!("  fee (pips)       {}", key.fee);
        println!("  tick spacing     {}", key.tick_spacing);
        println!("  hooks            {}", key.hooks);
        println!();
        println!("  Pool id          {id}");
    }
    Ok(())
}

// ─── simulate ─────────────────────────────────────────────────────────────────

fn cmd_simulate(path: &Path, json_output: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let report = Simulation::new(&scenario)
        .context("Scenario configuration rejected")?
        .run(&scenario);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report)?;
    }
    Ok(())
}

fn print_report(report: &Report) -> Result<()> {
    let title = report.name.as_deref().unwrap_or("scenario");
    println!("─── Simulation: {title} ───────────────────────────────────────────");
    for record in &report.steps {
        let action = serde_json::to_value(&record.step)?;
        let action = action.get("action").and_then(|a| a.as_str()).unwrap_or("?").to_string();
        match record.outcome.get("error") {
            Some(err) => println!("  #{:<3} {action:<24} FAILED  {err}", record.index),
            None => println!("  #{:<3} {action:<24} ok      {}", record.index, record.outcome),
        }
        for event in &record.events {
            println!("        · {}", serde_json::to_string(event)?);
        }
    }

    let f = &report.final_state;
    println!();
    println!("  ─── Final Ledgers ────────────────────────────────");
    println!("  Converter pending ETH    {:>32}", f.converter_pending_eth);
    println!("  Converter pending token  {:>32}", f.converter_pending_token);
    println!("  Accumulator pending      {:>32}", f.accumulator_pending);
    println!("  Accumulator held         {:>32}", f.accumulator_held);
    println!("  Accumulator excess       {:>32}", f.accumulator_excess);
    println!("  Undistributed trade fees {:>32}", f.undistributed_trade_fees);
    println!("  Paid to protocol         {:>32}", f.distributed_protocol);
    println!("  Paid to creator          {:>32}", f.distributed_creator);
    println!("  Paid to referrer         {:>32}", f.distributed_referrer);
    println!();
    Ok(())
}
