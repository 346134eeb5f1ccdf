//! Backtest workflow: price file → simulation → ledger → report.

use std::path::Path;

use chrono::Utc;
use log::info;
use thbfolio::simulation::{Simulation, SimulationConfig, SimulationReport};
use thbfolio::{Symbol, TargetAllocation, Timestamp};
use thbfolio_broker::BrokerError;
use thbfolio_broker::bitkub::{BitkubClient, market_symbol};

use crate::config::Config;
use crate::display;
use crate::error::{Error, Result};
use crate::history::{self, PriceTable};
use crate::ledger::TradeLedger;

const SECS_PER_DAY: i64 = 86_400;

/// Replay `targets` over the prices in `prices_file` and write the backtest
/// ledger. `seed_capital` overrides the configured seed.
pub fn run(
    config: &Config,
    targets: &TargetAllocation,
    prices_file: &Path,
    seed_capital: Option<f64>,
) -> Result<SimulationReport> {
    let table = history::load_price_table(prices_file, targets.cash())?;
    table.validate_targets(targets)?;
    info!(
        "Backtesting {} periods from {}",
        table.len(),
        prices_file.display()
    );

    let seed_capital = seed_capital.unwrap_or(config.backtest.seed_capital);
    if !(seed_capital.is_finite() && seed_capital > 0.0) {
        return Err(Error::Config(format!("seed capital must be > 0, got {seed_capital}")));
    }

    let simulation = Simulation::new(SimulationConfig {
        targets: targets.clone(),
        params: config.params(),
        seed_capital,
        bank: config.withdrawal.bank.clone(),
        withdrawal: config.withdrawal_schedule(),
    })?;
    let report = simulation.run(&table.points())?;

    TradeLedger::create(&config.backtest_log_path())?.record_all(&report.trades)?;
    info!(
        "{} trades written to {}",
        report.trades.len(),
        config.backtest_log_path().display()
    );
    Ok(report)
}

/// Print the summary and curve statistics of a finished backtest.
pub fn print_report(report: &SimulationReport) {
    println!(
        "{} periods, {} trades, {} skipped",
        report.curve.len(),
        report.trades.len(),
        report.skips.len()
    );
    if !report.trades.is_empty() {
        println!("\nLast trades:");
        let tail = report.trades.len().saturating_sub(10);
        print!("{}", display::trades_table(&report.trades[tail..]));
    }
    println!("\n{}", report.summary);
    println!(
        "Excess profit over buy and hold: {} THB",
        display::format_number(report.summary.excess_profit(), 2)
    );

    if let Some(stats) = &report.rebalanced_stats {
        println!("\nRebalanced curve\n{stats}");
    }
    if let Some(stats) = &report.baseline_stats {
        println!("Buy and hold curve\n{stats}");
    }
}

/// Download closing prices for every target asset over the last `days` days.
pub fn fetch_history(
    client: &BitkubClient,
    targets: &TargetAllocation,
    days: u32,
    resolution: &str,
) -> Result<PriceTable> {
    let to = Utc::now().timestamp();
    let from = to - i64::from(days) * SECS_PER_DAY;
    collect_series(targets, |asset| {
        client.history(&market_symbol(asset), resolution, from, to)
    })
}

/// Fetch one series per target asset and merge them into a table.
fn collect_series<F>(targets: &TargetAllocation, mut fetch: F) -> Result<PriceTable>
where
    F: FnMut(Symbol) -> std::result::Result<Vec<(Timestamp, f64)>, BrokerError>,
{
    let mut series = Vec::new();
    for (asset, _) in targets.assets() {
        let closes = fetch(asset)?;
        if closes.is_empty() {
            return Err(Error::History(format!("no price history for {asset}")));
        }
        info!("Fetched {} closes for {asset}", closes.len());
        series.push((asset, closes));
    }
    history::merge_series(targets.cash(), series)
}
