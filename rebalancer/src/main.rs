//! CLI entry point for the THB portfolio rebalancer.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::info;

use thbfolio::TargetAllocation;
use thbfolio_broker::bitkub::BitkubClient;
use thbfolio_rebalancer::config::{self, Config};
use thbfolio_rebalancer::error::{Error, Result};
use thbfolio_rebalancer::execution::{self, RunOptions};
use thbfolio_rebalancer::target::TargetSpec;
use thbfolio_rebalancer::{backtest, display, liquidity};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Threshold rebalancer for THB crypto portfolios on Bitkub")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan, confirm, and execute one rebalance pass
    Run {
        /// Path to target.json
        target: PathBuf,

        /// Show plan without executing
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Replay the rebalancer over a price file and compare with buy and hold
    Backtest {
        /// Path to target.json
        target: PathBuf,

        /// Price CSV (defaults to backtest.prices_file)
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Seed capital in THB (defaults to backtest.seed_capital)
        #[arg(long)]
        seed: Option<f64>,

        /// Also save the full report (curve, trades, summary) as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show current balances against targets
    Balances {
        /// Path to target.json
        target: PathBuf,
    },

    /// Check Bitkub endpoint status
    Status,

    /// Download closing prices for the target assets into a price CSV
    FetchHistory {
        /// Path to target.json
        target: PathBuf,

        /// Days of history (defaults to backtest.history_days)
        #[arg(long)]
        days: Option<u32>,

        /// TradingView resolution, e.g. D or 60 (defaults to backtest.resolution)
        #[arg(long)]
        resolution: Option<String>,

        /// Output CSV (defaults to backtest.prices_file)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Rank THB markets by 24h volume and bid-ask spread
    Liquidity {
        /// Rows to show per ranking
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Also save the full scan as CSV
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = dispatch(&config, cli.command) {
        match &e {
            Error::Aborted(msg) => {
                eprintln!("\nAborted: {msg}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

/// A missing default config file means built-in defaults.
fn load_config(path: &Path) -> Result<Config> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        info!("No {DEFAULT_CONFIG} found, using defaults");
        return Ok(Config::default());
    }
    Config::load(path)
}

fn load_targets(config: &Config, path: &Path) -> Result<TargetAllocation> {
    TargetSpec::load(path)?.allocation(config.cash_symbol()?)
}

fn signed_client(config: &Config) -> Result<BitkubClient> {
    let (key, secret) = config::credentials()?;
    Ok(BitkubClient::with_host(
        &config.exchange.host,
        &key,
        &secret,
        config.request_timeout(),
    )?)
}

fn public_client(config: &Config) -> Result<BitkubClient> {
    Ok(BitkubClient::public(
        &config.exchange.host,
        config.request_timeout(),
    )?)
}

fn dispatch(config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Run {
            target,
            dry_run,
            force,
        } => {
            let targets = load_targets(config, &target)?;
            let client = signed_client(config)?;
            let opts = RunOptions {
                dry_run,
                force,
                target_file: target.display().to_string(),
            };
            execution::run(config, &client, &targets, &opts).map(|_| ())
        }
        Command::Backtest {
            target,
            prices,
            seed,
            report: report_path,
        } => {
            let targets = load_targets(config, &target)?;
            let prices = prices.unwrap_or_else(|| PathBuf::from(&config.backtest.prices_file));
            let report = backtest::run(config, &targets, &prices, seed)?;
            backtest::print_report(&report);
            if let Some(path) = report_path {
                report.save_json(&path)?;
                println!("Report saved to {}", path.display());
            }
            Ok(())
        }
        Command::Balances { target } => {
            let targets = load_targets(config, &target)?;
            let client = signed_client(config)?;
            execution::show_balances(config, &client, &targets)
        }
        Command::Status => execution::check_status(&public_client(config)?),
        Command::FetchHistory {
            target,
            days,
            resolution,
            output,
        } => {
            let targets = load_targets(config, &target)?;
            let client = public_client(config)?;
            let days = days.unwrap_or(config.backtest.history_days);
            let resolution = resolution.unwrap_or_else(|| config.backtest.resolution.clone());
            let output = output.unwrap_or_else(|| PathBuf::from(&config.backtest.prices_file));

            let table = backtest::fetch_history(&client, &targets, days, &resolution)?;
            table.write_csv(&output)?;
            println!(
                "Saved {} rows for {} assets to {}",
                table.len(),
                table.assets().len(),
                output.display()
            );
            Ok(())
        }
        Command::Liquidity { top, output } => {
            let client = public_client(config)?;
            let rows = liquidity::rank(&client.market_tickers()?, config.cash_symbol()?);
            print!(
                "{}",
                display::liquidity_table(
                    "Top markets by 24h volume",
                    &liquidity::top_by_volume(&rows, top)
                )
            );
            println!();
            print!(
                "{}",
                display::liquidity_table(
                    "Tightest markets by spread",
                    &liquidity::top_by_spread(&rows, top)
                )
            );
            if let Some(path) = output {
                liquidity::write_csv(&rows, &path)?;
                println!("\nSaved {} markets to {}", rows.len(), path.display());
            }
            Ok(())
        }
    }
}
