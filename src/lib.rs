//! # thbfolio
//!
//! Deterministic threshold rebalancing for a cash-plus-crypto portfolio, and a
//! backtest driver that replays the same logic over historical prices.
//!
//! ## Features
//!
//! - **Valuation**: total value and per-asset weights from a price snapshot
//! - **Fees**: proportional trading fee rounded up to 0.01, bank withdrawal schedule
//! - **Decision engine**: single-pass, snapshot-based, tolerance band + minimum trade
//! - **Pluggable execution**: simulated fills or any live [`execution::ExecutionBackend`]
//! - **Backtest**: bootstrap, per-period rebalance, buy-and-hold comparison
//!
//! ## Quick Start
//!
//! ```
//! use thbfolio::engine::RebalanceParams;
//! use thbfolio::portfolio::WithdrawalSchedule;
//! use thbfolio::simulation::{Simulation, SimulationConfig};
//! use thbfolio::{PricePoint, Symbol, TargetAllocation};
//!
//! let thb = Symbol::new("THB");
//! let btc = Symbol::new("BTC");
//! let targets = TargetAllocation::new(thb, vec![(thb, 0.5), (btc, 0.5)]).unwrap();
//!
//! let day = |d| {
//!     chrono::NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
//! };
//! let series = vec![
//!     PricePoint::new(day(1)).with(btc, 1_000_000.0),
//!     PricePoint::new(day(2)).with(btc, 1_500_000.0),
//! ];
//!
//! let sim = Simulation::new(SimulationConfig {
//!     targets,
//!     params: RebalanceParams::default(),
//!     seed_capital: 10_000.0,
//!     bank: "KBank".into(),
//!     withdrawal: WithdrawalSchedule::default(),
//! })
//! .unwrap();
//!
//! let report = sim.run(&series).unwrap();
//! assert_eq!(report.curve.len(), 2);
//! // BTC rallied 50%: weight drifted to 0.6, so day 2 sells back toward 0.5.
//! assert_eq!(report.trades.len(), 2);
//! assert!(report.summary.rebalanced.profit > 0.0);
//! ```
//!
//! ## Single decision pass
//!
//! ```
//! use thbfolio::engine::{decide, RebalanceParams};
//! use thbfolio::portfolio::Portfolio;
//! use thbfolio::{PricePoint, Symbol, TargetAllocation};
//!
//! let thb = Symbol::new("THB");
//! let btc = Symbol::new("BTC");
//! let targets = TargetAllocation::new(thb, vec![(thb, 0.5), (btc, 0.5)]).unwrap();
//! let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!
//! // 52% BTC is inside the 5% band: nothing to do.
//! let portfolio = Portfolio::from_balances(thb, [(thb, 480.0), (btc, 0.00052)]);
//! let prices = PricePoint::new(ts).with(btc, 1_000_000.0);
//! let outcome = decide(&portfolio, &prices, &targets, &RebalanceParams::default()).unwrap();
//! assert!(outcome.trades.is_empty());
//! ```

pub mod baseline;
pub mod engine;
mod error;
pub mod execution;
pub mod portfolio;
mod price;
mod side;
pub mod simulation;
pub mod summary;
mod target;
mod types;

// Re-export public API
pub use baseline::Baseline;
pub use engine::{PassOutcome, Plan, RebalanceParams, Rebalancer, Skip, Trade};
pub use error::{ConfigError, Error, Result, SkipReason};
pub use price::{PricePoint, validate_series};
pub use side::Side;
pub use summary::{Performance, RunSummary};
pub use target::{TargetAllocation, WEIGHT_SUM_TOLERANCE};
pub use types::{Symbol, Timestamp, pair_name, parse_pair};
