//! thbfolio-rebalancer: threshold rebalancer and backtester for Bitkub.
//!
//! Reads target weights from a JSON file, fetches balances and prices from
//! Bitkub, sizes market orders with the `thbfolio` engine, and executes them
//! with an audit trail and a CSV trade ledger. The same engine replays price
//! files for backtests against a buy-and-hold baseline.

pub mod audit;
pub mod backtest;
pub mod config;
pub mod display;
pub mod error;
pub mod execution;
pub mod history;
pub mod ledger;
pub mod liquidity;
pub mod target;
