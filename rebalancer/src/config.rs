//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thbfolio::portfolio::{FeeModel, WithdrawalBracket, WithdrawalSchedule};
use thbfolio::{RebalanceParams, Symbol};

use crate::error::{Error, Result};

/// Environment variable holding the Bitkub API key.
pub const API_KEY_VAR: &str = "BITKUB_API_KEY";
/// Environment variable holding the Bitkub API secret.
pub const API_SECRET_VAR: &str = "BITKUB_API_SECRET";

/// Top-level configuration. Every section may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    #[serde(default)]
    pub withdrawal: WithdrawalConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Pause between consecutive live orders.
    #[serde(default = "default_interval")]
    pub order_interval_ms: u64,
}

fn default_host() -> String {
    thbfolio_broker::bitkub::DEFAULT_HOST.into()
}
fn default_timeout() -> u64 {
    10
}
fn default_interval() -> u64 {
    200
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            timeout_secs: default_timeout(),
            order_interval_ms: default_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RebalanceConfig {
    #[serde(default = "default_cash")]
    pub cash_symbol: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_min_trade")]
    pub min_trade_amount: f64,
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,
}

fn default_cash() -> String {
    "THB".into()
}
fn default_threshold() -> f64 {
    RebalanceParams::DEFAULT_THRESHOLD
}
fn default_min_trade() -> f64 {
    RebalanceParams::DEFAULT_MIN_TRADE
}
fn default_fee_rate() -> f64 {
    FeeModel::DEFAULT_RATE
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            cash_symbol: default_cash(),
            threshold: default_threshold(),
            min_trade_amount: default_min_trade(),
            fee_rate: default_fee_rate(),
        }
    }
}

/// A bank that charges one fee regardless of amount.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatBank {
    pub name: String,
    pub fee: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalConfig {
    #[serde(default = "default_bank")]
    pub bank: String,
    /// Replaces the built-in flat-fee banks when present.
    #[serde(default)]
    pub flat_banks: Option<Vec<FlatBank>>,
    /// Replaces the built-in amount brackets when present.
    #[serde(default)]
    pub brackets: Option<Vec<WithdrawalBracket>>,
}

fn default_bank() -> String {
    "KBank".into()
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            bank: default_bank(),
            flat_banks: None,
            brackets: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_seed")]
    pub seed_capital: f64,
    #[serde(default = "default_prices_file")]
    pub prices_file: String,
    /// Days of history `fetch-history` requests by default.
    #[serde(default = "default_history_days")]
    pub history_days: u32,
    /// TradingView resolution: `"D"` daily, `"60"` hourly, ...
    #[serde(default = "default_resolution")]
    pub resolution: String,
}

fn default_seed() -> f64 {
    10_000.0
}
fn default_prices_file() -> String {
    "historical_prices.csv".into()
}
fn default_history_days() -> u32 {
    365
}
fn default_resolution() -> String {
    "D".into()
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            seed_capital: default_seed(),
            prices_file: default_prices_file(),
            history_days: default_history_days(),
            resolution: default_resolution(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_trade_log")]
    pub trade_log: String,
    #[serde(default = "default_backtest_log")]
    pub backtest_log: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_trade_log() -> String {
    "trade_log.csv".into()
}
fn default_backtest_log() -> String {
    "backtest_log.csv".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            trade_log: default_trade_log(),
            backtest_log: default_backtest_log(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate config from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.exchange.host.is_empty() {
            return Err(Error::Config("exchange host must not be empty".into()));
        }
        if self.exchange.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be > 0".into()));
        }
        self.cash_symbol()?;
        self.params().validate()?;
        if !(self.backtest.seed_capital.is_finite() && self.backtest.seed_capital > 0.0) {
            return Err(Error::Config("seed_capital must be > 0".into()));
        }
        if self.withdrawal.bank.is_empty() {
            return Err(Error::Config("withdrawal bank must not be empty".into()));
        }
        for bracket in self.withdrawal.brackets.iter().flatten() {
            if !(bracket.up_to > 0.0 && bracket.fee >= 0.0) {
                return Err(Error::Config(format!(
                    "withdrawal bracket up to {} with fee {} is invalid",
                    bracket.up_to, bracket.fee
                )));
            }
        }
        Ok(())
    }

    /// The cash leg symbol.
    pub fn cash_symbol(&self) -> Result<Symbol> {
        Symbol::try_new(&self.rebalance.cash_symbol).ok_or_else(|| {
            Error::Config(format!(
                "invalid cash symbol {:?}",
                self.rebalance.cash_symbol
            ))
        })
    }

    /// Engine parameters for both live and backtest runs.
    pub fn params(&self) -> RebalanceParams {
        RebalanceParams {
            threshold: self.rebalance.threshold,
            min_trade_amount: self.rebalance.min_trade_amount,
            fees: FeeModel::new(self.rebalance.fee_rate),
        }
    }

    /// Withdrawal schedule with any configured overrides applied.
    pub fn withdrawal_schedule(&self) -> WithdrawalSchedule {
        let defaults = WithdrawalSchedule::default();
        let flat = match &self.withdrawal.flat_banks {
            Some(banks) => banks.iter().map(|b| (b.name.clone(), b.fee)).collect(),
            None => defaults.flat_banks,
        };
        let brackets = self
            .withdrawal
            .brackets
            .clone()
            .unwrap_or(defaults.brackets);
        WithdrawalSchedule::new(flat, brackets)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange.timeout_secs)
    }

    pub fn order_interval(&self) -> Duration {
        Duration::from_millis(self.exchange.order_interval_ms)
    }

    /// Full path to the live trade ledger.
    pub fn trade_log_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.trade_log)
    }

    /// Full path to the backtest trade ledger.
    pub fn backtest_log_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.backtest_log)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}

/// API credentials from the environment (after `.env` has been loaded).
pub fn credentials() -> Result<(String, String)> {
    let key = std::env::var(API_KEY_VAR)
        .map_err(|_| Error::Config(format!("{API_KEY_VAR} is not set")))?;
    let secret = std::env::var(API_SECRET_VAR)
        .map_err(|_| Error::Config(format!("{API_SECRET_VAR} is not set")))?;
    if key.is_empty() || secret.is_empty() {
        return Err(Error::Config("Bitkub API credentials are empty".into()));
    }
    Ok((key, secret))
}
