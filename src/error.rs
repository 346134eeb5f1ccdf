//! Error and outcome types for the rebalancing core.
//!
//! Fatal conditions are [`ConfigError`] and [`Error`]. Per-asset problems
//! inside a pass are not errors: they surface as [`SkipReason`] values and the
//! pass moves on to the next asset.

use std::fmt;

use crate::types::{Symbol, Timestamp};

/// Invalid targets or engine parameters. Raised once, before any pass runs.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("target allocation is empty")]
    EmptyTargets,

    #[error("target allocation must include the cash symbol {0}")]
    MissingCash(Symbol),

    #[error("target weights sum to {sum:.4}, expected 1.0 (tolerance 0.01)")]
    WeightSum { sum: f64 },

    #[error("duplicate symbol in target allocation: {0}")]
    DuplicateSymbol(Symbol),

    #[error("weight for {symbol} must be within [0, 1], got {weight}")]
    InvalidWeight { symbol: Symbol, weight: f64 },

    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Run-level failures that abort a pass or a whole simulation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no target asset has a usable price at {timestamp}")]
    PriceUnavailable { timestamp: Timestamp },

    #[error("price series is empty")]
    EmptySeries,

    #[error("price series is not in ascending time order at row {index}")]
    UnorderedSeries { index: usize },

    #[error("simulation is {actual}, expected {expected}")]
    InvalidPhase {
        expected: &'static str,
        actual: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why an asset produced no trade during a pass.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipReason {
    /// No positive price for the asset this period.
    Unpriced,
    /// Running balance could not cover the trade.
    InsufficientBalance { required: f64, available: f64 },
    /// The execution backend rejected or failed the order.
    OrderExecution(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unpriced => write!(f, "price unavailable"),
            SkipReason::InsufficientBalance {
                required,
                available,
            } => write!(
                f,
                "insufficient balance: need {required:.8}, have {available:.8}"
            ),
            SkipReason::OrderExecution(msg) => write!(f, "order failed: {msg}"),
        }
    }
}
