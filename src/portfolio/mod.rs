//! Portfolio state, valuation, fee schedules and curve statistics.
//!
//! A [`Portfolio`] is a set of non-negative balances: one cash leg plus any
//! number of tradable assets. It is only ever mutated by applying a fill, and
//! a fill that would drive any balance below zero is refused.
//!
//! # Example
//!
//! ```
//! use thbfolio::portfolio::Portfolio;
//! use thbfolio::{PricePoint, Side, Symbol};
//! use thbfolio::execution::Fill;
//!
//! let thb = Symbol::new("THB");
//! let btc = Symbol::new("BTC");
//! let mut portfolio = Portfolio::new(thb, 1_000.0);
//!
//! let fill = Fill { quantity: 0.0005, price: 1_000_000.0, fee: 1.25 };
//! portfolio.apply_fill(btc, Side::Buy, &fill).unwrap();
//! assert_eq!(portfolio.cash(), 498.75);
//!
//! let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let prices = PricePoint::new(ts).with(btc, 1_000_000.0);
//! assert_eq!(portfolio.total_value(&prices), 998.75);
//! ```

pub mod cost_model;
pub mod metrics;
pub mod valuation;

pub use cost_model::{FeeModel, WithdrawalBracket, WithdrawalFee, WithdrawalSchedule};
pub use metrics::CurveStats;
pub use valuation::{AssetValuation, Valuation, total_value};

use crate::error::SkipReason;
use crate::execution::Fill;
use crate::price::PricePoint;
use crate::side::Side;
use crate::types::Symbol;

/// Balances below this magnitude after a fill are float residue, not debt.
const RESIDUE: f64 = 1e-9;

/// Cash balance plus asset quantities, in insertion order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Portfolio {
    cash_symbol: Symbol,
    cash: f64,
    assets: Vec<(Symbol, f64)>,
}

impl Portfolio {
    /// A cash-only portfolio, e.g. the simulation seed.
    pub fn new(cash_symbol: Symbol, cash: f64) -> Self {
        debug_assert!(cash >= 0.0, "cash must be non-negative, got {cash}");
        Self {
            cash_symbol,
            cash: cash.max(0.0),
            assets: Vec::new(),
        }
    }

    /// Build from an exchange balance snapshot. The entry for `cash_symbol`
    /// becomes the cash leg; negative balances are treated as zero.
    pub fn from_balances(
        cash_symbol: Symbol,
        balances: impl IntoIterator<Item = (Symbol, f64)>,
    ) -> Self {
        let mut portfolio = Self::new(cash_symbol, 0.0);
        for (symbol, qty) in balances {
            portfolio.set_quantity(symbol, qty.max(0.0));
        }
        portfolio
    }

    // === Queries ===

    #[inline]
    pub fn cash_symbol(&self) -> Symbol {
        self.cash_symbol
    }

    /// Cash balance.
    #[inline]
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Quantity held of `symbol` (cash balance for the cash symbol).
    pub fn quantity(&self, symbol: Symbol) -> f64 {
        if symbol == self.cash_symbol {
            return self.cash;
        }
        self.assets
            .iter()
            .find(|&&(s, _)| s == symbol)
            .map(|&(_, q)| q)
            .unwrap_or(0.0)
    }

    /// Non-cash holdings in insertion order, zero balances included.
    pub fn holdings(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        self.assets.iter().copied()
    }

    /// Every balance, cash first.
    pub fn balances(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        std::iter::once((self.cash_symbol, self.cash)).chain(self.holdings())
    }

    /// Total value at `prices`; unpriced assets contribute nothing.
    pub fn total_value(&self, prices: &PricePoint) -> f64 {
        valuation::total_value(self, prices)
    }

    /// Full valuation snapshot at `prices`.
    pub fn valuation(&self, prices: &PricePoint) -> Valuation {
        Valuation::of(self, prices)
    }

    // === Mutation ===

    /// Register an asset with a zero balance so it shows up in holdings.
    pub fn track(&mut self, symbol: Symbol) {
        if symbol != self.cash_symbol && !self.assets.iter().any(|&(s, _)| s == symbol) {
            self.assets.push((symbol, 0.0));
        }
    }

    fn set_quantity(&mut self, symbol: Symbol, qty: f64) {
        if symbol == self.cash_symbol {
            self.cash = qty;
            return;
        }
        match self.assets.iter_mut().find(|(s, _)| *s == symbol) {
            Some(entry) => entry.1 = qty,
            None => self.assets.push((symbol, qty)),
        }
    }

    /// Apply an executed trade.
    ///
    /// Buy: asset += quantity, cash -= value + fee.
    /// Sell: asset -= quantity, cash += value - fee.
    /// Refused, with the portfolio untouched, if either balance would go negative.
    pub fn apply_fill(&mut self, asset: Symbol, side: Side, fill: &Fill) -> Result<(), SkipReason> {
        let held = self.quantity(asset);
        let (new_qty, new_cash) = match side {
            Side::Buy => (held + fill.quantity, self.cash - fill.value() - fill.fee),
            Side::Sell => (held - fill.quantity, self.cash + fill.value() - fill.fee),
        };

        if new_cash < -RESIDUE {
            return Err(SkipReason::InsufficientBalance {
                required: fill.value() + fill.fee,
                available: self.cash,
            });
        }
        if new_qty < -RESIDUE {
            return Err(SkipReason::InsufficientBalance {
                required: fill.quantity,
                available: held,
            });
        }

        self.set_quantity(asset, new_qty.max(0.0));
        self.cash = new_cash.max(0.0);
        Ok(())
    }
}
