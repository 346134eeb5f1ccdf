//! Threshold rebalance decision engine.
//!
//! One pass looks at a single pre-pass [`Valuation`] and, for each target
//! asset in allocation order, decides whether its weight has drifted outside
//! the tolerance band. Drifted assets get one order sized to close the value
//! gap. Orders are then checked against the *running* balances, executed
//! through an [`ExecutionBackend`], and applied one after another.
//!
//! Sizing never looks at the running portfolio: a sell earlier in the pass
//! does not change how much a later buy wants. Only the affordability check
//! sees the effect of earlier trades.
//!
//! ```
//! use thbfolio::engine::{decide, RebalanceParams};
//! use thbfolio::portfolio::Portfolio;
//! use thbfolio::{PricePoint, Side, Symbol, TargetAllocation};
//!
//! let (thb, btc) = (Symbol::new("THB"), Symbol::new("BTC"));
//! let targets = TargetAllocation::new(thb, vec![(thb, 0.5), (btc, 0.5)]).unwrap();
//! let portfolio = Portfolio::new(thb, 1_000.0);
//! let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let prices = PricePoint::new(ts).with(btc, 1_000_000.0);
//!
//! let outcome = decide(&portfolio, &prices, &targets, &RebalanceParams::default()).unwrap();
//! assert_eq!(outcome.trades.len(), 1);
//! assert_eq!(outcome.trades[0].side, Side::Buy);
//! assert_eq!(outcome.trades[0].fee, 1.25);
//! ```

use log::{debug, warn};

use crate::error::{ConfigError, Error, Result, SkipReason};
use crate::execution::{ExecutionBackend, OrderRequest, SimulatedBackend};
use crate::portfolio::{FeeModel, Portfolio, Valuation};
use crate::price::PricePoint;
use crate::side::Side;
use crate::target::TargetAllocation;
use crate::types::{Symbol, Timestamp};

/// Relative slack for treating a sell of "everything plus float noise" as everything.
const SELL_ALL_SLACK: f64 = 1e-9;

/// Tuning knobs for a rebalance pass.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalanceParams {
    /// Allowed `|current − target|` weight drift before trading.
    pub threshold: f64,
    /// Trades worth less than this (in cash) are dropped.
    pub min_trade_amount: f64,
    pub fees: FeeModel,
}

impl RebalanceParams {
    pub const DEFAULT_THRESHOLD: f64 = 0.05;
    pub const DEFAULT_MIN_TRADE: f64 = 50.0;

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidParameter {
                name: "threshold",
                value: self.threshold,
            });
        }
        if !self.min_trade_amount.is_finite() || self.min_trade_amount < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "min_trade_amount",
                value: self.min_trade_amount,
            });
        }
        if !(0.0..1.0).contains(&self.fees.rate) {
            return Err(ConfigError::InvalidParameter {
                name: "fee_rate",
                value: self.fees.rate,
            });
        }
        Ok(())
    }

    /// Same fees, no band and no floor: used to allocate seed capital.
    pub fn unconditional(&self) -> Self {
        Self {
            threshold: 0.0,
            min_trade_amount: 0.0,
            fees: self.fees,
        }
    }
}

impl Default for RebalanceParams {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            min_trade_amount: Self::DEFAULT_MIN_TRADE,
            fees: FeeModel::default(),
        }
    }
}

/// An executed rebalance trade.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trade {
    pub timestamp: Timestamp,
    pub asset: Symbol,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    /// Cash notional.
    pub value: f64,
    pub fee: f64,
    /// Running portfolio value right after this trade, at the period's prices.
    pub portfolio_value: f64,
}

/// An asset that was left alone, and why.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skip {
    pub timestamp: Timestamp,
    pub asset: Symbol,
    pub reason: SkipReason,
}

/// Sized orders for one pass, before execution.
#[derive(Clone, Debug)]
pub struct Plan {
    pub valuation: Valuation,
    pub orders: Vec<OrderRequest>,
    pub skips: Vec<Skip>,
}

/// Result of executing one pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassOutcome {
    pub trades: Vec<Trade>,
    pub skips: Vec<Skip>,
}

impl PassOutcome {
    pub fn total_fees(&self) -> f64 {
        self.trades.iter().map(|t| t.fee).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty() && self.skips.is_empty()
    }
}

/// Size orders for every drifted asset against one valuation snapshot.
pub fn plan(
    portfolio: &Portfolio,
    prices: &PricePoint,
    targets: &TargetAllocation,
    params: &RebalanceParams,
) -> Plan {
    let valuation = Valuation::of(portfolio, prices);
    let mut orders = Vec::new();
    let mut skips = Vec::new();

    for (asset, target) in targets.assets() {
        let Some(price) = prices.price(asset) else {
            skips.push(Skip {
                timestamp: prices.timestamp,
                asset,
                reason: SkipReason::Unpriced,
            });
            continue;
        };

        let current_value = valuation.value(asset);
        let current_weight = valuation.weight(asset);
        if (current_weight - target).abs() <= params.threshold {
            continue;
        }

        let gap = target * valuation.total - current_value;
        if gap == 0.0 {
            continue;
        }
        let side = Side::for_gap(gap);
        let (quantity, value) = match side {
            Side::Buy => (gap / price, gap),
            Side::Sell => {
                let held = portfolio.quantity(asset);
                let mut quantity = -gap / price;
                if (quantity - held).abs() <= held * SELL_ALL_SLACK {
                    quantity = held;
                }
                (quantity, quantity * price)
            }
        };

        if value < params.min_trade_amount {
            debug!(
                "{asset}: {side} {value:.2} below minimum {:.2}, dropped",
                params.min_trade_amount
            );
            continue;
        }

        orders.push(OrderRequest {
            asset,
            side,
            quantity,
            price,
            value,
            fee: params.fees.trading_fee(value),
        });
    }

    Plan {
        valuation,
        orders,
        skips,
    }
}

/// Just the orders of [`plan`].
pub fn propose(
    portfolio: &Portfolio,
    prices: &PricePoint,
    targets: &TargetAllocation,
    params: &RebalanceParams,
) -> Vec<OrderRequest> {
    plan(portfolio, prices, targets, params).orders
}

/// Run a full pass on a copy of `portfolio` with simulated fills.
///
/// Pure: the input is not touched. Fails only when no target asset is priced.
pub fn decide(
    portfolio: &Portfolio,
    prices: &PricePoint,
    targets: &TargetAllocation,
    params: &RebalanceParams,
) -> Result<PassOutcome> {
    let mut working = portfolio.clone();
    run_pass(&mut working, prices, targets, params, &mut SimulatedBackend)
}

/// Targets plus parameters, validated once and reused every period.
#[derive(Clone, Debug)]
pub struct Rebalancer {
    targets: TargetAllocation,
    params: RebalanceParams,
}

impl Rebalancer {
    pub fn new(targets: TargetAllocation, params: RebalanceParams) -> std::result::Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { targets, params })
    }

    pub fn targets(&self) -> &TargetAllocation {
        &self.targets
    }

    pub fn params(&self) -> &RebalanceParams {
        &self.params
    }

    pub fn plan(&self, portfolio: &Portfolio, prices: &PricePoint) -> Plan {
        plan(portfolio, prices, &self.targets, &self.params)
    }

    /// Rebalance `portfolio` in place through `backend`.
    pub fn execute_pass(
        &self,
        portfolio: &mut Portfolio,
        prices: &PricePoint,
        backend: &mut dyn ExecutionBackend,
    ) -> Result<PassOutcome> {
        run_pass(portfolio, prices, &self.targets, &self.params, backend)
    }

    /// Allocate `portfolio` straight to target, ignoring band and floor.
    pub fn bootstrap_pass(
        &self,
        portfolio: &mut Portfolio,
        prices: &PricePoint,
        backend: &mut dyn ExecutionBackend,
    ) -> Result<PassOutcome> {
        for (asset, _) in self.targets.assets() {
            portfolio.track(asset);
        }
        run_pass(
            portfolio,
            prices,
            &self.targets,
            &self.params.unconditional(),
            backend,
        )
    }
}

fn run_pass(
    portfolio: &mut Portfolio,
    prices: &PricePoint,
    targets: &TargetAllocation,
    params: &RebalanceParams,
    backend: &mut dyn ExecutionBackend,
) -> Result<PassOutcome> {
    let mut assets = targets.assets().map(|(s, _)| s).peekable();
    if assets.peek().is_some() && !prices.any_priced(assets) {
        return Err(Error::PriceUnavailable {
            timestamp: prices.timestamp,
        });
    }

    let Plan { orders, skips, .. } = plan(portfolio, prices, targets, params);
    let mut outcome = PassOutcome {
        trades: Vec::with_capacity(orders.len()),
        skips,
    };
    let skip = |outcome: &mut PassOutcome, asset: Symbol, reason: SkipReason| {
        warn!("{} {asset}: {reason}", prices.timestamp);
        outcome.skips.push(Skip {
            timestamp: prices.timestamp,
            asset,
            reason,
        });
    };

    for order in orders {
        let (required, available) = match order.side {
            Side::Buy => (order.value + order.fee, portfolio.cash()),
            Side::Sell => (order.quantity, portfolio.quantity(order.asset)),
        };
        if available < required {
            skip(
                &mut outcome,
                order.asset,
                SkipReason::InsufficientBalance {
                    required,
                    available,
                },
            );
            continue;
        }

        let fill = match backend.execute(&order) {
            Ok(fill) => fill,
            Err(e) => {
                skip(&mut outcome, order.asset, SkipReason::OrderExecution(e.message));
                continue;
            }
        };

        if let Err(reason) = portfolio.apply_fill(order.asset, order.side, &fill) {
            skip(&mut outcome, order.asset, reason);
            continue;
        }

        let trade = Trade {
            timestamp: prices.timestamp,
            asset: order.asset,
            side: order.side,
            quantity: fill.quantity,
            price: fill.price,
            value: fill.value(),
            fee: fill.fee,
            portfolio_value: portfolio.total_value(prices),
        };
        debug!(
            "{} {} {:.8} {} @ {:.2} fee {:.2}",
            trade.timestamp, trade.side, trade.quantity, trade.asset, trade.price, trade.fee
        );
        outcome.trades.push(trade);
    }

    Ok(outcome)
}
