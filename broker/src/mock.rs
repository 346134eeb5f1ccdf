//! Mock exchange for testing: implements the `Exchange` trait with configurable behavior.
//!
//! Use this in integration tests to simulate exchange responses without network calls.
//!
//! ```
//! use thbfolio::Symbol;
//! use thbfolio_broker::mock::{FillMode, MockExchange};
//!
//! let exchange = MockExchange::builder()
//!     .fill_mode(FillMode::Full)
//!     .with_balance(Symbol::new("THB"), 10_000.0)
//!     .with_price(Symbol::new("BTC"), 1_000_000.0)
//!     .build();
//! ```

use std::sync::{Mutex, PoisonError};

use thbfolio::portfolio::FeeModel;
use thbfolio::{Side, Symbol};

use crate::Exchange;
use crate::error::BrokerError;
use crate::types::*;

/// How the mock exchange handles submitted orders.
#[derive(Clone, Debug)]
pub enum FillMode {
    /// Orders fill completely at the reference price.
    Full,
    /// Orders fill the given fraction (e.g., 0.5 = 50%).
    Partial(f64),
    /// All orders are rejected.
    Reject,
}

/// A recorded order submission for assertion in tests.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedOrder {
    pub asset: Symbol,
    pub side: Side,
    pub quantity: f64,
    pub value: f64,
}

/// Builder for `MockExchange`.
pub struct MockExchangeBuilder {
    cash: Symbol,
    fill_mode: FillMode,
    balances: Vec<(Symbol, f64)>,
    prices: Vec<(Symbol, f64)>,
    rejected: Vec<Symbol>,
    fees: FeeModel,
    down: bool,
}

impl MockExchangeBuilder {
    pub fn cash_symbol(mut self, cash: Symbol) -> Self {
        self.cash = cash;
        self
    }

    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_balance(mut self, symbol: Symbol, amount: f64) -> Self {
        self.balances.push((symbol, amount));
        self
    }

    pub fn with_price(mut self, symbol: Symbol, price: f64) -> Self {
        self.prices.push((symbol, price));
        self
    }

    /// Reject every order for this asset regardless of fill mode.
    pub fn reject_asset(mut self, symbol: Symbol) -> Self {
        self.rejected.push(symbol);
        self
    }

    pub fn fee_rate(mut self, rate: f64) -> Self {
        self.fees = FeeModel::new(rate);
        self
    }

    /// Report every endpoint as under maintenance.
    pub fn maintenance(mut self) -> Self {
        self.down = true;
        self
    }

    pub fn build(self) -> MockExchange {
        MockExchange {
            cash: self.cash,
            fill_mode: self.fill_mode,
            balances: Mutex::new(self.balances),
            prices: self.prices,
            rejected: self.rejected,
            fees: self.fees,
            down: self.down,
            submitted_orders: Mutex::new(Vec::new()),
        }
    }
}

/// A mock exchange that records submitted orders and settles fills against
/// its own balances.
pub struct MockExchange {
    cash: Symbol,
    fill_mode: FillMode,
    balances: Mutex<Vec<(Symbol, f64)>>,
    prices: Vec<(Symbol, f64)>,
    rejected: Vec<Symbol>,
    fees: FeeModel,
    down: bool,
    submitted_orders: Mutex<Vec<RecordedOrder>>,
}

impl MockExchange {
    pub fn builder() -> MockExchangeBuilder {
        MockExchangeBuilder {
            cash: Symbol::new("THB"),
            fill_mode: FillMode::Full,
            balances: Vec::new(),
            prices: Vec::new(),
            rejected: Vec::new(),
            fees: FeeModel::default(),
            down: false,
        }
    }

    /// Get all orders that were submitted (for assertion in tests).
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        self.submitted_orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current balance of one asset after any fills.
    pub fn balance(&self, symbol: Symbol) -> f64 {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(s, _)| *s == symbol)
            .map_or(0.0, |&(_, q)| q)
    }

    fn settle(&self, asset: Symbol, side: Side, receipt: &OrderReceipt) {
        let value = receipt.executed_quantity * receipt.executed_price;
        let (cash_delta, asset_delta) = match side {
            Side::Buy => (-(value + receipt.fee), receipt.executed_quantity),
            Side::Sell => (value - receipt.fee, -receipt.executed_quantity),
        };
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        for (symbol, delta) in [(self.cash, cash_delta), (asset, asset_delta)] {
            match balances.iter_mut().find(|(s, _)| *s == symbol) {
                Some((_, q)) => *q += delta,
                None => balances.push((symbol, delta)),
            }
        }
    }
}

impl Exchange for MockExchange {
    fn status(&self) -> Result<Vec<ServiceStatus>, BrokerError> {
        let status = if self.down { "maintenance" } else { "ok" };
        Ok(vec![ServiceStatus {
            name: "mock".into(),
            status: status.into(),
            message: String::new(),
        }])
    }

    fn balances(&self, assets: &[Symbol]) -> Result<Vec<(Symbol, f64)>, BrokerError> {
        Ok(assets.iter().map(|&a| (a, self.balance(a))).collect())
    }

    fn prices(&self, assets: &[Symbol]) -> Result<Vec<(Symbol, f64)>, BrokerError> {
        Ok(assets
            .iter()
            .filter_map(|a| self.prices.iter().find(|(s, _)| s == a).copied())
            .collect())
    }

    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderReceipt, BrokerError> {
        self.submitted_orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedOrder {
                asset: order.asset,
                side: order.side,
                quantity: order.quantity,
                value: order.value,
            });

        if self.rejected.contains(&order.asset) {
            return Err(BrokerError::Order(format!(
                "mock: {} orders rejected",
                order.asset
            )));
        }

        let fraction = match self.fill_mode {
            FillMode::Full => 1.0,
            FillMode::Partial(frac) => frac,
            FillMode::Reject => return Err(BrokerError::Order("mock: order rejected".into())),
        };

        let price = order.reference_price();
        let quantity = order.quantity * fraction;
        let receipt = OrderReceipt {
            executed_quantity: quantity,
            executed_price: price,
            fee: self.fees.trading_fee(order.value * fraction),
        };
        self.settle(order.asset, order.side, &receipt);
        Ok(receipt)
    }
}
