//! Shared exchange types: orders, receipts, service status, tickers.

use thbfolio::{Side, Symbol};

/// Market order to submit to an exchange.
///
/// Buys are sized in cash (`value`), sells in asset units (`quantity`).
/// Both are always filled in so implementations can use whichever they need.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerOrder {
    pub asset: Symbol,
    pub side: Side,
    pub quantity: f64,
    pub value: f64,
}

impl BrokerOrder {
    /// Price the order was sized at.
    pub fn reference_price(&self) -> f64 {
        if self.quantity > 0.0 {
            self.value / self.quantity
        } else {
            0.0
        }
    }
}

/// What the exchange reports after executing an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderReceipt {
    /// Asset units bought or sold.
    pub executed_quantity: f64,
    /// Average price per unit, before fees.
    pub executed_price: f64,
    /// Fee charged in the cash currency.
    pub fee: f64,
}

/// Health of one exchange endpoint group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub name: String,
    pub status: String,
    pub message: String,
}

impl ServiceStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// 24h market summary for one pair, used by the liquidity scan.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketTicker {
    /// Pair name as the venue reports it, e.g. `THB_BTC`.
    pub pair: String,
    pub last: f64,
    pub lowest_ask: f64,
    pub highest_bid: f64,
    /// 24h volume in the base asset.
    pub base_volume: f64,
}
