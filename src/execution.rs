//! Execution backends: where the engine's orders actually go.
//!
//! The engine never talks to an exchange directly. It hands each
//! [`OrderRequest`] to an [`ExecutionBackend`] and applies whatever [`Fill`]
//! comes back. [`SimulatedBackend`] fills every order exactly as requested;
//! a live backend forwards to an exchange and reports what really executed.

use crate::side::Side;
use crate::types::Symbol;

/// A sized order produced by the decision engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderRequest {
    pub asset: Symbol,
    pub side: Side,
    /// Asset units.
    pub quantity: f64,
    /// Reference price the order was sized at.
    pub price: f64,
    /// Cash notional (`quantity × price`).
    pub value: f64,
    /// Expected trading fee.
    pub fee: f64,
}

/// What an order actually executed as.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fill {
    pub quantity: f64,
    pub price: f64,
    pub fee: f64,
}

impl Fill {
    /// Cash notional of the fill.
    #[inline]
    pub fn value(&self) -> f64 {
        self.quantity * self.price
    }
}

/// An order the backend could not execute. The asset is skipped for the pass.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{side} {asset} failed: {message}")]
pub struct OrderExecutionError {
    pub asset: Symbol,
    pub side: Side,
    pub message: String,
}

impl OrderExecutionError {
    pub fn new(order: &OrderRequest, message: impl Into<String>) -> Self {
        Self {
            asset: order.asset,
            side: order.side,
            message: message.into(),
        }
    }
}

/// Destination for engine orders.
pub trait ExecutionBackend {
    fn execute(&mut self, order: &OrderRequest) -> Result<Fill, OrderExecutionError>;
}

/// Fills every order in full at its reference price and expected fee.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedBackend;

impl ExecutionBackend for SimulatedBackend {
    fn execute(&mut self, order: &OrderRequest) -> Result<Fill, OrderExecutionError> {
        Ok(Fill {
            quantity: order.quantity,
            price: order.price,
            fee: order.fee,
        })
    }
}
