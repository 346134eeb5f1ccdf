//! Exchange trait and implementations for thbfolio.
//!
//! Provides a generic `Exchange` trait that abstracts over the venue the
//! rebalancer trades on. Implementations:
//!
//! - **Bitkub** (feature `bitkub`): Bitkub spot REST API, THB markets
//! - **Mock** (always available): in-memory exchange for tests and dry runs

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "bitkub")]
pub mod bitkub;

pub use error::BrokerError;
pub use types::*;

use thbfolio::Symbol;

/// An exchange connection that can report balances and prices and take market orders.
///
/// Balances and prices are keyed by asset symbol; the cash leg is implied by
/// the venue (THB for Bitkub). Assets the venue does not know are simply
/// absent from the returned lists.
pub trait Exchange {
    /// Health of the venue's endpoints.
    fn status(&self) -> Result<Vec<ServiceStatus>, BrokerError>;

    /// Available balances for the requested assets (the cash symbol included).
    fn balances(&self, assets: &[Symbol]) -> Result<Vec<(Symbol, f64)>, BrokerError>;

    /// Last traded cash price for each requested asset that has one.
    fn prices(&self, assets: &[Symbol]) -> Result<Vec<(Symbol, f64)>, BrokerError>;

    /// Submit a market order and report what executed.
    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderReceipt, BrokerError>;
}

impl<E: Exchange + ?Sized> Exchange for &E {
    fn status(&self) -> Result<Vec<ServiceStatus>, BrokerError> {
        (**self).status()
    }

    fn balances(&self, assets: &[Symbol]) -> Result<Vec<(Symbol, f64)>, BrokerError> {
        (**self).balances(assets)
    }

    fn prices(&self, assets: &[Symbol]) -> Result<Vec<(Symbol, f64)>, BrokerError> {
        (**self).prices(assets)
    }

    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderReceipt, BrokerError> {
        (**self).submit_order(order)
    }
}
