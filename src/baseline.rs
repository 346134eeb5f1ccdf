//! Buy-and-hold comparator.

use crate::portfolio::{Portfolio, total_value};
use crate::price::PricePoint;

/// A portfolio frozen right after bootstrap and only ever revalued.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Baseline {
    holdings: Portfolio,
}

impl Baseline {
    /// Freeze a copy of the bootstrapped portfolio.
    pub fn bootstrap(portfolio: &Portfolio) -> Self {
        Self {
            holdings: portfolio.clone(),
        }
    }

    /// Value of the frozen holdings at `prices`.
    pub fn value_at(&self, prices: &PricePoint) -> f64 {
        total_value(&self.holdings, prices)
    }

    pub fn holdings(&self) -> &Portfolio {
        &self.holdings
    }
}
