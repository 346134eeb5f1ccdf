//! Portfolio valuation against a price snapshot.

use crate::portfolio::Portfolio;
use crate::price::PricePoint;
use crate::types::Symbol;

/// `cash + Σ quantity × price` over non-cash holdings.
///
/// An asset without a usable price contributes 0 for the period. The sum
/// runs in holdings order so equal inputs give bit-identical results.
pub fn total_value(portfolio: &Portfolio, prices: &PricePoint) -> f64 {
    portfolio
        .holdings()
        .fold(portfolio.cash(), |acc, (symbol, qty)| {
            acc + prices.price(symbol).map_or(0.0, |p| qty * p)
        })
}

/// Value and weight of one holding.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssetValuation {
    pub symbol: Symbol,
    pub quantity: f64,
    pub price: Option<f64>,
    pub value: f64,
    pub weight: f64,
}

/// A frozen view of a portfolio at one set of prices.
///
/// The decision engine reads every asset from one of these so all trades in
/// a pass are sized against the same total.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Valuation {
    pub total: f64,
    pub cash: f64,
    pub cash_weight: f64,
    pub assets: Vec<AssetValuation>,
}

impl Valuation {
    pub fn of(portfolio: &Portfolio, prices: &PricePoint) -> Self {
        let total = total_value(portfolio, prices);
        let weight_of = |value: f64| if total > 0.0 { value / total } else { 0.0 };

        let assets = portfolio
            .holdings()
            .map(|(symbol, quantity)| {
                let price = prices.price(symbol);
                let value = price.map_or(0.0, |p| quantity * p);
                AssetValuation {
                    symbol,
                    quantity,
                    price,
                    value,
                    weight: weight_of(value),
                }
            })
            .collect();

        Self {
            total,
            cash: portfolio.cash(),
            cash_weight: weight_of(portfolio.cash()),
            assets,
        }
    }

    pub fn asset(&self, symbol: Symbol) -> Option<&AssetValuation> {
        self.assets.iter().find(|a| a.symbol == symbol)
    }

    /// Current value held in `symbol`; 0 if not held or unpriced.
    pub fn value(&self, symbol: Symbol) -> f64 {
        self.asset(symbol).map_or(0.0, |a| a.value)
    }

    /// Weight of `symbol` in the total, 0 for a worthless portfolio.
    pub fn weight(&self, symbol: Symbol) -> f64 {
        self.asset(symbol).map_or(0.0, |a| a.weight)
    }
}
