//! Target allocation: desired weight per asset, cash leg included.

use crate::error::ConfigError;
use crate::types::Symbol;

/// Allowed drift of the weight sum away from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Validated target weights in insertion order.
///
/// Construction is the only place the invariants are checked: non-empty,
/// cash present, no duplicates, each weight in `[0, 1]`, sum within
/// [`WEIGHT_SUM_TOLERANCE`] of 1.0. The engine processes assets in the order
/// given here.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TargetAllocation {
    cash: Symbol,
    weights: Vec<(Symbol, f64)>,
}

impl TargetAllocation {
    pub fn new(cash: Symbol, weights: Vec<(Symbol, f64)>) -> Result<Self, ConfigError> {
        if weights.is_empty() {
            return Err(ConfigError::EmptyTargets);
        }

        for (i, &(symbol, weight)) in weights.iter().enumerate() {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::InvalidWeight { symbol, weight });
            }
            if weights[..i].iter().any(|&(s, _)| s == symbol) {
                return Err(ConfigError::DuplicateSymbol(symbol));
            }
        }

        if !weights.iter().any(|&(s, _)| s == cash) {
            return Err(ConfigError::MissingCash(cash));
        }

        let sum: f64 = weights.iter().map(|&(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }

        Ok(Self { cash, weights })
    }

    /// The cash leg symbol.
    #[inline]
    pub fn cash(&self) -> Symbol {
        self.cash
    }

    /// All entries, cash included, in insertion order.
    pub fn entries(&self) -> &[(Symbol, f64)] {
        &self.weights
    }

    /// Non-cash assets with their target weight, in insertion order.
    pub fn assets(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        let cash = self.cash;
        self.weights.iter().copied().filter(move |&(s, _)| s != cash)
    }

    /// Target weight for `symbol`, 0 when it is not part of the allocation.
    pub fn weight(&self, symbol: Symbol) -> f64 {
        self.weights
            .iter()
            .find(|&&(s, _)| s == symbol)
            .map(|&(_, w)| w)
            .unwrap_or(0.0)
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.weights.iter().any(|&(s, _)| s == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thb() -> Symbol {
        Symbol::new("THB")
    }
    fn btc() -> Symbol {
        Symbol::new("BTC")
    }
    fn xrp() -> Symbol {
        Symbol::new("XRP")
    }

    #[test]
    fn valid_allocation_keeps_order() {
        let t = TargetAllocation::new(thb(), vec![(xrp(), 0.3), (thb(), 0.2), (btc(), 0.5)])
            .unwrap();
        let assets: Vec<_> = t.assets().map(|(s, _)| s).collect();
        assert_eq!(assets, vec![xrp(), btc()]);
        assert_eq!(t.weight(thb()), 0.2);
        assert_eq!(t.weight(Symbol::new("ETH")), 0.0);
    }

    #[test]
    fn tolerance_is_inclusive() {
        assert!(TargetAllocation::new(thb(), vec![(thb(), 0.5), (btc(), 0.505)]).is_ok());
        assert!(matches!(
            TargetAllocation::new(thb(), vec![(thb(), 0.5), (btc(), 0.52)]),
            Err(ConfigError::WeightSum { sum }) if (sum - 1.02).abs() < 1e-12
        ));
    }

    #[test]
    fn rejects_missing_cash() {
        assert_eq!(
            TargetAllocation::new(thb(), vec![(btc(), 1.0)]),
            Err(ConfigError::MissingCash(thb()))
        );
    }

    #[test]
    fn rejects_empty_and_duplicates() {
        assert_eq!(
            TargetAllocation::new(thb(), vec![]),
            Err(ConfigError::EmptyTargets)
        );
        assert_eq!(
            TargetAllocation::new(thb(), vec![(thb(), 0.5), (btc(), 0.25), (btc(), 0.25)]),
            Err(ConfigError::DuplicateSymbol(btc()))
        );
    }

    #[test]
    fn rejects_out_of_range_weight() {
        assert!(matches!(
            TargetAllocation::new(thb(), vec![(thb(), 1.5), (btc(), -0.5)]),
            Err(ConfigError::InvalidWeight { .. })
        ));
        assert!(matches!(
            TargetAllocation::new(thb(), vec![(thb(), f64::NAN)]),
            Err(ConfigError::InvalidWeight { .. })
        ));
    }
}
