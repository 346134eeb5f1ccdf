//! Price snapshots: one timestamp, last price per asset.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::types::{Symbol, Timestamp};

/// Last traded prices for a set of assets at one instant.
///
/// Prices are quoted in the cash leg. An asset with no entry, or with a
/// non-positive or non-finite price, is unpriced for the period.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricePoint {
    pub timestamp: Timestamp,
    prices: FxHashMap<Symbol, f64>,
}

impl PricePoint {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            prices: FxHashMap::default(),
        }
    }

    /// Build from `(asset, price)` pairs. Later duplicates overwrite earlier ones.
    pub fn from_pairs(timestamp: Timestamp, pairs: impl IntoIterator<Item = (Symbol, f64)>) -> Self {
        Self {
            timestamp,
            prices: pairs.into_iter().collect(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, asset: Symbol, price: f64) -> Self {
        self.set(asset, price);
        self
    }

    pub fn set(&mut self, asset: Symbol, price: f64) {
        self.prices.insert(asset, price);
    }

    /// Usable price for `asset`, `None` if missing or not strictly positive.
    #[inline]
    pub fn price(&self, asset: Symbol) -> Option<f64> {
        self.prices
            .get(&asset)
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    pub fn is_priced(&self, asset: Symbol) -> bool {
        self.price(asset).is_some()
    }

    /// True when at least one of `assets` has a usable price.
    pub fn any_priced(&self, mut assets: impl Iterator<Item = Symbol>) -> bool {
        assets.any(|a| self.is_priced(a))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Check that a series is non-empty and strictly ascending in time.
pub fn validate_series(series: &[PricePoint]) -> Result<()> {
    if series.is_empty() {
        return Err(Error::EmptySeries);
    }
    for (i, pair) in series.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(Error::UnorderedSeries { index: i + 1 });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn unusable_prices_are_unpriced() {
        let btc = Symbol::new("BTC");
        let p = PricePoint::new(day(1)).with(btc, 0.0);
        assert_eq!(p.price(btc), None);
        let p = p.with(btc, f64::NAN);
        assert_eq!(p.price(btc), None);
        let p = p.with(btc, 1_000_000.0);
        assert_eq!(p.price(btc), Some(1_000_000.0));
        assert_eq!(p.price(Symbol::new("ETH")), None);
    }

    #[test]
    fn series_must_ascend() {
        assert_eq!(validate_series(&[]), Err(Error::EmptySeries));
        let ok = [PricePoint::new(day(1)), PricePoint::new(day(2))];
        assert!(validate_series(&ok).is_ok());
        let dup = [
            PricePoint::new(day(1)),
            PricePoint::new(day(3)),
            PricePoint::new(day(3)),
        ];
        assert_eq!(
            validate_series(&dup),
            Err(Error::UnorderedSeries { index: 2 })
        );
    }
}
