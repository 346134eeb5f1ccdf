//! Trade direction relative to the cash leg.

use std::fmt;
use std::str::FromStr;

/// Direction of a rebalance trade.
///
/// `Buy` spends cash for the asset, `Sell` converts the asset back to cash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Side needed to close a signed value gap (`target - current`).
    #[inline]
    pub fn for_gap(gap: f64) -> Self {
        if gap > 0.0 { Side::Buy } else { Side::Sell }
    }

    /// Ledger label.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}
