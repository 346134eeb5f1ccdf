//! Liquidity scan over the exchange's cash-quoted markets.

use std::path::Path;

use serde::Serialize;
use thbfolio::{Symbol, parse_pair};
use thbfolio_broker::MarketTicker;

use crate::error::Result;

/// One market's 24h liquidity figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityRow {
    #[serde(rename = "Coin")]
    pub asset: String,
    #[serde(rename = "Last Price (THB)")]
    pub last: f64,
    #[serde(rename = "Volume (24h)")]
    pub volume: f64,
    #[serde(rename = "Bid-Ask Spread (THB)")]
    pub spread: f64,
    #[serde(rename = "Spread (%)")]
    pub spread_pct: f64,
}

/// Markets quoted in `cash`, most traded first.
///
/// Spread is `lowest_ask - highest_bid`; spread % is relative to the last
/// price and 0 when there is no last price.
pub fn rank(tickers: &[MarketTicker], cash: Symbol) -> Vec<LiquidityRow> {
    let mut rows: Vec<LiquidityRow> = tickers
        .iter()
        .filter_map(|t| {
            let (quote, asset) = parse_pair(&t.pair)?;
            if quote != cash {
                return None;
            }
            let spread = t.lowest_ask - t.highest_bid;
            let spread_pct = if t.last != 0.0 {
                spread / t.last * 100.0
            } else {
                0.0
            };
            Some(LiquidityRow {
                asset: asset.to_string(),
                last: t.last,
                volume: t.base_volume,
                spread,
                spread_pct,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.volume.total_cmp(&a.volume).then_with(|| a.asset.cmp(&b.asset)));
    rows
}

/// The `n` highest-volume rows.
pub fn top_by_volume(rows: &[LiquidityRow], n: usize) -> Vec<&LiquidityRow> {
    let mut sorted: Vec<&LiquidityRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.volume.total_cmp(&a.volume));
    sorted.truncate(n);
    sorted
}

/// The `n` tightest markets by spread %.
pub fn top_by_spread(rows: &[LiquidityRow], n: usize) -> Vec<&LiquidityRow> {
    let mut sorted: Vec<&LiquidityRow> = rows.iter().collect();
    sorted.sort_by(|a, b| a.spread_pct.total_cmp(&b.spread_pct));
    sorted.truncate(n);
    sorted
}

/// Save a scan as CSV.
pub fn write_csv(rows: &[LiquidityRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
