//! Bitkub spot exchange implementation.
//!
//! All markets are quoted in THB. Bitkub names a market asset-first
//! (`BTC_THB`, `btc_thb`) on the v3 endpoints and cash-first (`THB_BTC`) on
//! the legacy ticker.

pub mod auth;
pub mod client;
pub mod types;

use log::warn;
use thbfolio::{Side, Symbol};

use crate::Exchange;
use crate::error::BrokerError;
use crate::types::*;
pub use client::{BitkubClient, DEFAULT_HOST};

/// Market name for order and history endpoints, e.g. `btc_thb`.
pub fn market_symbol(asset: Symbol) -> String {
    format!("{}_thb", asset.as_str().to_ascii_lowercase())
}

/// Ticker name on the v3 ticker endpoint, e.g. `BTC_THB`.
pub fn ticker_symbol(asset: Symbol) -> String {
    format!("{}_THB", asset.as_str().to_ascii_uppercase())
}

impl Exchange for BitkubClient {
    fn status(&self) -> Result<Vec<ServiceStatus>, BrokerError> {
        Ok(self
            .server_status()?
            .into_iter()
            .map(ServiceStatus::from)
            .collect())
    }

    fn balances(&self, assets: &[Symbol]) -> Result<Vec<(Symbol, f64)>, BrokerError> {
        let wallet = self.wallet_balances()?;
        Ok(assets
            .iter()
            .map(|&asset| {
                let available = wallet.get(asset.as_str()).map_or(0.0, |b| b.available);
                (asset, available)
            })
            .collect())
    }

    fn prices(&self, assets: &[Symbol]) -> Result<Vec<(Symbol, f64)>, BrokerError> {
        let tickers = self.tickers()?;
        let mut prices = Vec::with_capacity(assets.len());
        for &asset in assets {
            let name = ticker_symbol(asset);
            match tickers.iter().find(|t| t.symbol == name) {
                Some(t) if t.last > 0.0 => prices.push((asset, t.last)),
                _ => warn!("No price for {asset} (looked up as {name})"),
            }
        }
        Ok(prices)
    }

    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderReceipt, BrokerError> {
        let sym = market_symbol(order.asset);
        let result = match order.side {
            Side::Buy => self.place_bid(&sym, order.value)?,
            Side::Sell => self.place_ask(&sym, order.quantity)?,
        };
        Ok(result.receipt(order.side, order.reference_price()))
    }
}
