//! Bitkub-specific API response types.
//!
//! Bitkub reports numbers as JSON numbers on some endpoints and as strings
//! on others, so numeric fields go through [`lenient_f64`].

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use thbfolio::{Side, Timestamp};

use crate::error::BrokerError;
use crate::types::{MarketTicker, OrderReceipt, ServiceStatus};

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    match Number::deserialize(deserializer)? {
        Number::Float(v) => Ok(v),
        Number::Text(s) if s.trim().is_empty() => Ok(0.0),
        Number::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Envelope around every signed endpoint's payload.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub error: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub result: Option<T>,
}

impl<T> ApiResponse<T> {
    /// The payload, or the API error the envelope carries.
    pub fn into_result(self) -> Result<T, BrokerError> {
        if self.error != 0 {
            return Err(BrokerError::Api {
                code: self.error,
                message: self.message.unwrap_or_else(|| "unknown error".into()),
            });
        }
        self.result
            .ok_or_else(|| BrokerError::Parse("response has no result".into()))
    }
}

/// One entry of `GET /api/status`.
#[derive(Debug, Deserialize)]
pub struct StatusEntry {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl From<StatusEntry> for ServiceStatus {
    fn from(entry: StatusEntry) -> Self {
        ServiceStatus {
            name: entry.name,
            status: entry.status,
            message: entry.message,
        }
    }
}

/// One currency in the `POST /api/v3/market/balances` result.
#[derive(Debug, Deserialize)]
pub struct BalanceEntry {
    #[serde(deserialize_with = "lenient_f64")]
    pub available: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub reserved: f64,
}

/// Balances keyed by currency code (`"THB"`, `"BTC"`, ...).
pub type Balances = HashMap<String, BalanceEntry>;

/// One market of `GET /api/v3/market/ticker`.
#[derive(Debug, Deserialize)]
pub struct TickerEntry {
    /// `"BTC_THB"` style, asset first.
    pub symbol: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub last: f64,
}

/// Result of `place-bid` / `place-ask`.
#[derive(Debug, Deserialize)]
pub struct OrderResult {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub typ: String,
    /// Cash spent (bid) or asset units sold (ask).
    #[serde(deserialize_with = "lenient_f64")]
    pub amt: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fee: f64,
    /// Asset units received (bid) or cash received net of fee (ask).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rec: f64,
}

impl OrderResult {
    /// Convert to a receipt, falling back to `reference_price` when the
    /// venue reports nothing received.
    ///
    /// A bid's `amt` is the gross cash outlay with the fee taken out of it,
    /// so the unit price is `(amt - fee) / rec`. An ask's `rec` is already
    /// net of fee, so the unit price is `(rec + fee) / amt`.
    pub fn receipt(&self, side: Side, reference_price: f64) -> OrderReceipt {
        match side {
            Side::Buy => OrderReceipt {
                executed_quantity: self.rec,
                executed_price: if self.rec > 0.0 {
                    (self.amt - self.fee) / self.rec
                } else {
                    reference_price
                },
                fee: self.fee,
            },
            Side::Sell => OrderReceipt {
                executed_quantity: self.amt,
                executed_price: if self.amt > 0.0 && self.rec > 0.0 {
                    (self.rec + self.fee) / self.amt
                } else {
                    reference_price
                },
                fee: self.fee,
            },
        }
    }
}

/// `GET /tradingview/history` response.
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub s: String,
    #[serde(default)]
    pub t: Vec<i64>,
    #[serde(default)]
    pub c: Vec<f64>,
}

impl HistoryResponse {
    /// `(timestamp, close)` pairs in UTC.
    pub fn into_closes(self) -> Result<Vec<(Timestamp, f64)>, BrokerError> {
        if self.s != "ok" {
            return Err(BrokerError::Other(format!("history status {:?}", self.s)));
        }
        if self.t.len() != self.c.len() {
            return Err(BrokerError::Parse(format!(
                "history has {} timestamps but {} closes",
                self.t.len(),
                self.c.len()
            )));
        }
        self.t
            .into_iter()
            .zip(self.c)
            .map(|(t, c)| {
                chrono::DateTime::from_timestamp(t, 0)
                    .map(|dt| (dt.naive_utc(), c))
                    .ok_or_else(|| BrokerError::Parse(format!("bad timestamp {t}")))
            })
            .collect()
    }
}

/// One market of the legacy `GET /api/market/ticker` map.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTickerEntry {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lowest_ask: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub highest_bid: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub base_volume: f64,
}

impl MarketTickerEntry {
    pub fn into_ticker(self, pair: String) -> MarketTicker {
        MarketTicker {
            pair,
            last: self.last,
            lowest_ask: self.lowest_ask,
            highest_bid: self.highest_bid,
            base_volume: self.base_volume,
        }
    }
}
