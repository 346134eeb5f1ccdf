//! Bitkub REST API client.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use thbfolio::Timestamp;
use zeroize::Zeroizing;

use super::auth;
use super::types::{
    ApiResponse, Balances, HistoryResponse, MarketTickerEntry, OrderResult, StatusEntry,
    TickerEntry,
};
use crate::error::BrokerError;
use crate::types::MarketTicker;

/// Production API host.
pub const DEFAULT_HOST: &str = "https://api.bitkub.com";

/// Blocking Bitkub REST client.
pub struct BitkubClient {
    client: Client,
    api_key: String,
    secret_key: Zeroizing<String>,
    base_url: String,
}

impl BitkubClient {
    /// Create a client for the production host with a 10s timeout.
    pub fn new(api_key: &str, secret_key: &str) -> Result<Self, BrokerError> {
        Self::with_host(DEFAULT_HOST, api_key, secret_key, Duration::from_secs(10))
    }

    /// Create a client for an arbitrary host.
    pub fn with_host(
        host: &str,
        api_key: &str,
        secret_key: &str,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            secret_key: Zeroizing::new(secret_key.to_string()),
            base_url: host.trim_end_matches('/').to_string(),
        })
    }

    /// A client for public endpoints only. Signed calls fail with `Auth`.
    pub fn public(host: &str, timeout: Duration) -> Result<Self, BrokerError> {
        Self::with_host(host, "", "", timeout)
    }

    /// Endpoint health (GET /api/status).
    pub fn server_status(&self) -> Result<Vec<StatusEntry>, BrokerError> {
        self.get_json("/api/status")
    }

    /// Available balances for every currency (POST /api/v3/market/balances).
    pub fn wallet_balances(&self) -> Result<Balances, BrokerError> {
        self.signed_post("/api/v3/market/balances", None)
    }

    /// Last prices for every market (GET /api/v3/market/ticker).
    pub fn tickers(&self) -> Result<Vec<TickerEntry>, BrokerError> {
        self.get_json("/api/v3/market/ticker")
    }

    /// Market buy spending `amount` of cash (POST /api/v3/market/place-bid).
    ///
    /// `sym` is lowercase asset-first, e.g. `btc_thb`. The amount is floored
    /// to 2 decimals so it never exceeds the cash the engine reserved.
    pub fn place_bid(&self, sym: &str, amount: f64) -> Result<OrderResult, BrokerError> {
        self.place_market("/api/v3/market/place-bid", sym, bid_amount(amount))
    }

    /// Market sell of `quantity` asset units (POST /api/v3/market/place-ask).
    ///
    /// The quantity is floored to 8 decimals so it never exceeds the balance.
    pub fn place_ask(&self, sym: &str, quantity: f64) -> Result<OrderResult, BrokerError> {
        self.place_market("/api/v3/market/place-ask", sym, ask_amount(quantity))
    }

    fn place_market(&self, path: &str, sym: &str, amt: f64) -> Result<OrderResult, BrokerError> {
        let body = serde_json::json!({ "sym": sym, "amt": amt, "rat": 0, "typ": "market" });
        debug!("Submitting Bitkub order {path}: {body}");
        self.signed_post(path, Some(&body)).map_err(|e| match e {
            BrokerError::Connection(msg) => BrokerError::Order(msg),
            other => other,
        })
    }

    /// Closing prices (GET /tradingview/history).
    ///
    /// `sym` is lowercase asset-first, `resolution` is TradingView style
    /// (`"D"`, `"60"`, ...), `from`/`to` are unix seconds.
    pub fn history(
        &self,
        sym: &str,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<(Timestamp, f64)>, BrokerError> {
        let path = format!(
            "/tradingview/history?symbol={sym}&resolution={resolution}&from={from}&to={to}"
        );
        let resp: HistoryResponse = self.get_json(&path)?;
        resp.into_closes()
    }

    /// 24h summary of every market (GET /api/market/ticker).
    pub fn market_tickers(&self) -> Result<Vec<MarketTicker>, BrokerError> {
        let raw: std::collections::HashMap<String, MarketTickerEntry> =
            self.get_json("/api/market/ticker")?;
        Ok(raw
            .into_iter()
            .map(|(pair, entry)| entry.into_ticker(pair))
            .collect())
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| BrokerError::Connection(format!("GET {path} failed: {e}")))?;
        parse(path, resp)
    }

    fn signed_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, BrokerError> {
        if self.api_key.is_empty() || self.secret_key.is_empty() {
            return Err(BrokerError::Auth("missing API credentials".into()));
        }

        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let timestamp = current_timestamp_ms();
        let signature = auth::sign(
            &auth::payload(timestamp, "POST", path, &body),
            &self.secret_key,
        );
        let url = format!("{}{path}", self.base_url);

        let resp = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("X-BTK-TIMESTAMP", timestamp.to_string())
            .header("X-BTK-SIGN", signature)
            .header("X-BTK-APIKEY", &self.api_key)
            .body(body)
            .send()
            .map_err(|e| BrokerError::Connection(format!("POST {path} failed: {e}")))?;

        let envelope: ApiResponse<T> = parse(path, resp)?;
        envelope.into_result()
    }
}

fn parse<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, BrokerError> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        return Err(BrokerError::Connection(format!(
            "{path} returned {status}: {body}"
        )));
    }

    resp.json::<T>()
        .map_err(|e| BrokerError::Parse(format!("{path}: {e}")))
}

/// Current timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Absorbs representation error so `1.15` stays `1.15` rather than `1.14`.
const FLOOR_SLACK: f64 = 1e-6;

/// Cash amount for a market bid, truncated to 2 decimals.
pub(crate) fn bid_amount(amount: f64) -> f64 {
    floor_to(amount, 100.0)
}

/// Asset quantity for a market ask, truncated to 8 decimals.
pub(crate) fn ask_amount(quantity: f64) -> f64 {
    floor_to(quantity, 1e8)
}

fn floor_to(value: f64, scale: f64) -> f64 {
    ((value * scale) + FLOOR_SLACK).floor() / scale
}
