//! CSV trade ledger.
//!
//! One row per executed trade:
//! `Timestamp,Currency,Action,Amount,Price,Fee,Portfolio_Value`.
//! Live runs append to a running ledger; backtests rewrite theirs.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thbfolio::{Side, Trade};

use crate::error::Result;
use crate::history::TIMESTAMP_FORMAT;

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Currency")]
    pub currency: String,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Fee")]
    pub fee: f64,
    #[serde(rename = "Portfolio_Value")]
    pub portfolio_value: f64,
}

impl From<&Trade> for LedgerRow {
    fn from(trade: &Trade) -> Self {
        LedgerRow {
            timestamp: trade.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            currency: trade.asset.to_string(),
            action: match trade.side {
                Side::Buy => "Buy",
                Side::Sell => "Sell",
            }
            .to_string(),
            amount: trade.quantity,
            price: trade.price,
            fee: trade.fee,
            portfolio_value: trade.portfolio_value,
        }
    }
}

/// Append-only CSV writer for trades.
pub struct TradeLedger {
    writer: csv::Writer<File>,
}

impl TradeLedger {
    /// Open for appending, writing the header only if the file is new or empty.
    pub fn append(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        Ok(Self { writer })
    }

    /// Create or truncate.
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let file = File::create(path)?;
        Ok(Self {
            writer: csv::Writer::from_writer(file),
        })
    }

    pub fn record(&mut self, trade: &Trade) -> Result<()> {
        self.writer.serialize(LedgerRow::from(trade))?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn record_all<'a>(&mut self, trades: impl IntoIterator<Item = &'a Trade>) -> Result<()> {
        for trade in trades {
            self.writer.serialize(LedgerRow::from(trade))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Read a ledger back.
pub fn read_ledger(path: &Path) -> Result<Vec<LedgerRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use thbfolio::Symbol;

    fn trade(side: Side, value: f64) -> Trade {
        Trade {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            asset: Symbol::new("XRP"),
            side,
            quantity: value / 20.0,
            price: 20.0,
            value,
            fee: 0.25,
            portfolio_value: 1_000.0,
        }
    }

    #[test]
    fn row_from_trade() {
        let row = LedgerRow::from(&trade(Side::Sell, 100.0));
        assert_eq!(row.timestamp, "2024-03-01 09:30:00");
        assert_eq!(row.currency, "XRP");
        assert_eq!(row.action, "Sell");
        assert_eq!(row.amount, 5.0);
        assert_eq!(row.portfolio_value, 1_000.0);
    }

    #[test]
    fn append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("trade_log.csv");

        {
            let mut ledger = TradeLedger::append(&path).unwrap();
            ledger.record(&trade(Side::Buy, 100.0)).unwrap();
        }
        {
            let mut ledger = TradeLedger::append(&path).unwrap();
            ledger.record(&trade(Side::Sell, 60.0)).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("Timestamp,Currency").count(), 1);
        assert!(contents.starts_with("Timestamp,Currency,Action,Amount,Price,Fee,Portfolio_Value\n"));

        let rows = read_ledger(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].action, "Buy");
        assert_eq!(rows[1].amount, 3.0);
    }

    #[test]
    fn create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest_log.csv");

        let first = [trade(Side::Buy, 100.0), trade(Side::Buy, 40.0)];
        TradeLedger::create(&path).unwrap().record_all(&first).unwrap();
        TradeLedger::create(&path)
            .unwrap()
            .record_all(&[trade(Side::Sell, 20.0)])
            .unwrap();

        let rows = read_ledger(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "Sell");
    }
}
