//! JSONL audit trail logging.
//!
//! Each live run appends events to an audit.jsonl file, one JSON object per
//! line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thbfolio::portfolio::Valuation;
use thbfolio::{Plan, RunSummary, Skip, Trade};

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log a run start event.
pub fn log_run_started(audit: &mut AuditLog, target_file: &str, dry_run: bool) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "target_file": target_file,
            "dry_run": dry_run,
        }),
    )
}

/// Convenience: log balances and prices as fetched.
pub fn log_balances(audit: &mut AuditLog, valuation: &Valuation) -> Result<()> {
    let assets: Vec<_> = valuation
        .assets
        .iter()
        .map(|a| {
            serde_json::json!({
                "symbol": a.symbol.as_str(),
                "qty": a.quantity,
                "price": a.price,
                "value": a.value,
            })
        })
        .collect();

    audit.log(
        "balances_fetched",
        serde_json::json!({
            "cash": valuation.cash,
            "assets": assets,
            "total_value": valuation.total,
        }),
    )
}

/// Convenience: log the sized orders and upfront skips.
pub fn log_plan(audit: &mut AuditLog, plan: &Plan) -> Result<()> {
    let orders: Vec<_> = plan
        .orders
        .iter()
        .map(|o| {
            serde_json::json!({
                "symbol": o.asset.as_str(),
                "side": o.side.as_str(),
                "qty": o.quantity,
                "price": o.price,
                "value": o.value,
                "fee": o.fee,
            })
        })
        .collect();
    let skips: Vec<_> = plan.skips.iter().map(skip_json).collect();

    audit.log(
        "plan_computed",
        serde_json::json!({ "orders": orders, "skips": skips }),
    )
}

/// Convenience: log an executed trade.
pub fn log_order_filled(audit: &mut AuditLog, trade: &Trade) -> Result<()> {
    audit.log(
        "order_filled",
        serde_json::json!({
            "symbol": trade.asset.as_str(),
            "side": trade.side.as_str(),
            "qty": trade.quantity,
            "price": trade.price,
            "value": trade.value,
            "fee": trade.fee,
            "portfolio_value": trade.portfolio_value,
        }),
    )
}

/// Convenience: log an asset the pass could not trade.
pub fn log_order_failed(audit: &mut AuditLog, skip: &Skip) -> Result<()> {
    audit.log("order_failed", skip_json(skip))
}

/// Convenience: log run completion, with the post-trade summary when orders
/// were sent.
pub fn log_run_completed(
    audit: &mut AuditLog,
    submitted: usize,
    filled: usize,
    failed: usize,
    fees: f64,
    summary: Option<&RunSummary>,
) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "submitted": submitted,
            "filled": filled,
            "failed": failed,
            "fees": fees,
            "summary": summary,
        }),
    )
}

fn skip_json(skip: &Skip) -> serde_json::Value {
    serde_json::json!({
        "symbol": skip.asset.as_str(),
        "reason": skip.reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thbfolio::{SkipReason, Symbol};

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("test_event").unwrap();
            log.log("test_data", serde_json::json!({"key": "value"}))
                .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in &lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }

        assert!(lines[0].contains("\"event\":\"test_event\""));
        assert!(lines[1].contains("\"key\":\"value\""));
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log_simple("test").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn failed_order_event_carries_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let skip = Skip {
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            asset: Symbol::new("SAND"),
            reason: SkipReason::Unpriced,
        };

        {
            let mut log = AuditLog::open(&path).unwrap();
            log_order_failed(&mut log, &skip).unwrap();
        }

        let line = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["event"], "order_failed");
        assert_eq!(value["symbol"], "SAND");
        assert_eq!(value["reason"], SkipReason::Unpriced.to_string());
    }
}
