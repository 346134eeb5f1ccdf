//! Target allocation file (target.json) loading and validation.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thbfolio::{Symbol, TargetAllocation};

use crate::error::{Error, Result};

/// Target weights as written in target.json.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    /// When the targets were produced. Informational only.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub targets: Vec<TargetPosition>,
}

/// A single target: symbol + weight of total portfolio value.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetPosition {
    pub symbol: String,
    pub weight: f64,
}

impl TargetSpec {
    /// Load and validate a target.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::TargetRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: TargetSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Checks that only concern the file itself; weight rules live in
    /// [`TargetAllocation::new`].
    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::Target("targets list is empty".into()));
        }
        for t in &self.targets {
            if t.symbol.is_empty() {
                return Err(Error::Target("empty symbol".into()));
            }
            if Symbol::try_new(&t.symbol).is_none() {
                return Err(Error::Target(format!(
                    "symbol '{}' exceeds {} bytes",
                    t.symbol,
                    Symbol::MAX_LEN
                )));
            }
        }
        Ok(())
    }

    /// Build the engine's allocation with `cash` as the cash leg.
    pub fn allocation(&self, cash: Symbol) -> Result<TargetAllocation> {
        let weights = self
            .targets
            .iter()
            .map(|t| (Symbol::new(&t.symbol), t.weight))
            .collect();
        Ok(TargetAllocation::new(cash, weights)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thbfolio::ConfigError;

    fn thb() -> Symbol {
        Symbol::new("THB")
    }

    fn valid_json() -> &'static str {
        r#"{
            "timestamp": "2026-02-08T15:30:00Z",
            "targets": [
                { "symbol": "THB",  "weight": 0.50 },
                { "symbol": "XRP",  "weight": 0.25 },
                { "symbol": "SAND", "weight": 0.25 }
            ]
        }"#
    }

    #[test]
    fn parse_valid_target() {
        let spec = TargetSpec::from_json(valid_json()).unwrap();
        assert_eq!(spec.targets.len(), 3);
        assert_eq!(spec.targets[1].symbol, "XRP");
        assert_eq!(spec.targets[1].weight, 0.25);
        assert!(spec.timestamp.is_some());
    }

    #[test]
    fn allocation_conversion() {
        let spec = TargetSpec::from_json(valid_json()).unwrap();
        let alloc = spec.allocation(thb()).unwrap();
        assert_eq!(alloc.cash(), thb());
        assert_eq!(alloc.weight(Symbol::new("SAND")), 0.25);
        assert_eq!(alloc.assets().count(), 2);
    }

    #[test]
    fn timestamp_is_optional() {
        let json = r#"{"targets":[{"symbol":"THB","weight":1.0}]}"#;
        let spec = TargetSpec::from_json(json).unwrap();
        assert!(spec.timestamp.is_none());
    }

    #[test]
    fn reject_empty_targets() {
        let json = r#"{"targets":[]}"#;
        assert!(matches!(TargetSpec::from_json(json), Err(Error::Target(_))));
    }

    #[test]
    fn reject_long_symbol() {
        let json = r#"{"targets":[{ "symbol": "TOOLONGNAME", "weight": 0.5 }]}"#;
        assert!(matches!(TargetSpec::from_json(json), Err(Error::Target(_))));
    }

    #[test]
    fn reject_malformed_json() {
        assert!(matches!(
            TargetSpec::from_json("{ targets: "),
            Err(Error::TargetParse(_))
        ));
    }

    #[test]
    fn reject_missing_cash_leg() {
        let json = r#"{"targets":[{ "symbol": "BTC", "weight": 1.0 }]}"#;
        let spec = TargetSpec::from_json(json).unwrap();
        match spec.allocation(thb()) {
            Err(Error::Core(thbfolio::Error::Config(ConfigError::MissingCash(s)))) => {
                assert_eq!(s, thb())
            }
            other => panic!("expected missing cash, got {other:?}"),
        }
    }

    #[test]
    fn reject_bad_weight_sum() {
        let json = r#"{"targets":[
            { "symbol": "THB", "weight": 0.6 },
            { "symbol": "BTC", "weight": 0.5 }
        ]}"#;
        let spec = TargetSpec::from_json(json).unwrap();
        assert!(spec.allocation(thb()).is_err());
    }

    #[test]
    fn load_missing_file() {
        let err = TargetSpec::load(Path::new("/nonexistent/target.json")).unwrap_err();
        assert!(matches!(err, Error::TargetRead { .. }));
    }
}
