//! Error types for the rebalancer.

use std::path::PathBuf;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("target file error: {0}")]
    Target(String),

    #[error("failed to read target file {path}: {source}")]
    TargetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse target JSON: {0}")]
    TargetParse(#[from] serde_json::Error),

    #[error("price history error: {0}")]
    History(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("exchange error: {0}")]
    Exchange(#[from] thbfolio_broker::BrokerError),

    #[error(transparent)]
    Core(#[from] thbfolio::Error),

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<thbfolio::ConfigError> for Error {
    fn from(e: thbfolio::ConfigError) -> Self {
        Error::Core(thbfolio::Error::Config(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
