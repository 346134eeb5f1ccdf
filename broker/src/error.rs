//! Exchange error types.

/// Errors that can occur during exchange operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("connection error: {0}")]
    Connection(String),

    /// The venue answered, but with a non-zero error code.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}
