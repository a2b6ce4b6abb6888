//! Exchange adapter error types.

/// Errors that can occur during exchange operations.
///
/// A `place_*_order` call returning one of these (rather than panicking or
/// propagating a lower-level exception) is what the executors treat as
/// "retryable" -- see the error-handling design's transient-exchange-error
/// category.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("not connected")]
    NotConnected,

    #[error("unknown pair: {0}")]
    InvalidPair(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("order not found")]
    NotFound,

    #[error("{0}")]
    Other(String),
}
