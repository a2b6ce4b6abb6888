//! Error types for the rebalancer binary and orchestration layer.

use std::path::PathBuf;

use rebalance_core::CoreError;

/// All errors that can occur at the orchestration layer.
///
/// Per-order validator rejections and transient exchange errors are *not*
/// represented here -- those are values (`Option<Order>` / a retry-classified
/// `ExecutionResponse`), not `Err`s, matching the rule that a single bad order
/// never aborts a batch.
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

    #[error("target error: {0}")]
    Target(String),

    #[error("failed to read target file {path}: {source}")]
    TargetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse target: {0}")]
    TargetParse(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Exchange(#[from] rebalance_exchange::ExchangeError),

    #[error("{0}")]
    TooManyOrders(String),

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
