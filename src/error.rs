//! Error types for the rebalance core.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::market::{Asset, Pair};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by `rebalance-core`.
///
/// Validator rejections and transient exchange errors are *not* represented
/// here: the validator returns `Option<Order>` and the executors classify
/// exchange responses themselves, per the error taxonomy in the spec's
/// error-handling design (a single bad order never aborts a batch).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("quantization step must be positive, got {0}")]
    InvalidStep(Decimal),

    #[error("order book for {0} has no known {1}")]
    MissingWall(Pair, &'static str),

    #[error("no price estimate reachable for asset {0}")]
    UnreachableAsset(Asset),

    #[error("portfolio value is zero, cannot compute weights")]
    ZeroPortfolioValue,

    #[error("weights sum to {0}, which exceeds 1")]
    WeightsExceedOne(Decimal),

    #[error("rebalance plan is infeasible: {0}")]
    InfeasiblePlan(String),

    #[error("limit order requires a price, market order must not have one")]
    MalformedOrder,

    #[error("no tradeable pair found between {0} and {1}")]
    NoPairFound(Asset, Asset),
}
