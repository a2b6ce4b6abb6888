//! rebalancer: CLI and orchestration for crypto portfolio rebalancing.
//!
//! Ties `rebalance-core`'s price estimator, planner, materializer, and
//! validator to a concrete exchange adapter: TOML configuration, target
//! weight loading with padding completion, market and limit order
//! execution, and a JSONL audit trail.

pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod limit_executor;
pub mod market_executor;
pub mod target;
