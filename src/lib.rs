//! # rebalance-core
//!
//! Price estimation, min-cost-flow planning, order materialization, and
//! exchange-rule validation for a cryptocurrency portfolio rebalancer.
//!
//! This crate is the stateless core described by the rebalancer's design: it
//! takes balances, order books, and a target weight vector, and produces a
//! sequence of validated, concrete orders. It knows nothing about how those
//! orders get submitted to an exchange or retried -- see `rebalance-exchange`
//! for the adapter contract and `rebalancer` for the market/limit executors.
//!
//! ## Pipeline
//!
//! ```text
//! balances + orderbooks
//!   -> price_estimates          (estimator)
//!   -> weights, portfolio_value (weights)
//!   -> plan                     (planner: min-cost flow -> AbstractTransfer)
//!   -> parse_order               (materializer: AbstractTransfer -> Order)
//!   -> topological_sort          (materializer: market-mode ordering)
//!   -> validate                  (validator: clip/quantize against exchange rules)
//! ```
//!
//! ## Quick start
//!
//! ```
//! use rust_decimal_macros::dec;
//! use rustc_hash::FxHashMap;
//! use rebalance_core::market::{Asset, OrderBook, Pair};
//! use rebalance_core::{estimator, weights as weights_mod};
//!
//! let books = vec![OrderBook::new(Pair::new("BTC", "USDT"), dec!(10000), dec!(10000))];
//! let base = Asset::new("USDT");
//! let prices = estimator::price_estimates(&books, &base).unwrap();
//!
//! let balances = FxHashMap::from_iter([(Asset::new("BTC"), dec!(1))]);
//! let portfolio_weights = weights_mod::weights(&balances, &prices).unwrap();
//! assert_eq!(portfolio_weights[&Asset::new("BTC")], dec!(1));
//! ```

pub mod decimal;
pub mod error;
pub mod estimator;
pub mod market;
pub mod materializer;
pub mod order;
pub mod planner;
pub mod validator;
pub mod weights;

pub use decimal::quantize;
pub use error::{CoreError, Result};
pub use market::{Asset, Direction, OrderBook, Pair, PairRules};
pub use materializer::{parse_order, topological_sort};
pub use order::{Order, OrderType};
pub use planner::{plan, AbstractTransfer, DEFAULT_PRECISION};
pub use validator::validate;
