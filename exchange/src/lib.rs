//! Exchange trait and implementations for the rebalancer.
//!
//! Provides a generic `Exchange` trait that abstracts over different trading
//! venues. Implementations:
//!
//! - **Mock** (always available): in-memory fixture for tests.
//! - **Binance** (feature `binance`): Binance spot REST API.

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "binance")]
pub mod binance;

pub use error::ExchangeError;
pub use types::*;

use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};

use rebalance_core::market::{Asset, OrderBook, Pair, PairRules};
use rebalance_core::order::Order;

/// A connection to a trading venue that can fetch balances, order books, and
/// trading rules, and submit/cancel/query orders.
///
/// `place_market_order`/`place_limit_order` return the error object rather
/// than panicking: per the adapter contract, that is what signals
/// "retryable" to the executors.
pub trait Exchange {
    /// Non-zero free balances, keyed by asset.
    fn get_balances(&self) -> Result<FxHashMap<Asset, Decimal>, ExchangeError>;

    /// Top-of-book snapshots for `pairs`. Best-effort: pairs unknown to the
    /// exchange are silently filtered rather than erroring the whole call.
    fn get_orderbooks(&self, pairs: &[Pair]) -> Result<Vec<OrderBook>, ExchangeError>;

    /// Trading rules (size/price steps, min notional, etc.) for every pair
    /// the exchange lists.
    fn get_pair_rules(&self) -> Result<FxHashMap<Pair, PairRules>, ExchangeError>;

    fn get_taker_fee(&self, pair: &Pair) -> Result<Decimal, ExchangeError>;
    fn get_maker_fee(&self, pair: &Pair) -> Result<Decimal, ExchangeError>;

    /// Submits a market order. `price_estimates` lets the adapter staple a
    /// mid-market price onto the response even when the exchange's own fill
    /// report omits one.
    fn place_market_order(
        &self,
        order: &Order,
        price_estimates: &FxHashMap<Asset, Decimal>,
    ) -> Result<ExecutionResponse, ExchangeError>;

    /// Submits a limit order. The order's `price` must be `Some`.
    fn place_limit_order(&self, order: &Order) -> Result<ExecutionResponse, ExchangeError>;

    /// Cancels a previously-placed order. Cancelling an already-gone order
    /// is treated as success by callers, per the error-handling design.
    fn cancel_order(&self, handle: &OrderHandle) -> Result<(), ExchangeError>;

    /// Fetches the current state of a previously-placed order.
    fn get_order(&self, handle: &OrderHandle) -> Result<OrderStatus, ExchangeError>;

    /// Assets that should always be included when enumerating candidate
    /// pairs for routing (typically `{BTC, BNB, ETH, USDT}` for Binance).
    fn through_trade_currencies(&self) -> FxHashSet<Asset>;
}
