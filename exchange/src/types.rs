//! Shared exchange adapter types: order handles, execution responses, and
//! order lifecycle state.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use rebalance_core::market::{Asset, Direction, Pair};

/// Identifies a previously-placed order for `cancel_order`/`get_order`.
/// Exchanges key orders by pair plus their own order id (or a client id),
/// per the adapter contract.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderHandle {
    pub pair: Pair,
    pub exchange_order_id: String,
}

impl OrderHandle {
    pub fn new(pair: Pair, exchange_order_id: impl Into<String>) -> Self {
        Self {
            pair,
            exchange_order_id: exchange_order_id.into(),
        }
    }
}

/// Normalized response to an order submission (market or limit): "responses
/// are normalized into a record containing order_id, executed_quantity,
/// mean_price, per-asset aggregated commission, side, and the original
/// pair/estimates".
#[derive(Clone, Debug)]
pub struct ExecutionResponse {
    pub handle: OrderHandle,
    pub side: Direction,
    pub pair: Pair,
    pub orig_quantity: Decimal,
    pub executed_quantity: Decimal,
    /// `Σ(fill.qty * fill.price) / Σ fill.qty`; `None` if nothing filled.
    pub mean_price: Option<Decimal>,
    /// Commission paid, aggregated per asset -- a single order can pay
    /// commission in more than one asset (e.g. a discount-token fee).
    pub commissions: FxHashMap<Asset, Decimal>,
    /// Mid-market price at submission time, stapled on for statistics.
    pub mid_market_price: Decimal,
}

/// Lifecycle state of a previously-submitted order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderState {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// Current status of a previously-submitted order, per `get_order`.
#[derive(Clone, Debug)]
pub struct OrderStatus {
    pub handle: OrderHandle,
    pub state: OrderState,
    pub orig_quantity: Decimal,
    pub executed_quantity: Decimal,
}

impl OrderStatus {
    /// `orig_qty - executed_qty` -- the residual used by the limit executor
    /// to decide whether an order partially filled.
    pub fn remaining(&self) -> Decimal {
        self.orig_quantity - self.executed_quantity
    }
}
