//! Mock exchange for testing -- implements the `Exchange` trait with
//! configurable behavior.
//!
//! Use this in integration tests to simulate exchange responses without
//! network calls.
//!
//! ```
//! use rebalance_core::market::{Asset, Pair};
//! use rebalance_exchange::mock::{FillMode, MockExchange};
//!
//! let exchange = MockExchange::builder()
//!     .fill_mode(FillMode::ImmediateFull)
//!     .with_balance(Asset::new("BTC"), rust_decimal_macros::dec!(1))
//!     .build();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};

use rebalance_core::market::{Asset, Direction, OrderBook, Pair, PairRules};
use rebalance_core::order::Order;

use crate::error::ExchangeError;
use crate::types::{ExecutionResponse, OrderHandle, OrderState, OrderStatus};
use crate::Exchange;

/// How the mock exchange handles submitted orders.
#[derive(Clone, Debug)]
pub enum FillMode {
    /// Orders are immediately fully filled at the order's price (or the
    /// book's mid for market orders).
    ImmediateFull,
    /// Orders are partially filled by the given fraction (e.g. `0.5` = 50%).
    ImmediatePartial(Decimal),
    /// All orders are rejected.
    Reject,
}

/// A recorded order submission, for assertion in tests.
#[derive(Clone, Debug)]
pub struct RecordedOrder {
    pub pair: Pair,
    pub direction: Direction,
    pub quantity: Decimal,
    pub is_limit: bool,
}

/// Builder for `MockExchange`.
pub struct MockExchangeBuilder {
    fill_mode: FillMode,
    balances: FxHashMap<Asset, Decimal>,
    orderbooks: FxHashMap<Pair, OrderBook>,
    pair_rules: FxHashMap<Pair, PairRules>,
    taker_fee: Decimal,
    maker_fee: Decimal,
    through_trade_currencies: FxHashSet<Asset>,
}

impl MockExchangeBuilder {
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_balance(mut self, asset: Asset, amount: Decimal) -> Self {
        self.balances.insert(asset, amount);
        self
    }

    pub fn with_orderbook(mut self, ob: OrderBook) -> Self {
        self.orderbooks.insert(ob.pair.clone(), ob);
        self
    }

    pub fn with_pair_rules(mut self, pair: Pair, rules: PairRules) -> Self {
        self.pair_rules.insert(pair, rules);
        self
    }

    pub fn with_fees(mut self, taker: Decimal, maker: Decimal) -> Self {
        self.taker_fee = taker;
        self.maker_fee = maker;
        self
    }

    pub fn with_through_trade_currency(mut self, asset: Asset) -> Self {
        self.through_trade_currencies.insert(asset);
        self
    }

    pub fn build(self) -> MockExchange {
        MockExchange {
            fill_mode: self.fill_mode,
            balances: self.balances,
            orderbooks: self.orderbooks,
            pair_rules: self.pair_rules,
            taker_fee: self.taker_fee,
            maker_fee: self.maker_fee,
            through_trade_currencies: self.through_trade_currencies,
            next_order_id: AtomicU64::new(1),
            submitted_orders: Mutex::new(Vec::new()),
            open_orders: Mutex::new(FxHashMap::default()),
        }
    }
}

/// An exchange fixture that records submitted orders and returns
/// configurable fills, without any network activity.
pub struct MockExchange {
    fill_mode: FillMode,
    balances: FxHashMap<Asset, Decimal>,
    orderbooks: FxHashMap<Pair, OrderBook>,
    pair_rules: FxHashMap<Pair, PairRules>,
    taker_fee: Decimal,
    maker_fee: Decimal,
    through_trade_currencies: FxHashSet<Asset>,
    next_order_id: AtomicU64,
    submitted_orders: Mutex<Vec<RecordedOrder>>,
    open_orders: Mutex<FxHashMap<String, OrderStatus>>,
}

impl MockExchange {
    pub fn builder() -> MockExchangeBuilder {
        MockExchangeBuilder {
            fill_mode: FillMode::ImmediateFull,
            balances: FxHashMap::default(),
            orderbooks: FxHashMap::default(),
            pair_rules: FxHashMap::default(),
            taker_fee: Decimal::new(1, 3),
            maker_fee: Decimal::ZERO,
            through_trade_currencies: FxHashSet::default(),
            next_order_id: AtomicU64::new(1),
            submitted_orders: Mutex::new(Vec::new()),
            open_orders: Mutex::new(FxHashMap::default()),
        }
    }

    /// Orders submitted so far, for assertion in tests.
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        self.submitted_orders.lock().unwrap().clone()
    }

    fn reference_price(&self, pair: &Pair, order_price: Option<Decimal>) -> Option<Decimal> {
        if let Some(p) = order_price {
            return Some(p);
        }
        self.orderbooks.get(pair).and_then(|ob| ob.mid().ok())
    }

    fn submit(&self, order: &Order) -> Result<ExecutionResponse, ExchangeError> {
        self.submitted_orders.lock().unwrap().push(RecordedOrder {
            pair: order.pair.clone(),
            direction: order.direction,
            quantity: order.quantity,
            is_limit: order.price.is_some(),
        });

        if matches!(self.fill_mode, FillMode::Reject) {
            return Err(ExchangeError::Order("mock: order rejected".into()));
        }

        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        let handle = OrderHandle::new(order.pair.clone(), id.to_string());

        let fraction = match &self.fill_mode {
            FillMode::ImmediateFull => Decimal::ONE,
            FillMode::ImmediatePartial(f) => *f,
            FillMode::Reject => unreachable!("handled above"),
        };
        let executed_quantity = order.quantity * fraction;
        let mean_price = self.reference_price(&order.pair, order.price);
        let mid_market_price = mean_price.unwrap_or(Decimal::ZERO);

        let status = OrderStatus {
            handle: handle.clone(),
            state: if fraction >= Decimal::ONE {
                OrderState::Filled
            } else if fraction > Decimal::ZERO {
                OrderState::PartiallyFilled
            } else {
                OrderState::New
            },
            orig_quantity: order.quantity,
            executed_quantity,
        };
        self.open_orders
            .lock()
            .unwrap()
            .insert(handle.exchange_order_id.clone(), status);

        Ok(ExecutionResponse {
            handle,
            side: order.direction,
            pair: order.pair.clone(),
            orig_quantity: order.quantity,
            executed_quantity,
            mean_price: if executed_quantity > Decimal::ZERO {
                mean_price
            } else {
                None
            },
            commissions: FxHashMap::default(),
            mid_market_price,
        })
    }
}

impl Exchange for MockExchange {
    fn get_balances(&self) -> Result<FxHashMap<Asset, Decimal>, ExchangeError> {
        Ok(self.balances.clone())
    }

    fn get_orderbooks(&self, pairs: &[Pair]) -> Result<Vec<OrderBook>, ExchangeError> {
        Ok(pairs
            .iter()
            .filter_map(|p| self.orderbooks.get(p).cloned())
            .collect())
    }

    fn get_pair_rules(&self) -> Result<FxHashMap<Pair, PairRules>, ExchangeError> {
        Ok(self.pair_rules.clone())
    }

    fn get_taker_fee(&self, _pair: &Pair) -> Result<Decimal, ExchangeError> {
        Ok(self.taker_fee)
    }

    fn get_maker_fee(&self, _pair: &Pair) -> Result<Decimal, ExchangeError> {
        Ok(self.maker_fee)
    }

    fn place_market_order(
        &self,
        order: &Order,
        price_estimates: &FxHashMap<Asset, Decimal>,
    ) -> Result<ExecutionResponse, ExchangeError> {
        let mut response = self.submit(order)?;
        if response.mean_price.is_none() {
            response.mean_price = price_estimates.get(&order.pair.commodity).copied();
        }
        Ok(response)
    }

    fn place_limit_order(&self, order: &Order) -> Result<ExecutionResponse, ExchangeError> {
        if order.price.is_none() {
            return Err(ExchangeError::Order("limit order missing price".into()));
        }
        self.submit(order)
    }

    fn cancel_order(&self, handle: &OrderHandle) -> Result<(), ExchangeError> {
        // Cancelling an already-gone order is treated as success.
        self.open_orders
            .lock()
            .unwrap()
            .remove(&handle.exchange_order_id);
        Ok(())
    }

    fn get_order(&self, handle: &OrderHandle) -> Result<OrderStatus, ExchangeError> {
        self.open_orders
            .lock()
            .unwrap()
            .get(&handle.exchange_order_id)
            .cloned()
            .ok_or(ExchangeError::NotFound)
    }

    fn through_trade_currencies(&self) -> FxHashSet<Asset> {
        self.through_trade_currencies.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebalance_core::order::OrderType;
    use rust_decimal_macros::dec;

    fn btc_usdt() -> Pair {
        Pair::new("BTC", "USDT")
    }

    #[test]
    fn builder_basic() {
        let exchange = MockExchange::builder()
            .with_balance(Asset::new("BTC"), dec!(1))
            .with_orderbook(OrderBook::new(btc_usdt(), dec!(9999), dec!(10001)))
            .build();

        let balances = exchange.get_balances().unwrap();
        assert_eq!(balances[&Asset::new("BTC")], dec!(1));

        let books = exchange.get_orderbooks(&[btc_usdt()]).unwrap();
        assert_eq!(books.len(), 1);
    }

    #[test]
    fn immediate_full_fill_records_and_fills() {
        let exchange = MockExchange::builder()
            .with_orderbook(OrderBook::new(btc_usdt(), dec!(10000), dec!(10000)))
            .build();
        let order = Order::new(btc_usdt(), OrderType::Market, Direction::Sell, dec!(1), None).unwrap();
        let resp = exchange
            .place_market_order(&order, &FxHashMap::default())
            .unwrap();
        assert_eq!(resp.executed_quantity, dec!(1));
        assert_eq!(exchange.submitted_orders().len(), 1);

        let status = exchange.get_order(&resp.handle).unwrap();
        assert_eq!(status.state, OrderState::Filled);
        assert_eq!(status.remaining(), Decimal::ZERO);
    }

    #[test]
    fn partial_fill_status() {
        let exchange = MockExchange::builder()
            .fill_mode(FillMode::ImmediatePartial(dec!(0.5)))
            .with_orderbook(OrderBook::new(btc_usdt(), dec!(10000), dec!(10000)))
            .build();
        let order = Order::new(btc_usdt(), OrderType::Market, Direction::Sell, dec!(1), None).unwrap();
        let resp = exchange
            .place_market_order(&order, &FxHashMap::default())
            .unwrap();
        assert_eq!(resp.executed_quantity, dec!(0.5));
        let status = exchange.get_order(&resp.handle).unwrap();
        assert_eq!(status.state, OrderState::PartiallyFilled);
        assert_eq!(status.remaining(), dec!(0.5));
    }

    #[test]
    fn reject_mode_errors() {
        let exchange = MockExchange::builder().fill_mode(FillMode::Reject).build();
        let order = Order::new(btc_usdt(), OrderType::Market, Direction::Buy, dec!(1), None).unwrap();
        assert!(exchange
            .place_market_order(&order, &FxHashMap::default())
            .is_err());
    }

    #[test]
    fn cancel_of_unknown_order_succeeds() {
        let exchange = MockExchange::builder().build();
        let handle = OrderHandle::new(btc_usdt(), "nonexistent");
        assert!(exchange.cancel_order(&handle).is_ok());
    }

    #[test]
    fn get_order_of_unknown_handle_errors() {
        let exchange = MockExchange::builder().build();
        let handle = OrderHandle::new(btc_usdt(), "nonexistent");
        assert!(exchange.get_order(&handle).is_err());
    }
}
