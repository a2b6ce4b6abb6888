//! Binance spot exchange adapter.
//!
//! Uses the REST API for all operations. Blocking (sync) via
//! `reqwest::blocking`, matching the single-threaded cooperative scheduling
//! model the rebalancer runs under.

pub mod auth;
pub mod client;
pub mod types;

use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};

use rebalance_core::market::{Asset, Direction, OrderBook, Pair, PairRules};
use rebalance_core::order::Order;

use crate::error::ExchangeError;
use crate::types::{ExecutionResponse, OrderHandle, OrderState, OrderStatus};
use crate::Exchange;
use client::BinanceClient;
use types::SymbolFilter;

/// Default taker/maker fees used when no signed fee-tier lookup is wired up.
/// Per the adapter contract's documented defaults: taker 0.001-0.003, maker
/// 0-0.001; these pick the low end of each range.
const DEFAULT_TAKER_FEE: Decimal = Decimal::new(1, 3);
const DEFAULT_MAKER_FEE: Decimal = Decimal::ZERO;

/// Binance spot exchange implementing the generic `Exchange` trait.
pub struct BinanceExchange {
    client: BinanceClient,
    through_trade_currencies: FxHashSet<Asset>,
}

impl BinanceExchange {
    /// Create a new Binance exchange handle.
    pub fn new(api_key: &str, secret_key: &str, testnet: bool) -> Self {
        Self {
            client: BinanceClient::new(api_key, secret_key, testnet),
            through_trade_currencies: ["BTC", "BNB", "ETH", "USDT"]
                .into_iter()
                .map(Asset::new)
                .collect(),
        }
    }

    /// Binance's native symbol string: `baseAsset + quoteAsset` with no
    /// separator (e.g. `BTCUSDT`). Per the resolved commodity/base mapping,
    /// `pair.commodity == baseAsset` and `pair.base == quoteAsset`.
    fn symbol_of(pair: &Pair) -> String {
        format!("{}{}", pair.commodity, pair.base)
    }

    fn pair_rules_from_filters(filters: &[SymbolFilter]) -> Option<PairRules> {
        let mut min_size = None;
        let mut max_size = None;
        let mut size_step = None;
        let mut min_price = None;
        let mut max_price = None;
        let mut price_step = None;
        let mut min_notional = Decimal::ZERO;

        for filter in filters {
            match filter {
                SymbolFilter::LOT_SIZE {
                    min_qty,
                    max_qty,
                    step_size,
                } => {
                    min_size = Some(*min_qty);
                    max_size = Some(*max_qty);
                    size_step = Some(*step_size);
                }
                SymbolFilter::PRICE_FILTER {
                    min_price: lo,
                    max_price: hi,
                    tick_size,
                } => {
                    min_price = Some(*lo);
                    max_price = Some(*hi);
                    price_step = Some(*tick_size);
                }
                SymbolFilter::NOTIONAL { min_notional: n } => min_notional = *n,
                SymbolFilter::Other => {}
            }
        }

        Some(PairRules {
            min_size: min_size?,
            max_size: max_size?,
            size_step: size_step?,
            price_step: price_step?,
            min_notional,
            min_price: min_price?,
            max_price: max_price?,
        })
    }

    fn parse_handle(handle: &OrderHandle) -> Result<u64, ExchangeError> {
        handle
            .exchange_order_id
            .parse()
            .map_err(|_| ExchangeError::Order(format!("bad order id {}", handle.exchange_order_id)))
    }

    fn order_state_of(status: &str) -> OrderState {
        match status {
            "NEW" => OrderState::New,
            "PARTIALLY_FILLED" => OrderState::PartiallyFilled,
            "FILLED" => OrderState::Filled,
            "CANCELED" | "EXPIRED" => OrderState::Cancelled,
            "REJECTED" => OrderState::Rejected,
            _ => OrderState::New,
        }
    }
}

impl Exchange for BinanceExchange {
    fn get_balances(&self) -> Result<FxHashMap<Asset, Decimal>, ExchangeError> {
        let info = self.client.account_info()?;
        Ok(info
            .balances
            .into_iter()
            .filter(|b| b.free > Decimal::ZERO)
            .map(|b| (Asset::new(b.asset), b.free))
            .collect())
    }

    fn get_orderbooks(&self, pairs: &[Pair]) -> Result<Vec<OrderBook>, ExchangeError> {
        Ok(pairs
            .iter()
            .filter_map(|pair| {
                self.client
                    .book_ticker(&Self::symbol_of(pair))
                    .ok()
                    .map(|t| OrderBook::new(pair.clone(), t.bid_price, t.ask_price))
            })
            .collect())
    }

    fn get_pair_rules(&self) -> Result<FxHashMap<Pair, PairRules>, ExchangeError> {
        let info = self.client.exchange_info()?;
        Ok(info
            .symbols
            .into_iter()
            .filter_map(|s| {
                let rules = Self::pair_rules_from_filters(&s.filters)?;
                let pair = Pair::new(s.base_asset, s.quote_asset);
                Some((pair, rules))
            })
            .collect())
    }

    fn get_taker_fee(&self, _pair: &Pair) -> Result<Decimal, ExchangeError> {
        Ok(DEFAULT_TAKER_FEE)
    }

    fn get_maker_fee(&self, _pair: &Pair) -> Result<Decimal, ExchangeError> {
        Ok(DEFAULT_MAKER_FEE)
    }

    fn place_market_order(
        &self,
        order: &Order,
        price_estimates: &FxHashMap<Asset, Decimal>,
    ) -> Result<ExecutionResponse, ExchangeError> {
        let symbol = Self::symbol_of(&order.pair);
        let side = match order.direction {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        };
        let quantity = order.quantity.to_string();

        let resp = self
            .client
            .submit_order(&symbol, side, "MARKET", &quantity, None, None)?;

        let mut commissions: FxHashMap<Asset, Decimal> = FxHashMap::default();
        let mut weighted_sum = Decimal::ZERO;
        let mut filled_qty = Decimal::ZERO;
        for fill in &resp.fills {
            weighted_sum += fill.price * fill.qty;
            filled_qty += fill.qty;
            *commissions
                .entry(Asset::new(fill.commission_asset.clone()))
                .or_insert(Decimal::ZERO) += fill.commission;
        }
        let mean_price = if filled_qty > Decimal::ZERO {
            Some(weighted_sum / filled_qty)
        } else {
            None
        };
        let mid_market_price = mean_price
            .or_else(|| price_estimates.get(&order.pair.commodity).copied())
            .unwrap_or(Decimal::ZERO);

        Ok(ExecutionResponse {
            handle: OrderHandle::new(order.pair.clone(), resp.order_id.to_string()),
            side: order.direction,
            pair: order.pair.clone(),
            orig_quantity: resp.orig_qty,
            executed_quantity: resp.executed_qty,
            mean_price,
            commissions,
            mid_market_price,
        })
    }

    fn place_limit_order(&self, order: &Order) -> Result<ExecutionResponse, ExchangeError> {
        let price = order
            .price
            .ok_or_else(|| ExchangeError::Order("limit order missing price".into()))?;
        let symbol = Self::symbol_of(&order.pair);
        let side = match order.direction {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        };
        let quantity = order.quantity.to_string();
        let price_str = price.to_string();

        // LIMIT_MAKER: rejected outright if it would cross the book
        // immediately, matching the "limit-maker" semantics.
        let resp = self.client.submit_order(
            &symbol,
            side,
            "LIMIT_MAKER",
            &quantity,
            Some(&price_str),
            None,
        )?;

        let mut commissions: FxHashMap<Asset, Decimal> = FxHashMap::default();
        for fill in &resp.fills {
            *commissions
                .entry(Asset::new(fill.commission_asset.clone()))
                .or_insert(Decimal::ZERO) += fill.commission;
        }

        Ok(ExecutionResponse {
            handle: OrderHandle::new(order.pair.clone(), resp.order_id.to_string()),
            side: order.direction,
            pair: order.pair.clone(),
            orig_quantity: resp.orig_qty,
            executed_quantity: resp.executed_qty,
            mean_price: if resp.executed_qty > Decimal::ZERO {
                Some(price)
            } else {
                None
            },
            commissions,
            mid_market_price: price,
        })
    }

    fn cancel_order(&self, handle: &OrderHandle) -> Result<(), ExchangeError> {
        let id = Self::parse_handle(handle)?;
        match self.client.cancel_order(&Self::symbol_of(&handle.pair), id) {
            Ok(()) => Ok(()),
            Err(ExchangeError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn get_order(&self, handle: &OrderHandle) -> Result<OrderStatus, ExchangeError> {
        let id = Self::parse_handle(handle)?;
        let resp = self
            .client
            .order_status(&Self::symbol_of(&handle.pair), id)?;
        Ok(OrderStatus {
            handle: handle.clone(),
            state: Self::order_state_of(&resp.status),
            orig_quantity: resp.orig_qty,
            executed_quantity: resp.executed_qty,
        })
    }

    fn through_trade_currencies(&self) -> FxHashSet<Asset> {
        self.through_trade_currencies.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_of_concatenates_commodity_then_base() {
        let pair = Pair::new("BTC", "USDT");
        assert_eq!(BinanceExchange::symbol_of(&pair), "BTCUSDT");
    }

    #[test]
    fn order_state_maps_known_statuses() {
        assert_eq!(BinanceExchange::order_state_of("NEW"), OrderState::New);
        assert_eq!(
            BinanceExchange::order_state_of("PARTIALLY_FILLED"),
            OrderState::PartiallyFilled
        );
        assert_eq!(BinanceExchange::order_state_of("FILLED"), OrderState::Filled);
        assert_eq!(
            BinanceExchange::order_state_of("CANCELED"),
            OrderState::Cancelled
        );
        assert_eq!(
            BinanceExchange::order_state_of("REJECTED"),
            OrderState::Rejected
        );
    }

    #[test]
    fn pair_rules_from_filters_requires_lot_size_and_price_filter() {
        let filters = vec![SymbolFilter::NOTIONAL {
            min_notional: rust_decimal_macros::dec!(10),
        }];
        assert!(BinanceExchange::pair_rules_from_filters(&filters).is_none());
    }

    #[test]
    fn pair_rules_from_filters_parses_a_complete_set() {
        use rust_decimal_macros::dec;
        let filters = vec![
            SymbolFilter::LOT_SIZE {
                min_qty: dec!(0.001),
                max_qty: dec!(10000),
                step_size: dec!(0.00000001),
            },
            SymbolFilter::PRICE_FILTER {
                min_price: dec!(0.01),
                max_price: dec!(1000000),
                tick_size: dec!(0.01),
            },
            SymbolFilter::NOTIONAL {
                min_notional: dec!(10),
            },
        ];
        let rules = BinanceExchange::pair_rules_from_filters(&filters).unwrap();
        assert_eq!(rules.min_size, dec!(0.001));
        assert_eq!(rules.min_notional, dec!(10));
    }
}
