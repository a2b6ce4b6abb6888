//! Market executor (C8): submits a topologically-sorted sequence of market
//! orders, retrying transient exchange errors up to a fixed attempt budget
//! per order.

use log::warn;
use rustc_hash::FxHashMap;

use rebalance_core::market::{Asset, Pair, PairRules};
use rebalance_core::order::Order;
use rebalance_core::validator::validate;
use rebalance_exchange::{Exchange, ExecutionResponse};
use rust_decimal::Decimal;

/// Attempts per order before giving up and moving on.
const MAX_ATTEMPTS: usize = 10;

/// Submits `orders` (assumed already topologically sorted so that an order
/// producing an asset runs before any order consuming it) one at a time.
///
/// Each order is re-validated against `pair_rules` and the exchange's
/// current balances (C7) immediately before submission -- balances shift as
/// earlier orders in the topologically-sorted batch fill, so the check is
/// re-run, not cached, for every order. An order the validator rejects
/// outright is dropped without ever reaching `place_market_order`.
///
/// Any non-error response from `place_market_order` is accepted on the
/// first attempt that returns one -- the executor does not inspect fill
/// completeness. An order that fails on all `MAX_ATTEMPTS` tries is logged
/// and skipped; it never aborts the remaining batch.
pub fn execute_market_orders(
    exchange: &dyn Exchange,
    orders: Vec<Order>,
    pair_rules: &FxHashMap<Pair, PairRules>,
    price_estimates: &FxHashMap<Asset, Decimal>,
) -> Vec<ExecutionResponse> {
    let mut responses = Vec::with_capacity(orders.len());

    for order in orders {
        let Some(rules) = pair_rules.get(&order.pair) else {
            warn!("no exchange rules for {}, skipping order", order.pair);
            continue;
        };
        let balances = match exchange.get_balances() {
            Ok(b) => b,
            Err(e) => {
                warn!("failed to fetch balances before validating {}: {e}", order.pair);
                continue;
            }
        };
        let Some(validated) = validate(&order, rules, &balances, price_estimates) else {
            warn!("order on {} rejected by the exchange rule validator", order.pair);
            continue;
        };

        let mut placed = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match exchange.place_market_order(&validated, price_estimates) {
                Ok(resp) => {
                    placed = Some(resp);
                    break;
                }
                Err(e) => {
                    warn!(
                        "market order on {} attempt {attempt}/{MAX_ATTEMPTS} failed: {e}",
                        validated.pair
                    );
                }
            }
        }
        match placed {
            Some(resp) => responses.push(resp),
            None => warn!(
                "market order on {} skipped after {MAX_ATTEMPTS} failed attempts",
                validated.pair
            ),
        }
    }

    responses
}
