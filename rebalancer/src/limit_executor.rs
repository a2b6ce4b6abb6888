//! Limit executor (C9): places post-only limit orders in rounds, cancelling
//! and re-pricing unfilled remainders until every pair either fills or
//! exhausts its retry budget.

use std::time::Duration;

use log::{info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use rebalance_core::market::{Asset, Direction, Pair, PairRules};
use rebalance_core::order::Order;
use rebalance_core::validator::validate;
use rust_decimal::Decimal;

use rebalance_exchange::{Exchange, ExecutionResponse};

/// Threshold below which a cancelled order's remainder is treated as "fully
/// filled" rather than a partial fill worth re-submitting.
const DUST_THRESHOLD: Decimal = Decimal::new(1, 3); // 1e-3

/// Configuration for the round loop.
#[derive(Clone, Copy, Debug)]
pub struct LimitExecutorConfig {
    /// Seconds to let each round's resting orders sit before cancelling.
    pub time_delta_secs: u64,
    /// Retries allowed per pending order before it is dropped.
    pub max_retries: usize,
}

/// Reported between rounds: an estimate of how long the remaining orders
/// will take to settle, in milliseconds.
#[derive(Clone, Copy, Debug)]
pub struct RoundProgress {
    pub remaining_ms: u64,
}

struct PendingOrder {
    order: Order,
    retries: usize,
}

/// Runs the limit-order round loop to completion (or exhaustion) and
/// returns every `ExecutionResponse` observed across all rounds.
///
/// `sleep` is injected so tests can run the loop without real delays.
pub fn execute_limit_orders(
    exchange: &dyn Exchange,
    orders: Vec<Order>,
    config: &LimitExecutorConfig,
    mut progress: impl FnMut(RoundProgress),
    sleep: impl Fn(Duration),
) -> Vec<ExecutionResponse> {
    let pair_rules = exchange.get_pair_rules().unwrap_or_default();

    let mut pending: Vec<PendingOrder> = orders
        .into_iter()
        .map(|order| PendingOrder { order, retries: 0 })
        .collect();
    let mut responses = Vec::new();

    let n = pending.len();
    if n == 0 {
        return responses;
    }
    // Bounds totality: the testable property is "at most N*(max_retries+1)
    // rounds" -- the feasibility gate below can stall a round without
    // incrementing any retry counter, so an unconditional `while !pending
    // .is_empty()` could spin forever if an orderbook never arrives for a
    // stuck pair.
    let max_rounds = n.saturating_mul(config.max_retries + 1).max(1);

    for round in 0..max_rounds {
        if pending.is_empty() {
            break;
        }

        let pairs: Vec<Pair> = pending.iter().map(|p| p.order.pair.clone()).collect();
        let books = exchange.get_orderbooks(&pairs).unwrap_or_default();
        let mids: FxHashMap<Pair, Decimal> = books
            .iter()
            .filter_map(|b| b.mid().ok().map(|m| (b.pair.clone(), m)))
            .collect();
        let balances = exchange.get_balances().unwrap_or_default();

        let consumed: FxHashSet<Asset> = pending.iter().map(|p| consumed_asset(&p.order)).collect();
        let produced: FxHashSet<Asset> = pending.iter().map(|p| produced_asset(&p.order)).collect();
        let free: FxHashSet<Asset> = consumed.difference(&produced).cloned().collect();

        let mut round_placed: Vec<(usize, ExecutionResponse)> = Vec::new();

        for (i, pending_order) in pending.iter_mut().enumerate() {
            let Some(mid) = mids.get(&pending_order.order.pair).copied() else {
                continue;
            };
            pending_order.order.price = Some(mid);

            let rules = match pair_rules.get(&pending_order.order.pair) {
                Some(r) => r,
                None => continue,
            };
            // Limit orders always carry a price, so the validator's
            // commodity/base price fallback is never consulted here.
            let Some(validated) = validate(
                &pending_order.order,
                rules,
                &balances,
                &FxHashMap::default(),
            ) else {
                // Filter rejection: this order can never be satisfied at the
                // current price/rules. Drop it.
                pending_order.retries = usize::MAX;
                continue;
            };

            if !order_is_resource_feasible(&validated, rules, &balances, &free, mid) {
                continue;
            }

            match exchange.place_limit_order(&validated) {
                Ok(resp) => {
                    pending_order.order = validated;
                    round_placed.push((i, resp));
                }
                Err(e) => {
                    warn!("limit order on {} rejected: {e}", pending_order.order.pair);
                    pending_order.retries += 1;
                }
            }
        }

        let estimate = mean_remaining_ms(&pending, config);
        progress(RoundProgress {
            remaining_ms: estimate,
        });
        info!(
            "limit executor round {round}: {} orders placed, {} pending, est. {estimate}ms remaining",
            round_placed.len(),
            pending.len()
        );

        sleep(Duration::from_secs(config.time_delta_secs));

        for (i, resp) in round_placed {
            let _ = exchange.cancel_order(&resp.handle);
            match exchange.get_order(&resp.handle) {
                Ok(status) if status.remaining() > DUST_THRESHOLD => {
                    pending[i].order.quantity = status.remaining();
                    pending[i].retries += 1;
                }
                Ok(_) => {
                    // Effectively fully filled once cancelled.
                    pending[i].retries = usize::MAX;
                }
                Err(_) => {
                    pending[i].retries = usize::MAX;
                }
            }
            responses.push(resp);
        }

        pending.retain(|p| p.retries <= config.max_retries);
    }

    if !pending.is_empty() {
        warn!(
            "limit executor stopped with {} orders still pending after {max_rounds} rounds",
            pending.len()
        );
    }

    responses
}

fn consumed_asset(order: &Order) -> Asset {
    match order.direction {
        Direction::Sell => order.pair.commodity.clone(),
        Direction::Buy => order.pair.base.clone(),
    }
}

fn produced_asset(order: &Order) -> Asset {
    match order.direction {
        Direction::Sell => order.pair.base.clone(),
        Direction::Buy => order.pair.commodity.clone(),
    }
}

fn order_is_resource_feasible(
    order: &Order,
    _rules: &PairRules,
    balances: &FxHashMap<Asset, Decimal>,
    free: &FxHashSet<Asset>,
    mid: Decimal,
) -> bool {
    match order.direction {
        Direction::Sell => {
            free.contains(&order.pair.commodity)
                || balances
                    .get(&order.pair.commodity)
                    .copied()
                    .unwrap_or_default()
                    >= order.quantity
        }
        Direction::Buy => {
            free.contains(&order.pair.base)
                || balances.get(&order.pair.base).copied().unwrap_or_default()
                    >= order.quantity * mid
        }
    }
}

fn mean_remaining_ms(pending: &[PendingOrder], config: &LimitExecutorConfig) -> u64 {
    if pending.is_empty() {
        return 0;
    }
    let sum: i64 = pending
        .iter()
        .map(|p| (config.max_retries as i64 - p.retries as i64).max(0))
        .sum();
    let mean = sum as f64 / pending.len() as f64;
    (mean * config.time_delta_secs as f64 * 3.0 * 1000.0) as u64
}
