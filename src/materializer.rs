//! Order materializer: turns abstract currency-to-currency transfers into
//! concrete orders on real trading pairs, and topologically orders the
//! result for market-mode execution.

use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{CoreError, Result};
use crate::market::{Asset, Direction, Pair};
use crate::order::{Order, OrderType};
use crate::planner::AbstractTransfer;

/// Materializes one abstract transfer into a concrete market order.
///
/// Finds the real pair among `available_pairs` matching either
/// `from -> to` or `to -> from`; if the match is `from_to`, the trade sells
/// the commodity for the base (`Direction::Sell`), otherwise it buys the
/// commodity with the base (`Direction::Buy`). The transfer's
/// `amount_in_base` -- expressed in units of the portfolio's *valuation*
/// base, not necessarily the matched pair's quote asset -- is converted to
/// commodity units using the price estimates:
/// `quantity = amount_in_base * prices[valuation_base] / prices[commodity]`.
pub fn parse_order(
    transfer: &AbstractTransfer,
    available_pairs: &[Pair],
    prices: &FxHashMap<Asset, Decimal>,
    valuation_base: &Asset,
) -> Result<Order> {
    let forward = Pair::new(transfer.from_asset.clone(), transfer.to_asset.clone());
    let backward = Pair::new(transfer.to_asset.clone(), transfer.from_asset.clone());

    let (pair, direction) = if available_pairs.contains(&forward) {
        (forward, Direction::Sell)
    } else if available_pairs.contains(&backward) {
        (backward, Direction::Buy)
    } else {
        return Err(CoreError::NoPairFound(
            transfer.from_asset.clone(),
            transfer.to_asset.clone(),
        ));
    };

    let valuation_price = *prices
        .get(valuation_base)
        .ok_or_else(|| CoreError::UnreachableAsset(valuation_base.clone()))?;
    let commodity_price = *prices
        .get(&pair.commodity)
        .ok_or_else(|| CoreError::UnreachableAsset(pair.commodity.clone()))?;

    let quantity = transfer.amount_in_base * valuation_price / commodity_price;

    Order::new(pair, OrderType::Market, direction, quantity, None)
}

/// Asset produced by an order: the side the trade adds to the balance.
fn produced(order: &Order) -> &Asset {
    match order.direction {
        Direction::Sell => &order.pair.base,
        Direction::Buy => &order.pair.commodity,
    }
}

/// Asset consumed by an order: the side the trade spends from the balance.
fn consumed(order: &Order) -> &Asset {
    match order.direction {
        Direction::Sell => &order.pair.commodity,
        Direction::Buy => &order.pair.base,
    }
}

/// Topologically sorts market orders so that an order producing asset X runs
/// before any order consuming X. Builds a dependency DAG (`order_i -> order_j`
/// iff `order_i` produces what `order_j` consumes) and emits a valid
/// linearization via Kahn's algorithm.
///
/// If the dependency graph contains a cycle -- the input wasn't a DAG -- the
/// orders are returned in their original (filed) order, per spec.md §4.6.
pub fn topological_sort(orders: Vec<Order>) -> Vec<Order> {
    let n = orders.len();
    if n <= 1 {
        return orders;
    }

    // Map each produced asset to the orders that produce it (normally one,
    // but be permissive -- a duplicate producer just adds another edge).
    let mut producers: FxHashMap<&Asset, Vec<usize>> = FxHashMap::default();
    for (i, o) in orders.iter().enumerate() {
        producers.entry(produced(o)).or_default().push(i);
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree: Vec<usize> = vec![0; n];
    for (j, o) in orders.iter().enumerate() {
        if let Some(ps) = producers.get(consumed(o)) {
            for &i in ps {
                if i != j {
                    adjacency[i].push(j);
                    in_degree[j] += 1;
                }
            }
        }
    }

    let mut queue: std::collections::VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order_indices = Vec::with_capacity(n);
    let mut seen: FxHashSet<usize> = FxHashSet::default();

    while let Some(u) = queue.pop_front() {
        if !seen.insert(u) {
            continue;
        }
        order_indices.push(u);
        for &v in &adjacency[u] {
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    if order_indices.len() != n {
        // Cycle detected -- not a DAG, fall back to filed order.
        return orders;
    }

    let mut slots: Vec<Option<Order>> = orders.into_iter().map(Some).collect();
    order_indices
        .into_iter()
        .map(|i| slots[i].take().expect("each index visited exactly once"))
        .collect()
}
