//! Price estimator: shortest path over log-prices to derive a single price
//! per asset in a base currency.

use rust_decimal::MathematicalOps;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::market::{Asset, OrderBook};

type Graph = FxHashMap<Asset, FxHashMap<Asset, rust_decimal::Decimal>>;

/// Builds the directed log-price graph from a set of order books: for each
/// book `(commodity, base)` with known mid, adds `commodity -> base` weighted
/// `-log10(mid)` and the reverse `base -> commodity` weighted `-log10(1/mid)`.
fn build_graph(orderbooks: &[OrderBook]) -> Result<Graph> {
    let mut graph: Graph = FxHashMap::default();
    for ob in orderbooks {
        let mid = ob.mid()?;
        let forward = -mid.log10();
        let backward = -(rust_decimal::Decimal::ONE / mid).log10();
        graph
            .entry(ob.pair.commodity.clone())
            .or_default()
            .insert(ob.pair.base.clone(), forward);
        graph
            .entry(ob.pair.base.clone())
            .or_default()
            .insert(ob.pair.commodity.clone(), backward);
    }
    Ok(graph)
}

/// Breadth-layered cheapest-path search from `start` over `graph`.
///
/// A neighbor is only improved if it strictly decreases the best distance
/// known *at the same discovery depth* as the vertex currently being
/// relaxed, breaking ties by fewer hops. This mirrors a textbook BFS queue
/// discipline with an added same-layer relaxation pass, rather than a
/// general Bellman-Ford/Dijkstra.
fn bfs(
    graph: &Graph,
    start: &Asset,
) -> FxHashMap<Asset, rust_decimal::Decimal> {
    let mut dist_depth: FxHashMap<Asset, (rust_decimal::Decimal, usize)> = FxHashMap::default();
    dist_depth.insert(start.clone(), (rust_decimal::Decimal::ZERO, 0));
    let mut queue: Vec<(Asset, usize)> = vec![(start.clone(), 0)];
    let mut i = 0;
    while i < queue.len() {
        let (current, depth) = queue[i].clone();
        let current_dist = dist_depth[&current].0;
        if let Some(neighbors) = graph.get(&current) {
            for (v, w) in neighbors {
                let candidate = current_dist + *w;
                if let Some((existing_dist, existing_depth)) = dist_depth.get(v) {
                    if *existing_depth != depth || *existing_dist < candidate {
                        continue;
                    }
                    dist_depth.insert(v.clone(), (candidate, depth + 1));
                } else {
                    dist_depth.insert(v.clone(), (candidate, depth + 1));
                    queue.push((v.clone(), depth + 1));
                }
            }
        }
        i += 1;
    }
    dist_depth.into_iter().map(|(k, (d, _))| (k, d)).collect()
}

fn pow10(x: rust_decimal::Decimal) -> rust_decimal::Decimal {
    (x * rust_decimal::Decimal::from(10u8).ln()).exp()
}

/// Derives a price (in units of `base`) for every asset reachable from
/// `base` in the order book graph.
pub fn price_estimates(
    orderbooks: &[OrderBook],
    base: &Asset,
) -> Result<FxHashMap<Asset, rust_decimal::Decimal>> {
    let graph = build_graph(orderbooks)?;
    let dists = bfs(&graph, base);
    Ok(dists.into_iter().map(|(a, d)| (a, pow10(d))).collect())
}
