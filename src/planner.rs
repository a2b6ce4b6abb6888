//! Rebalance planner: min-cost flow over the currency graph, producing
//! abstract `from -> to` transfers that carry `initial_weights` to
//! `final_weights` at minimum total fee cost.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rustc_hash::FxHashMap;

use crate::error::{CoreError, Result};
use crate::market::{Asset, Pair};

/// Default min-cost-flow scaling precision, per spec.md §4.5 (`1e-8`).
pub const DEFAULT_PRECISION: Decimal = Decimal::new(1, 8);

/// An abstract currency-to-currency transfer: move `amount_in_base` units of
/// portfolio value (in the valuation base) from `from_asset` to `to_asset`.
/// Not yet tied to a real trading pair -- see `materializer`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbstractTransfer {
    pub from_asset: Asset,
    pub to_asset: Asset,
    pub amount_in_base: Decimal,
}

const SOURCE: usize = 0;
const SINK: usize = 1;
/// Stand-in for "infinite" edge capacity: large enough that no feasible flow
/// (bounded by total scaled weight mass) can saturate it.
const INFINITE_CAPACITY: i64 = i64::MAX / 4;

#[derive(Clone, Copy, Debug)]
struct Edge {
    to: usize,
    cap: i64,
    cost: i64,
}

/// A minimal successive-shortest-augmenting-path min-cost-flow solver over a
/// residual graph with integer capacities/costs. Edge costs here are always
/// non-negative (see `plan`), so each augmenting search is a plain Dijkstra
/// with a potential function maintained across iterations -- no Bellman-Ford
/// initialization is needed.
struct MinCostFlow {
    edges: Vec<Edge>,
    adj: Vec<Vec<usize>>,
}

impl MinCostFlow {
    fn new(n: usize) -> Self {
        Self {
            edges: Vec::new(),
            adj: vec![Vec::new(); n],
        }
    }

    fn add_edge(&mut self, from: usize, to: usize, cap: i64, cost: i64) {
        let a = self.edges.len();
        self.edges.push(Edge { to, cap, cost });
        self.adj[from].push(a);
        let b = self.edges.len();
        self.edges.push(Edge {
            to: from,
            cap: 0,
            cost: -cost,
        });
        self.adj[to].push(b);
    }

    /// Pushes up to `max_flow` units of flow from `SOURCE` to `SINK` at
    /// minimum cost. Returns the amount of flow actually pushed; a result
    /// less than `max_flow` means the network could not carry any more.
    fn min_cost_flow(&mut self, max_flow: i64) -> i64 {
        let n = self.adj.len();
        let mut potential = vec![0i64; n];
        let mut remaining = max_flow;
        let mut pushed_total = 0i64;

        while remaining > 0 {
            let mut dist = vec![i64::MAX; n];
            let mut in_edge = vec![usize::MAX; n];
            dist[SOURCE] = 0;

            // Dijkstra over reduced costs (cost + potential[u] - potential[v] >= 0).
            let mut visited = vec![false; n];
            loop {
                let mut u = usize::MAX;
                let mut best = i64::MAX;
                for v in 0..n {
                    if !visited[v] && dist[v] < best {
                        best = dist[v];
                        u = v;
                    }
                }
                if u == usize::MAX {
                    break;
                }
                visited[u] = true;
                for &ei in &self.adj[u] {
                    let e = self.edges[ei];
                    if e.cap <= 0 {
                        continue;
                    }
                    let reduced = e.cost + potential[u] - potential[e.to];
                    if dist[u] != i64::MAX && dist[u] + reduced < dist[e.to] {
                        dist[e.to] = dist[u] + reduced;
                        in_edge[e.to] = ei;
                    }
                }
            }

            if dist[SINK] == i64::MAX {
                break;
            }
            for v in 0..n {
                if dist[v] < i64::MAX {
                    potential[v] += dist[v];
                }
            }

            // Bottleneck along the path.
            let mut bottleneck = remaining;
            let mut v = SINK;
            while v != SOURCE {
                let ei = in_edge[v];
                bottleneck = bottleneck.min(self.edges[ei].cap);
                v = self.edges[ei ^ 1].to;
            }
            if bottleneck == 0 {
                break;
            }

            let mut v = SINK;
            while v != SOURCE {
                let ei = in_edge[v];
                self.edges[ei].cap -= bottleneck;
                self.edges[ei ^ 1].cap += bottleneck;
                v = self.edges[ei ^ 1].to;
            }

            remaining -= bottleneck;
            pushed_total += bottleneck;
        }

        pushed_total
    }
}

fn scale(w: Decimal, inv_precision: Decimal) -> i64 {
    (w * inv_precision).trunc().to_i64().unwrap_or(0)
}

fn descale(units: i64, precision: Decimal) -> Decimal {
    Decimal::from(units) * precision
}

/// Cost of traversing a pair whose trade retains fraction `fee` of value
/// (e.g. `0.999` for a 0.1% all-in cost): `-round(log10(fee) * inv_precision)`.
/// Always non-negative since `fee` is in `(0, 1]`.
fn edge_cost(fee: Decimal, inv_precision: Decimal) -> Option<i64> {
    if fee <= Decimal::ZERO {
        return None;
    }
    let cost = (-fee.log10() * inv_precision).round();
    cost.to_i64()
}

/// Computes the minimum-cost sequence of abstract transfers carrying
/// `initial_weights` to `final_weights`, routing through `pair_fees` (keyed
/// by pair, valued as the retained fraction of a trade on that pair -- e.g.
/// `1 - total_fee`).
///
/// Errors with `CoreError::InfeasiblePlan` if the flow cannot be satisfied
/// (e.g. the fee graph doesn't connect every asset that needs to shed or
/// gain weight).
pub fn plan(
    initial_weights: &FxHashMap<Asset, Decimal>,
    final_weights: &FxHashMap<Asset, Decimal>,
    pair_fees: &FxHashMap<Pair, Decimal>,
    precision: Decimal,
) -> Result<Vec<AbstractTransfer>> {
    let inv_precision = Decimal::ONE / precision;

    let mut assets: Vec<Asset> = initial_weights.keys().cloned().collect();
    for a in final_weights.keys() {
        if !assets.contains(a) {
            assets.push(a.clone());
        }
    }
    for pair in pair_fees.keys() {
        if !assets.contains(&pair.commodity) {
            assets.push(pair.commodity.clone());
        }
        if !assets.contains(&pair.base) {
            assets.push(pair.base.clone());
        }
    }

    let mut index: FxHashMap<Asset, usize> = FxHashMap::default();
    for (i, a) in assets.iter().enumerate() {
        index.insert(a.clone(), i + 2);
    }
    let n = assets.len() + 2;
    let mut flow = MinCostFlow::new(n);

    for (asset, w) in initial_weights {
        let cap = scale(*w, inv_precision);
        if cap > 0 {
            flow.add_edge(SOURCE, index[asset], cap, 0);
        }
    }
    for (asset, w) in final_weights {
        let cap = scale(*w, inv_precision);
        if cap > 0 {
            flow.add_edge(index[asset], SINK, cap, 0);
        }
    }
    for (pair, fee) in pair_fees {
        if let Some(cost) = edge_cost(*fee, inv_precision) {
            let u = index[&pair.commodity];
            let v = index[&pair.base];
            flow.add_edge(u, v, INFINITE_CAPACITY, cost);
            flow.add_edge(v, u, INFINITE_CAPACITY, cost);
        }
    }

    let total_initial: i64 = initial_weights.values().map(|w| scale(*w, inv_precision)).sum();
    let total_final: i64 = final_weights.values().map(|w| scale(*w, inv_precision)).sum();
    let demand = total_initial.min(total_final);

    if demand <= 0 {
        return Ok(Vec::new());
    }

    let pushed = flow.min_cost_flow(demand);
    if pushed < demand {
        return Err(CoreError::InfeasiblePlan(format!(
            "could only route {pushed} of {demand} scaled weight units through the fee graph"
        )));
    }

    // Read back flow on every asset-to-asset edge (skip SOURCE/SINK and
    // reverse/residual edges, which carry cap > 0 but no forward meaning).
    let mut transfers = Vec::new();
    for (from_asset, &u) in &index {
        for &ei in &flow.adj[u] {
            let edge = flow.edges[ei];
            if edge.to < 2 {
                continue;
            }
            // Forward edges were added at even indices; odd indices are the
            // zero-cost-origin residual duals we created alongside them.
            if ei % 2 != 0 {
                continue;
            }
            let original_cap = INFINITE_CAPACITY;
            let used = original_cap - edge.cap;
            if used <= 0 {
                continue;
            }
            let to_asset = assets
                .iter()
                .find(|a| index[*a] == edge.to)
                .expect("edge target must be a known asset");
            let amount = descale(used, precision);
            if amount > Decimal::new(1, 18) {
                transfers.push(AbstractTransfer {
                    from_asset: from_asset.clone(),
                    to_asset: to_asset.clone(),
                    amount_in_base: amount,
                });
            }
        }
    }

    Ok(transfers)
}
