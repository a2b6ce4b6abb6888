//! Execution orchestrator: fetch state → estimate prices → plan → validate
//! → execute → audit. This is the pipeline that ties every core component
//! (C3-C7) to the concrete market/limit executors (C8/C9) behind a single
//! `Exchange` adapter.

use std::thread;

use log::info;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use rebalance_core::estimator;
use rebalance_core::market::{Asset, OrderBook, Pair, PairRules};
use rebalance_core::materializer::{parse_order, topological_sort};
use rebalance_core::order::{Order, OrderType};
use rebalance_core::planner::{self, AbstractTransfer, DEFAULT_PRECISION};
use rebalance_core::weights;

use rebalance_exchange::mock::MockExchange;
#[cfg(feature = "binance")]
use rebalance_exchange::binance::BinanceExchange;
use rebalance_exchange::{Exchange, ExecutionResponse};

use crate::audit::{self, AuditLog};
use crate::config::{Config, ExchangeKind, ExecutionMode};
use crate::error::{Error, Result};
use crate::limit_executor::{self, LimitExecutorConfig};
use crate::market_executor;
use crate::target::TargetSpec;

/// Options controlling one `run` invocation.
pub struct RunOptions {
    /// Print the plan and stop before submitting anything.
    pub dry_run: bool,
    /// Skip the interactive confirmation prompt (for automation/cron).
    pub force: bool,
}

/// Builds the configured `Exchange` adapter. `mock` is always available;
/// `binance` requires the `binance` feature and credentials in config.
pub fn build_exchange(config: &Config) -> Result<Box<dyn Exchange>> {
    match config.exchange.kind {
        ExchangeKind::Mock => Ok(Box::new(MockExchange::builder().build())),
        ExchangeKind::Binance => {
            #[cfg(feature = "binance")]
            {
                let api_key = config.exchange.api_key.clone().unwrap_or_default();
                let secret_key = config.exchange.secret_key.clone().unwrap_or_default();
                Ok(Box::new(BinanceExchange::new(
                    &api_key,
                    &secret_key,
                    config.exchange.testnet,
                )))
            }
            #[cfg(not(feature = "binance"))]
            {
                Err(Error::Config(
                    "binance exchange selected but this build was compiled without the `binance` feature".into(),
                ))
            }
        }
    }
}

/// Everything a plan needs: balances, every exchange pair's rules and order
/// book, derived prices, and the resulting value-weighted portfolio.
pub struct MarketState {
    pub balances: FxHashMap<Asset, Decimal>,
    pub pair_rules: FxHashMap<Pair, PairRules>,
    pub orderbooks: Vec<OrderBook>,
    pub prices: FxHashMap<Asset, Decimal>,
    pub weights: FxHashMap<Asset, Decimal>,
    pub portfolio_value: Decimal,
}

/// Fetches balances and every listed pair's rules and order book, then
/// derives price estimates (C3) and portfolio weights (C4) against `base`.
pub fn fetch_market_state(exchange: &dyn Exchange, base: &Asset) -> Result<MarketState> {
    let balances = exchange.get_balances()?;
    let pair_rules = exchange.get_pair_rules()?;
    let pairs: Vec<Pair> = pair_rules.keys().cloned().collect();
    let orderbooks = exchange.get_orderbooks(&pairs)?;
    let prices = estimator::price_estimates(&orderbooks, base)?;
    let portfolio_weights = weights::weights(&balances, &prices)?;
    let portfolio_value = weights::portfolio_value(&balances, &prices);
    Ok(MarketState {
        balances,
        pair_rules,
        orderbooks,
        prices,
        weights: portfolio_weights,
        portfolio_value,
    })
}

/// Per-pair retained-value fraction fed to the planner (C5), combining the
/// trade fee (taker for market mode, maker for limit mode) with the pair's
/// spread cost. Limit mode additionally applies the `(1-fee)/100` pseudo-fee
/// scaling from spec.md §4.5, biasing the planner to minimize order count
/// before fees.
pub fn pair_fees(
    exchange: &dyn Exchange,
    state: &MarketState,
    config: &Config,
    mode: ExecutionMode,
) -> FxHashMap<Pair, Decimal> {
    let books: FxHashMap<&Pair, &OrderBook> =
        state.orderbooks.iter().map(|b| (&b.pair, b)).collect();

    state
        .pair_rules
        .keys()
        .map(|pair| {
            let trade_fee = match mode {
                ExecutionMode::Market => exchange.get_taker_fee(pair).ok(),
                ExecutionMode::Limit => exchange.get_maker_fee(pair).ok(),
            }
            .unwrap_or_else(|| {
                let default = match mode {
                    ExecutionMode::Market => config.cost.default_taker_fee,
                    ExecutionMode::Limit => config.cost.default_maker_fee,
                };
                Decimal::from_f64_retain(default).unwrap_or_default()
            });
            let spread_fee = books
                .get(pair)
                .and_then(|ob| weights::spread_to_fee(ob).ok())
                .unwrap_or(Decimal::ZERO);
            let retained = Decimal::ONE - weights::total_fee(&[trade_fee, spread_fee]);
            let value = match mode {
                ExecutionMode::Market => retained,
                ExecutionMode::Limit => retained / Decimal::from(100),
            };
            (pair.clone(), value)
        })
        .collect()
}

/// Plans a rebalance from `state` to `target`: C5 (abstract transfers) then
/// C6 (materialized, mode-appropriate orders). Does not validate (C7) or
/// execute -- that happens per-order inside the executors.
pub fn plan_orders(
    exchange: &dyn Exchange,
    state: &MarketState,
    target_weights: &FxHashMap<Asset, Decimal>,
    config: &Config,
) -> Result<(Vec<AbstractTransfer>, Vec<Order>)> {
    let fees = pair_fees(exchange, state, config, config.execution.mode);
    let weight_transfers = planner::plan(&state.weights, target_weights, &fees, DEFAULT_PRECISION)?;

    // `planner::plan` operates on value-weighted portfolio fractions (they
    // sum to 1), so each transfer's `amount_in_base` must be scaled by the
    // portfolio's total value before it means anything in base-asset units.
    let transfers: Vec<AbstractTransfer> = weight_transfers
        .into_iter()
        .map(|t| AbstractTransfer {
            amount_in_base: t.amount_in_base * state.portfolio_value,
            ..t
        })
        .collect();

    let base = Asset::new(config.account.base_asset.clone());
    let available_pairs: Vec<Pair> = state.pair_rules.keys().cloned().collect();
    let market_orders: Vec<Order> = transfers
        .iter()
        .map(|t| parse_order(t, &available_pairs, &state.prices, &base).map_err(Error::from))
        .collect::<Result<_>>()?;

    let orders = match config.execution.mode {
        ExecutionMode::Market => topological_sort(market_orders),
        ExecutionMode::Limit => {
            let books: FxHashMap<&Pair, &OrderBook> =
                state.orderbooks.iter().map(|b| (&b.pair, b)).collect();
            market_orders
                .into_iter()
                .map(|o| {
                    let seed_price = books
                        .get(&o.pair)
                        .and_then(|ob| ob.mid().ok())
                        .or_else(|| {
                            let commodity = state.prices.get(&o.pair.commodity)?;
                            let base = state.prices.get(&o.pair.base)?;
                            Some(*commodity / *base)
                        })
                        .unwrap_or(Decimal::ONE);
                    Order::new(o.pair, OrderType::Limit, o.direction, o.quantity, Some(seed_price))
                        .map_err(Error::from)
                })
                .collect::<Result<_>>()?
        }
    };

    Ok((transfers, orders))
}

/// Runs a full rebalance: fetch state, plan, display, (optionally) confirm,
/// execute, and audit. `target` need not sum to 1 -- unallocated mass is
/// routed to the configured padding asset.
pub fn run(config: &Config, target: &TargetSpec, opts: &RunOptions) -> Result<()> {
    let exchange = build_exchange(config)?;
    run_with_exchange(exchange.as_ref(), config, target, opts)
}

/// Same as `run`, against an already-constructed exchange -- the seam tests
/// use to drive the pipeline with `MockExchange`.
pub fn run_with_exchange(
    exchange: &dyn Exchange,
    config: &Config,
    target: &TargetSpec,
    opts: &RunOptions,
) -> Result<()> {
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit.log_simple("run_started")?;

    let base = Asset::new(config.account.base_asset.clone());
    let padding = Asset::new(config.execution.padding_asset.clone());

    let state = fetch_market_state(exchange, &base)?;
    audit::log_positions(&mut audit, &state.balances, &state.weights)?;

    println!("Portfolio value: {} {base}", state.portfolio_value);
    display_weights("CURRENT WEIGHTS", &state.weights);

    let target_weights = target.complete(&padding)?;
    display_weights("TARGET WEIGHTS", &target_weights);

    let (transfers, orders) = plan_orders(exchange, &state, &target_weights, config)?;

    if orders.len() > config.execution.max_orders_per_run {
        return Err(Error::TooManyOrders(format!(
            "{} orders generated, max_orders_per_run is {}",
            orders.len(),
            config.execution.max_orders_per_run
        )));
    }

    audit::log_plan(&mut audit, &transfers, &orders)?;

    if orders.is_empty() {
        println!("\nNo rebalancing needed -- portfolio matches target.");
        audit.log_simple("no_rebalance_needed")?;
        return Ok(());
    }

    display_plan(&transfers, &orders);

    if opts.dry_run {
        println!("\n[DRY RUN] No orders submitted.");
        audit.log_simple("dry_run_complete")?;
        return Ok(());
    }

    if !opts.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Execute?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
        if !confirmed {
            println!("Aborted.");
            audit.log_simple("user_declined")?;
            return Ok(());
        }
    }

    for order in &orders {
        audit::log_order_submitted(&mut audit, order, 1)?;
    }

    let responses: Vec<ExecutionResponse> = match config.execution.mode {
        ExecutionMode::Market => {
            market_executor::execute_market_orders(exchange, orders, &state.pair_rules, &state.prices)
        }
        ExecutionMode::Limit => {
            let exec_config = LimitExecutorConfig {
                time_delta_secs: config.execution.time_delta_secs,
                max_retries: config.execution.max_retries,
            };
            limit_executor::execute_limit_orders(
                exchange,
                orders,
                &exec_config,
                |progress| info!("limit executor: ~{}ms remaining", progress.remaining_ms),
                |d| thread::sleep(d),
            )
        }
    };

    for resp in &responses {
        audit::log_order_filled(&mut audit, &config.account.id, resp)?;
    }

    println!(
        "\n{} of {} planned orders produced a fill.",
        responses.len(),
        transfers.len()
    );
    audit::log_run_completed(
        &mut audit,
        transfers.len(),
        responses.len(),
        transfers.len().saturating_sub(responses.len()),
    )?;

    Ok(())
}

/// Prints current balances and their value-weighted portfolio weights.
pub fn show_positions(config: &Config) -> Result<()> {
    let exchange = build_exchange(config)?;
    let base = Asset::new(config.account.base_asset.clone());
    let state = fetch_market_state(exchange.as_ref(), &base)?;
    println!("Portfolio value: {} {base}", state.portfolio_value);
    display_weights("CURRENT WEIGHTS", &state.weights);
    Ok(())
}

/// Checks exchange connectivity by fetching balances.
pub fn check_status(config: &Config) -> Result<()> {
    let exchange = build_exchange(config)?;
    print!("Checking {:?} connectivity... ", config.exchange.kind);
    let balances = exchange.get_balances()?;
    println!("OK ({} assets held)", balances.len());
    Ok(())
}

/// Computes and prints the rebalance plan without executing it.
pub fn show_plan(config: &Config, target: &TargetSpec) -> Result<()> {
    let exchange = build_exchange(config)?;
    let base = Asset::new(config.account.base_asset.clone());
    let padding = Asset::new(config.execution.padding_asset.clone());
    let state = fetch_market_state(exchange.as_ref(), &base)?;
    let target_weights = target.complete(&padding)?;
    let (transfers, orders) = plan_orders(exchange.as_ref(), &state, &target_weights, config)?;
    display_weights("CURRENT WEIGHTS", &state.weights);
    display_weights("TARGET WEIGHTS", &target_weights);
    if orders.is_empty() {
        println!("\nNo rebalancing needed -- portfolio matches target.");
    } else {
        display_plan(&transfers, &orders);
    }
    Ok(())
}

/// Compares current weights against a target and reports drift per asset.
pub fn run_reconcile(config: &Config, target: &TargetSpec) -> Result<()> {
    let exchange = build_exchange(config)?;
    let base = Asset::new(config.account.base_asset.clone());
    let padding = Asset::new(config.execution.padding_asset.clone());
    let state = fetch_market_state(exchange.as_ref(), &base)?;
    let target_weights = target.complete(&padding)?;

    let mut assets: Vec<Asset> = state
        .weights
        .keys()
        .chain(target_weights.keys())
        .cloned()
        .collect();
    assets.sort();
    assets.dedup();

    println!("RECONCILIATION (current vs target):");
    for asset in assets {
        let current = state.weights.get(&asset).copied().unwrap_or(Decimal::ZERO);
        let wanted = target_weights.get(&asset).copied().unwrap_or(Decimal::ZERO);
        println!(
            "  {:8} current {}  target {}  drift {}",
            asset.as_str(),
            current,
            wanted,
            current - wanted
        );
    }
    Ok(())
}

fn display_weights(title: &str, weights: &FxHashMap<Asset, Decimal>) {
    println!("\n{title}:");
    let mut rows: Vec<(&Asset, &Decimal)> = weights.iter().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));
    for (asset, w) in rows {
        println!("  {:8} {w}", asset.as_str());
    }
}

fn display_plan(transfers: &[AbstractTransfer], orders: &[Order]) {
    println!("\nABSTRACT TRANSFERS:");
    for t in transfers {
        println!("  {} -> {}  {} (base units)", t.from_asset, t.to_asset, t.amount_in_base);
    }
    println!("\nORDERS:");
    for o in orders {
        match o.price {
            Some(price) => println!("  {} {} {} @ {price}", o.direction, o.quantity, o.pair),
            None => println!("  {} {} {}", o.direction, o.quantity, o.pair),
        }
    }
}
