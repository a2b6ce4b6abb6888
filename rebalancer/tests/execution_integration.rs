//! Integration tests for the full fetch-state -> plan -> execute pipeline,
//! driven against `MockExchange` -- no network calls.

use rebalance_core::market::{Asset, Direction, OrderBook, Pair, PairRules};
use rebalance_exchange::mock::{FillMode, MockExchange};
use rebalancer::config::{
    AccountConfig, Config, CostConfig, ExchangeConfig, ExchangeKind, ExecutionConfig,
    ExecutionMode, LoggingConfig,
};
use rebalancer::execution::{self, RunOptions};
use rebalancer::target::TargetSpec;
use rust_decimal_macros::dec;

fn btc_usdt() -> Pair {
    Pair::new("BTC", "USDT")
}

fn eth_usdt() -> Pair {
    Pair::new("ETH", "USDT")
}

fn eth_btc() -> Pair {
    Pair::new("ETH", "BTC")
}

fn rules() -> PairRules {
    PairRules {
        min_size: dec!(0.0001),
        max_size: dec!(1000),
        size_step: dec!(0.0001),
        price_step: dec!(0.01),
        min_notional: dec!(10),
        min_price: dec!(0.01),
        max_price: dec!(1_000_000),
    }
}

fn config(mode: ExecutionMode) -> Config {
    Config {
        exchange: ExchangeConfig {
            kind: ExchangeKind::Mock,
            testnet: false,
            api_key: None,
            secret_key: None,
        },
        account: AccountConfig {
            id: "integration-test".into(),
            base_asset: "USDT".into(),
        },
        execution: ExecutionConfig {
            mode,
            dry_run: false,
            max_orders_per_run: 50,
            padding_asset: "BTC".into(),
            time_delta_secs: 1,
            max_retries: 2,
        },
        cost: CostConfig {
            default_taker_fee: 0.001,
            default_maker_fee: 0.0,
        },
        logging: LoggingConfig {
            dir: std::env::temp_dir().to_string_lossy().into_owned(),
            audit_file: format!("rebalancer-integration-{mode:?}.jsonl"),
        },
    }
}

fn force_run() -> RunOptions {
    RunOptions {
        dry_run: false,
        force: true,
    }
}

// spec.md scenario 1: single-hop rebalance, BTC -> USDT.
#[test]
fn single_hop_rebalance_sells_btc_for_usdt() {
    let exchange = MockExchange::builder()
        .fill_mode(FillMode::ImmediateFull)
        .with_balance(Asset::new("BTC"), dec!(1))
        .with_orderbook(OrderBook::new(btc_usdt(), dec!(10000), dec!(10000)))
        .with_pair_rules(btc_usdt(), rules())
        .build();

    let target =
        TargetSpec::from_json(r#"{"weights": [{"asset": "USDT", "weight": 1.0}]}"#).unwrap();

    execution::run_with_exchange(&exchange, &config(ExecutionMode::Market), &target, &force_run())
        .unwrap();

    let submitted = exchange.submitted_orders();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].pair, btc_usdt());
    assert_eq!(submitted[0].direction, Direction::Sell);
    assert!((submitted[0].quantity - dec!(1)).abs() < dec!(0.0001));
}

// spec.md scenario 2: a rebalance across three assets linked by a shared
// ETH/BTC pair, exercising the multi-hop planner (C5) and topological
// ordering (C6) rather than a single direct trade.
#[test]
fn three_asset_rebalance_routes_through_available_pairs() {
    let exchange = MockExchange::builder()
        .fill_mode(FillMode::ImmediateFull)
        .with_balance(Asset::new("BTC"), dec!(0.2))
        .with_balance(Asset::new("ETH"), dec!(3))
        .with_balance(Asset::new("USDT"), dec!(5000))
        .with_orderbook(OrderBook::new(btc_usdt(), dec!(10000), dec!(10000)))
        .with_orderbook(OrderBook::new(eth_usdt(), dec!(1000), dec!(1000)))
        .with_orderbook(OrderBook::new(eth_btc(), dec!(0.1), dec!(0.1)))
        .with_pair_rules(btc_usdt(), rules())
        .with_pair_rules(eth_usdt(), rules())
        .with_pair_rules(eth_btc(), rules())
        .build();

    let target = TargetSpec::from_json(
        r#"{"weights": [
            {"asset": "BTC", "weight": 0.5},
            {"asset": "ETH", "weight": 0.2},
            {"asset": "USDT", "weight": 0.3}
        ]}"#,
    )
    .unwrap();

    execution::run_with_exchange(&exchange, &config(ExecutionMode::Market), &target, &force_run())
        .unwrap();

    let submitted = exchange.submitted_orders();
    assert!(!submitted.is_empty());
    assert!(
        submitted
            .iter()
            .all(|o| [btc_usdt(), eth_usdt(), eth_btc()].contains(&o.pair)),
        "unexpected pair traded: {submitted:?}"
    );
}

#[test]
fn dry_run_computes_plan_without_submitting() {
    let exchange = MockExchange::builder()
        .fill_mode(FillMode::ImmediateFull)
        .with_balance(Asset::new("BTC"), dec!(1))
        .with_orderbook(OrderBook::new(btc_usdt(), dec!(10000), dec!(10000)))
        .with_pair_rules(btc_usdt(), rules())
        .build();

    let target =
        TargetSpec::from_json(r#"{"weights": [{"asset": "USDT", "weight": 1.0}]}"#).unwrap();
    let opts = RunOptions {
        dry_run: true,
        force: true,
    };

    execution::run_with_exchange(&exchange, &config(ExecutionMode::Market), &target, &opts)
        .unwrap();
    assert!(exchange.submitted_orders().is_empty());
}

// spec.md scenario 6: weights completion routes unallocated mass to BTC.
#[test]
fn target_completion_pads_unallocated_weight_to_btc() {
    let exchange = MockExchange::builder()
        .fill_mode(FillMode::ImmediateFull)
        .with_balance(Asset::new("USDT"), dec!(1000))
        .with_orderbook(OrderBook::new(btc_usdt(), dec!(10000), dec!(10000)))
        .with_pair_rules(btc_usdt(), rules())
        .build();

    // Only ETH+USDT specified; BTC absorbs the remaining 0.5 -- but with no
    // ETH_USDT pair available, only the BTC leg is reachable, so the plan
    // must still route the BTC portion without erroring.
    let target = TargetSpec::from_json(
        r#"{"weights": [{"asset": "USDT", "weight": 0.5}]}"#,
    )
    .unwrap();

    execution::run_with_exchange(&exchange, &config(ExecutionMode::Market), &target, &force_run())
        .unwrap();

    let submitted = exchange.submitted_orders();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].pair, btc_usdt());
    assert_eq!(submitted[0].direction, Direction::Buy);
}

#[test]
fn already_at_target_produces_no_orders() {
    let exchange = MockExchange::builder()
        .fill_mode(FillMode::ImmediateFull)
        .with_balance(Asset::new("USDT"), dec!(1000))
        .with_orderbook(OrderBook::new(btc_usdt(), dec!(10000), dec!(10000)))
        .with_pair_rules(btc_usdt(), rules())
        .build();

    let target =
        TargetSpec::from_json(r#"{"weights": [{"asset": "USDT", "weight": 1.0}]}"#).unwrap();

    execution::run_with_exchange(&exchange, &config(ExecutionMode::Market), &target, &force_run())
        .unwrap();
    assert!(exchange.submitted_orders().is_empty());
}

#[test]
fn too_many_orders_aborts_before_submission() {
    let exchange = MockExchange::builder()
        .fill_mode(FillMode::ImmediateFull)
        .with_balance(Asset::new("BTC"), dec!(1))
        .with_orderbook(OrderBook::new(btc_usdt(), dec!(10000), dec!(10000)))
        .with_pair_rules(btc_usdt(), rules())
        .build();

    let mut cfg = config(ExecutionMode::Market);
    cfg.execution.max_orders_per_run = 0;
    let target =
        TargetSpec::from_json(r#"{"weights": [{"asset": "USDT", "weight": 1.0}]}"#).unwrap();

    let err = execution::run_with_exchange(&exchange, &cfg, &target, &force_run()).unwrap_err();
    assert!(matches!(err, rebalancer::error::Error::TooManyOrders(_)));
    assert!(exchange.submitted_orders().is_empty());
}

// spec.md scenario 5 (adapted): limit mode places resting orders and
// reconciles fills across rounds.
#[test]
fn limit_mode_places_a_post_only_order() {
    let exchange = MockExchange::builder()
        .fill_mode(FillMode::ImmediateFull)
        .with_balance(Asset::new("BTC"), dec!(1))
        .with_orderbook(OrderBook::new(btc_usdt(), dec!(10000), dec!(10000)))
        .with_pair_rules(btc_usdt(), rules())
        .build();

    let target =
        TargetSpec::from_json(r#"{"weights": [{"asset": "USDT", "weight": 1.0}]}"#).unwrap();

    execution::run_with_exchange(&exchange, &config(ExecutionMode::Limit), &target, &force_run())
        .unwrap();

    let submitted = exchange.submitted_orders();
    assert_eq!(submitted.len(), 1);
    assert!(submitted[0].is_limit);
}
