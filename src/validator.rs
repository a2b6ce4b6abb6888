//! Exchange rule validator: clips and quantizes order fields against a
//! pair's trading rules, recursing when balance ceilings force reductions.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::decimal::quantize;
use crate::market::{Asset, Direction, PairRules};
use crate::order::Order;

/// 1bp slack applied to the BUY-side reference price to avoid races against
/// the exchange's own book movement between validation and submission.
const BUY_SLACK: Decimal = Decimal::new(1_0001, 4);

/// Recursion backstop: each recursive call strictly decreases `quantity`
/// (balances are non-negative and finite), so this is never reached in
/// practice, but it keeps `validate` a total function even under adversarial
/// input.
const MAX_ITERATIONS: usize = 8;

/// Validates and clips `order` against `rules`, `balances`, and (for the BUY
/// cross-rate fallback) `prices`. Returns `None` if the order cannot be
/// satisfied at all (min-size, min-notional, or price-range violations that
/// clipping cannot fix); this is a silent per-order rejection, not an error
/// -- see spec.md §7.
pub fn validate(
    order: &Order,
    rules: &PairRules,
    balances: &FxHashMap<Asset, Decimal>,
    prices: &FxHashMap<Asset, Decimal>,
) -> Option<Order> {
    validate_inner(order.clone(), rules, balances, prices, 0)
}

fn validate_inner(
    mut order: Order,
    rules: &PairRules,
    balances: &FxHashMap<Asset, Decimal>,
    prices: &FxHashMap<Asset, Decimal>,
    depth: usize,
) -> Option<Order> {
    if depth >= MAX_ITERATIONS {
        return None;
    }

    // 1. Minimum size.
    if order.quantity < rules.min_size {
        return None;
    }
    // 2. Clip to maximum size.
    if order.quantity > rules.max_size {
        order.quantity = rules.max_size;
    }
    // 3. Quantize down to the size step.
    order.quantity = quantize(order.quantity, rules.size_step, true).ok()?;
    if order.quantity < rules.min_size {
        return None;
    }

    // 4. Price range and step (limit orders only). SELL rounds its maker
    // price up, BUY rounds it down -- preserving post-only intent.
    if let Some(price) = order.price {
        if price < rules.min_price || price > rules.max_price {
            return None;
        }
        let round_up = order.direction == Direction::Sell;
        let quantized = quantize(price, rules.price_step, !round_up).ok()?;
        if quantized < rules.min_price || quantized > rules.max_price {
            return None;
        }
        order.price = Some(quantized);
    }

    // 5. Notional check.
    let value = match order.price {
        Some(price) => price * order.quantity,
        None => {
            let commodity_price = *prices.get(&order.pair.commodity)?;
            let base_price = *prices.get(&order.pair.base)?;
            if base_price == Decimal::ZERO {
                return None;
            }
            (commodity_price / base_price) * order.quantity
        }
    };
    if value < rules.min_notional {
        return None;
    }

    // 6. Balance check, recursing on shrinkage.
    match order.direction {
        Direction::Sell => {
            let available = balances.get(&order.pair.commodity).copied().unwrap_or(Decimal::ZERO);
            if available < order.quantity {
                if available <= Decimal::ZERO {
                    return None;
                }
                order.quantity = available;
                return validate_inner(order, rules, balances, prices, depth + 1);
            }
        }
        Direction::Buy => {
            let reference_price = match order.price {
                Some(p) => p,
                None => {
                    let commodity_price = *prices.get(&order.pair.commodity)?;
                    let base_price = *prices.get(&order.pair.base)?;
                    if base_price == Decimal::ZERO {
                        return None;
                    }
                    commodity_price / base_price
                }
            };
            let price_eff = reference_price * BUY_SLACK;
            let available = balances.get(&order.pair.base).copied().unwrap_or(Decimal::ZERO);
            let required = order.quantity * price_eff;
            if available < required {
                if available <= Decimal::ZERO || price_eff <= Decimal::ZERO {
                    return None;
                }
                order.quantity = available / price_eff;
                return validate_inner(order, rules, balances, prices, depth + 1);
            }
        }
    }

    Some(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Pair;
    use crate::order::OrderType;
    use rust_decimal_macros::dec;

    fn asset(s: &str) -> Asset {
        Asset::new(s)
    }

    fn rules() -> PairRules {
        PairRules {
            min_size: dec!(0.001),
            max_size: dec!(10000),
            size_step: dec!(0.00000001),
            price_step: dec!(0.01),
            min_notional: dec!(10),
            min_price: dec!(0.01),
            max_price: dec!(1000000),
        }
    }

    fn balances(pairs: &[(&str, Decimal)]) -> FxHashMap<Asset, Decimal> {
        pairs.iter().map(|(a, v)| (asset(a), *v)).collect()
    }

    fn prices() -> FxHashMap<Asset, Decimal> {
        FxHashMap::from_iter([(asset("BTC"), dec!(10000)), (asset("USDT"), dec!(1))])
    }

    #[test]
    fn clips_buy_to_available_balance_with_one_bp_slack() {
        // Matches original_source/tests/exchange/test_binance.py's BUY
        // clipping vector: balances {BTC:1, USDT:10000}, price 10000,
        // order BUY qty=2 -> clipped to <= 1 accounting for 1bp slack.
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Market,
            Direction::Buy,
            dec!(2),
            None,
        )
        .unwrap();
        let bal = balances(&[("BTC", dec!(1)), ("USDT", dec!(10000))]);
        let validated = validate(&order, &rules(), &bal, &prices()).unwrap();
        assert!(validated.quantity <= dec!(1));
        assert!(validated.quantity > dec!(0.99));
    }

    #[test]
    fn rejects_below_min_size() {
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Market,
            Direction::Sell,
            dec!(0.0001),
            None,
        )
        .unwrap();
        let bal = balances(&[("BTC", dec!(1))]);
        assert!(validate(&order, &rules(), &bal, &prices()).is_none());
    }

    #[test]
    fn rejects_below_min_notional() {
        let mut tight_rules = rules();
        tight_rules.min_notional = dec!(1_000_000);
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Market,
            Direction::Sell,
            dec!(0.01),
            None,
        )
        .unwrap();
        let bal = balances(&[("BTC", dec!(1))]);
        assert!(validate(&order, &tight_rules, &bal, &prices()).is_none());
    }

    #[test]
    fn sell_clips_to_available_commodity_balance() {
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Market,
            Direction::Sell,
            dec!(2),
            None,
        )
        .unwrap();
        let bal = balances(&[("BTC", dec!(0.5))]);
        let validated = validate(&order, &rules(), &bal, &prices()).unwrap();
        assert_eq!(validated.quantity, dec!(0.5));
    }

    #[test]
    fn rejects_when_no_balance_at_all() {
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Market,
            Direction::Sell,
            dec!(2),
            None,
        )
        .unwrap();
        let bal = balances(&[]);
        assert!(validate(&order, &rules(), &bal, &prices()).is_none());
    }

    #[test]
    fn limit_sell_price_quantizes_up() {
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Limit,
            Direction::Sell,
            dec!(1),
            Some(dec!(10000.001)),
        )
        .unwrap();
        let bal = balances(&[("BTC", dec!(1))]);
        let validated = validate(&order, &rules(), &bal, &prices()).unwrap();
        assert_eq!(validated.price, Some(dec!(10000.01)));
    }

    #[test]
    fn limit_buy_price_quantizes_down() {
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Limit,
            Direction::Buy,
            dec!(0.01),
            Some(dec!(10000.009)),
        )
        .unwrap();
        let bal = balances(&[("USDT", dec!(10000))]);
        let validated = validate(&order, &rules(), &bal, &prices()).unwrap();
        assert_eq!(validated.price, Some(dec!(10000.00)));
    }

    #[test]
    fn rejects_price_outside_allowed_range() {
        let mut tight_rules = rules();
        tight_rules.max_price = dec!(5000);
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Limit,
            Direction::Sell,
            dec!(1),
            Some(dec!(10000)),
        )
        .unwrap();
        let bal = balances(&[("BTC", dec!(1))]);
        assert!(validate(&order, &tight_rules, &bal, &prices()).is_none());
    }

    #[test]
    fn validate_is_idempotent_once_accepted() {
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Market,
            Direction::Sell,
            dec!(0.5),
            None,
        )
        .unwrap();
        let bal = balances(&[("BTC", dec!(1))]);
        let once = validate(&order, &rules(), &bal, &prices()).unwrap();
        let twice = validate(&once, &rules(), &bal, &prices()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn clips_to_max_size() {
        let mut tight_rules = rules();
        tight_rules.max_size = dec!(0.5);
        let order = Order::new(
            Pair::new("BTC", "USDT"),
            OrderType::Market,
            Direction::Sell,
            dec!(2),
            None,
        )
        .unwrap();
        let bal = balances(&[("BTC", dec!(10))]);
        let validated = validate(&order, &tight_rules, &bal, &prices()).unwrap();
        assert_eq!(validated.quantity, dec!(0.5));
    }
}
