//! Weight & portfolio math: resources -> value-weighted weights, fee
//! composition, spread-as-fee.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rustc_hash::FxHashMap;

use crate::error::{CoreError, Result};
use crate::market::{Asset, OrderBook};

/// `weights(balances, prices) = { a: balances[a] * prices[a] / portfolio_value }`
/// for assets present in both maps. Errors if the resulting portfolio value
/// is zero.
pub fn weights(
    balances: &FxHashMap<Asset, Decimal>,
    prices: &FxHashMap<Asset, Decimal>,
) -> Result<FxHashMap<Asset, Decimal>> {
    let value = portfolio_value(balances, prices);
    if value == Decimal::ZERO {
        return Err(CoreError::ZeroPortfolioValue);
    }
    Ok(balances
        .iter()
        .filter_map(|(asset, qty)| {
            prices
                .get(asset)
                .map(|price| (asset.clone(), *qty * *price / value))
        })
        .collect())
}

/// `portfolio_value(balances, prices) = sum(balances[a] * prices.get(a, 0))`.
pub fn portfolio_value(
    balances: &FxHashMap<Asset, Decimal>,
    prices: &FxHashMap<Asset, Decimal>,
) -> Decimal {
    balances
        .iter()
        .map(|(asset, qty)| *qty * prices.get(asset).copied().unwrap_or(Decimal::ZERO))
        .sum()
}

/// `spread_to_fee(ob) = 1 - sqrt(wall_bid / wall_ask)`: the one-way cost of
/// crossing the spread once, modeled as an implicit fee.
pub fn spread_to_fee(ob: &OrderBook) -> Result<Decimal> {
    let bid = ob
        .wall_bid
        .ok_or_else(|| CoreError::MissingWall(ob.pair.clone(), "bid"))?;
    let ask = ob
        .wall_ask
        .ok_or_else(|| CoreError::MissingWall(ob.pair.clone(), "ask"))?;
    Ok(Decimal::ONE - (bid / ask).sqrt().unwrap_or(Decimal::ONE))
}

/// `total_fee(fees...) = 1 - prod(1 - f_i)`: composes independent
/// multiplicative cost factors.
pub fn total_fee(fees: &[Decimal]) -> Decimal {
    let retained: Decimal = fees.iter().map(|f| Decimal::ONE - *f).product();
    Decimal::ONE - retained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Pair;
    use rust_decimal_macros::dec;

    fn map(pairs: &[(&str, Decimal)]) -> FxHashMap<Asset, Decimal> {
        pairs
            .iter()
            .map(|(a, v)| (Asset::new(*a), *v))
            .collect()
    }

    #[test]
    fn weights_from_resources_matches_reference_vector() {
        let resources = map(&[
            ("BTC", dec!(1)),
            ("USDT", dec!(1000)),
            ("ETH", dec!(10)),
            ("LTC", dec!(50)),
        ]);
        let prices = map(&[
            ("BTC", dec!(10000)),
            ("USDT", dec!(1)),
            ("ETH", dec!(1000)),
            ("LTC", dec!(80)),
        ]);
        let w = weights(&resources, &prices).unwrap();
        assert_eq!(w[&Asset::new("BTC")], dec!(0.4));
        assert_eq!(w[&Asset::new("USDT")], dec!(0.04));
        assert_eq!(w[&Asset::new("ETH")], dec!(0.4));
        assert_eq!(w[&Asset::new("LTC")], dec!(0.16));
    }

    #[test]
    fn portfolio_value_ignores_assets_without_a_price() {
        let resources = map(&[("BTC", dec!(1)), ("XYZ", dec!(100))]);
        let prices = map(&[("BTC", dec!(10000))]);
        assert_eq!(portfolio_value(&resources, &prices), dec!(10000));
    }

    #[test]
    fn zero_portfolio_value_is_an_error() {
        let resources = map(&[("BTC", dec!(0))]);
        let prices = map(&[("BTC", dec!(10000))]);
        assert!(weights(&resources, &prices).is_err());
    }

    #[test]
    fn spread_to_fee_of_a_tight_book_is_small() {
        let ob = OrderBook::new(Pair::new("BTC", "USDT"), dec!(9999), dec!(10001));
        let fee = spread_to_fee(&ob).unwrap();
        assert!(fee > Decimal::ZERO && fee < dec!(0.001));
    }

    #[test]
    fn total_fee_composes_multiplicatively() {
        // 1 - (1-0.1)(1-0.2) = 1 - 0.72 = 0.28
        assert_eq!(total_fee(&[dec!(0.1), dec!(0.2)]), dec!(0.28));
    }

    #[test]
    fn total_fee_of_no_fees_is_zero() {
        assert_eq!(total_fee(&[]), Decimal::ZERO);
    }
}
