//! Market data model: assets, pairs, order books, and exchange rules.

use std::fmt;

use rust_decimal::Decimal;

use crate::error::{CoreError, Result};

/// An opaque currency code, e.g. `"BTC"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Asset(pub String);

impl Asset {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Asset {
    fn from(s: &str) -> Self {
        Asset::new(s)
    }
}

/// An ordered `(commodity, base)` trading pair, e.g. `BTC_USDT` means
/// commodity=BTC priced in USDT.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pair {
    pub commodity: Asset,
    pub base: Asset,
}

impl Pair {
    pub fn new(commodity: impl Into<Asset>, base: impl Into<Asset>) -> Self {
        Self {
            commodity: commodity.into(),
            base: base.into(),
        }
    }

    /// Canonical `COMMODITY_BASE` form.
    pub fn canonical(&self) -> String {
        format!("{}_{}", self.commodity, self.base)
    }

    pub fn reversed(&self) -> Pair {
        Pair::new(self.base.clone(), self.commodity.clone())
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Trade direction relative to the pair's commodity.
///
/// `Sell` exchanges commodity → base; `Buy` exchanges base → commodity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// Top-of-book snapshot for one pair: best bid and best ask.
///
/// Invariant: `0 < wall_bid <= wall_ask`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderBook {
    pub pair: Pair,
    pub wall_bid: Option<Decimal>,
    pub wall_ask: Option<Decimal>,
}

impl OrderBook {
    /// Construct from an explicit bid/ask record.
    pub fn new(pair: Pair, wall_bid: Decimal, wall_ask: Decimal) -> Self {
        Self {
            pair,
            wall_bid: Some(wall_bid),
            wall_ask: Some(wall_ask),
        }
    }

    /// Construct from a single scalar: `bid = ask = scalar`.
    pub fn from_scalar(pair: Pair, scalar: Decimal) -> Self {
        Self::new(pair, scalar, scalar)
    }

    /// Construct from a two-element list, assigning `min -> bid`, `max -> ask`
    /// regardless of input order.
    pub fn from_pair_list(pair: Pair, a: Decimal, b: Decimal) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self::new(pair, lo, hi)
    }

    /// Arithmetic mean of wall bid and ask. Fails if either wall is unknown.
    pub fn mid(&self) -> Result<Decimal> {
        let bid = self
            .wall_bid
            .ok_or_else(|| CoreError::MissingWall(self.pair.clone(), "bid"))?;
        let ask = self
            .wall_ask
            .ok_or_else(|| CoreError::MissingWall(self.pair.clone(), "ask"))?;
        Ok((bid + ask) / Decimal::from(2))
    }
}

/// Per-pair exchange trading rules.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairRules {
    pub min_size: Decimal,
    pub max_size: Decimal,
    pub size_step: Decimal,
    pub price_step: Decimal,
    pub min_notional: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pair_canonical_form() {
        let p = Pair::new("BTC", "USDT");
        assert_eq!(p.canonical(), "BTC_USDT");
        assert_eq!(format!("{p}"), "BTC_USDT");
    }

    #[test]
    fn pair_reversed_swaps_commodity_and_base() {
        let p = Pair::new("BTC", "USDT");
        let r = p.reversed();
        assert_eq!(r.commodity, Asset::new("USDT"));
        assert_eq!(r.base, Asset::new("BTC"));
    }

    #[test]
    fn orderbook_from_scalar_has_equal_walls() {
        let ob = OrderBook::from_scalar(Pair::new("BTC", "USDT"), dec!(10000));
        assert_eq!(ob.mid().unwrap(), dec!(10000));
    }

    #[test]
    fn orderbook_from_pair_list_sorts_regardless_of_order() {
        let a = OrderBook::from_pair_list(Pair::new("BTC", "USDT"), dec!(15000), dec!(5000));
        let b = OrderBook::from_pair_list(Pair::new("BTC", "USDT"), dec!(5000), dec!(15000));
        assert_eq!(a, b);
        assert_eq!(a.wall_bid, Some(dec!(5000)));
        assert_eq!(a.wall_ask, Some(dec!(15000)));
    }

    #[test]
    fn mid_is_arithmetic_mean() {
        let ob = OrderBook::new(Pair::new("BTC", "USDT"), dec!(100), dec!(200));
        assert_eq!(ob.mid().unwrap(), dec!(150));
    }

    #[test]
    fn mid_fails_on_missing_wall() {
        let ob = OrderBook {
            pair: Pair::new("BTC", "USDT"),
            wall_bid: None,
            wall_ask: Some(dec!(100)),
        };
        assert!(ob.mid().is_err());
    }

    #[test]
    fn direction_opposite_is_involution() {
        assert_eq!(Direction::Buy.opposite(), Direction::Sell);
        assert_eq!(Direction::Sell.opposite().opposite(), Direction::Sell);
    }
}
