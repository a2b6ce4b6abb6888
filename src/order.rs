//! Concrete order representation.

use rust_decimal::Decimal;

use crate::error::{CoreError, Result};
use crate::market::{Direction, Pair};

/// Market or limit order type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderType {
    Market,
    Limit,
}

/// A concrete order on a real pair.
///
/// Invariant: `price` is `Some` iff `order_type == Limit`; `quantity > 0`.
/// After validation (§C7), `quantity` is a multiple of the pair's `size_step`
/// and, if present, `price` is a multiple of `price_step` within
/// `[min_price, max_price]`, and `quantity * price >= min_notional`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    pub pair: Pair,
    pub order_type: OrderType,
    pub direction: Direction,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

impl Order {
    pub fn new(
        pair: Pair,
        order_type: OrderType,
        direction: Direction,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> Result<Self> {
        let valid = match order_type {
            OrderType::Limit => price.is_some(),
            OrderType::Market => price.is_none(),
        };
        if !valid || quantity <= Decimal::ZERO {
            return Err(CoreError::MalformedOrder);
        }
        Ok(Self {
            pair,
            order_type,
            direction,
            quantity,
            price,
        })
    }
}
