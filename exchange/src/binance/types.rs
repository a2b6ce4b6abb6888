//! Binance-specific API response types.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Binance account balance entry.
#[derive(Debug, Deserialize)]
pub struct BalanceInfo {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Binance account info response (`GET /api/v3/account`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub balances: Vec<BalanceInfo>,
    #[serde(default)]
    pub can_trade: bool,
}

/// One entry of `exchangeInfo`'s per-symbol `filters` array. Binance encodes
/// these as a tagged union on `filterType`; only the fields relevant to a
/// given type are populated by the exchange, the rest are absent.
#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
#[allow(non_camel_case_types)]
pub enum SymbolFilter {
    LOT_SIZE {
        #[serde(rename = "minQty")]
        min_qty: Decimal,
        #[serde(rename = "maxQty")]
        max_qty: Decimal,
        #[serde(rename = "stepSize")]
        step_size: Decimal,
    },
    PRICE_FILTER {
        #[serde(rename = "minPrice")]
        min_price: Decimal,
        #[serde(rename = "maxPrice")]
        max_price: Decimal,
        #[serde(rename = "tickSize")]
        tick_size: Decimal,
    },
    #[serde(alias = "MIN_NOTIONAL")]
    NOTIONAL {
        #[serde(rename = "minNotional", alias = "notional")]
        min_notional: Decimal,
    },
    #[serde(other)]
    Other,
}

/// One tradeable symbol from `exchangeInfo`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// `GET /api/v3/exchangeInfo` response.
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

/// A single fill within an order response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
    pub commission_asset: String,
}

/// Binance order response (submit, query, and cancel share this shape).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: u64,
    pub status: String,
    pub side: String,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    #[serde(default)]
    pub cummulative_quote_qty: Decimal,
    #[serde(default)]
    pub fills: Vec<Fill>,
}

/// `GET /api/v3/ticker/bookTicker` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub symbol: String,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
}
