//! Tests for Binance API response parsing and request signing -- no live
//! connection needed.

#[cfg(feature = "binance")]
mod binance_tests {
    use rebalance_exchange::binance::auth;
    use rebalance_exchange::binance::types::{AccountInfo, BookTicker, ExchangeInfo, OrderResponse};
    use rust_decimal_macros::dec;

    // ========================================================================
    // HMAC-SHA256 signing
    // ========================================================================

    #[test]
    fn sign_binance_docs_example() {
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC\
                     &quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let sig = auth::sign(query, secret);
        assert_eq!(
            sig,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn sign_empty_query() {
        let sig = auth::sign("", "secret");
        assert!(!sig.is_empty(), "empty query should still produce a signature");
        assert_eq!(sig.len(), 64, "SHA256 hex is always 64 chars");
    }

    #[test]
    fn sign_deterministic() {
        let a = auth::sign("foo=bar", "key");
        let b = auth::sign("foo=bar", "key");
        assert_eq!(a, b, "same input must produce same signature");
    }

    #[test]
    fn sign_different_keys_differ() {
        let a = auth::sign("foo=bar", "key1");
        let b = auth::sign("foo=bar", "key2");
        assert_ne!(a, b, "different keys must produce different signatures");
    }

    // ========================================================================
    // AccountInfo parsing
    // ========================================================================

    #[test]
    fn parse_account_info_full() {
        let json = r#"{
            "balances": [
                { "asset": "BTC", "free": "1.00000000", "locked": "0.50000000" },
                { "asset": "USDT", "free": "10000.00", "locked": "0.00" }
            ],
            "canTrade": true
        }"#;

        let info: AccountInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.balances.len(), 2);
        assert!(info.can_trade);
        assert_eq!(info.balances[0].asset, "BTC");
        assert_eq!(info.balances[0].free, dec!(1));
        assert_eq!(info.balances[0].locked, dec!(0.5));
        assert_eq!(info.balances[1].asset, "USDT");
    }

    #[test]
    fn parse_account_info_empty_balances() {
        let json = r#"{ "balances": [] }"#;
        let info: AccountInfo = serde_json::from_str(json).unwrap();
        assert!(info.balances.is_empty());
        assert!(!info.can_trade); // defaults to false
    }

    #[test]
    fn parse_account_info_extra_fields_ignored() {
        let json = r#"{
            "makerCommission": 15,
            "takerCommission": 15,
            "balances": [],
            "canTrade": true,
            "permissions": ["SPOT"]
        }"#;

        let info: AccountInfo = serde_json::from_str(json).unwrap();
        assert!(info.can_trade);
    }

    // ========================================================================
    // OrderResponse parsing
    // ========================================================================

    #[test]
    fn parse_order_response_filled_with_fills() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "orderId": 28,
            "status": "FILLED",
            "side": "SELL",
            "origQty": "10.00000000",
            "executedQty": "10.00000000",
            "cummulativeQuoteQty": "100000.00",
            "fills": [
                { "price": "10000.00", "qty": "6.0", "commission": "0.006", "commissionAsset": "USDT" },
                { "price": "10000.00", "qty": "4.0", "commission": "0.004", "commissionAsset": "USDT" }
            ]
        }"#;

        let resp: OrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.symbol, "BTCUSDT");
        assert_eq!(resp.order_id, 28);
        assert_eq!(resp.status, "FILLED");
        assert_eq!(resp.executed_qty, dec!(10));
        assert_eq!(resp.fills.len(), 2);
        assert_eq!(resp.fills[0].commission_asset, "USDT");
    }

    #[test]
    fn parse_order_response_new_has_no_fills() {
        let json = r#"{
            "symbol": "ETHUSDT",
            "orderId": 123456,
            "status": "NEW",
            "side": "BUY",
            "origQty": "2.0",
            "executedQty": "0.00000000"
        }"#;

        let resp: OrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, "NEW");
        assert_eq!(resp.executed_qty, Default::default());
        assert!(resp.fills.is_empty());
    }

    // ========================================================================
    // BookTicker parsing
    // ========================================================================

    #[test]
    fn parse_book_ticker() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "bidPrice": "43250.50",
            "bidQty": "1.234",
            "askPrice": "43251.00",
            "askQty": "0.567"
        }"#;

        let ticker: BookTicker = serde_json::from_str(json).unwrap();
        assert_eq!(ticker.symbol, "BTCUSDT");
        assert_eq!(ticker.bid_price, dec!(43250.50));
        assert_eq!(ticker.ask_price, dec!(43251.00));
    }

    // ========================================================================
    // ExchangeInfo / filter parsing
    // ========================================================================

    #[test]
    fn parse_exchange_info_with_filters() {
        let json = r#"{
            "symbols": [
                {
                    "symbol": "BTCUSDT",
                    "baseAsset": "BTC",
                    "quoteAsset": "USDT",
                    "filters": [
                        { "filterType": "LOT_SIZE", "minQty": "0.00001", "maxQty": "9000", "stepSize": "0.00001" },
                        { "filterType": "PRICE_FILTER", "minPrice": "0.01", "maxPrice": "1000000", "tickSize": "0.01" },
                        { "filterType": "NOTIONAL", "minNotional": "10" },
                        { "filterType": "ICEBERG_PARTS" }
                    ]
                }
            ]
        }"#;

        let info: ExchangeInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.symbols.len(), 1);
        assert_eq!(info.symbols[0].base_asset, "BTC");
        assert_eq!(info.symbols[0].quote_asset, "USDT");
        assert_eq!(info.symbols[0].filters.len(), 4);
    }

    // ========================================================================
    // Error cases -- malformed JSON
    // ========================================================================

    #[test]
    fn reject_missing_required_fields() {
        let json = r#"{ "canTrade": true }"#;
        assert!(serde_json::from_str::<AccountInfo>(json).is_err());
    }

    #[test]
    fn reject_wrong_type_order_id() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "orderId": "not_a_number",
            "status": "NEW",
            "side": "BUY",
            "origQty": "1.0",
            "executedQty": "0.0"
        }"#;
        assert!(serde_json::from_str::<OrderResponse>(json).is_err());
    }

    #[test]
    fn reject_empty_json() {
        assert!(serde_json::from_str::<AccountInfo>("{}").is_err());
        assert!(serde_json::from_str::<OrderResponse>("{}").is_err());
        assert!(serde_json::from_str::<BookTicker>("{}").is_err());
    }
}
