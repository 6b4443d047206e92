// src/adapter/tradovate.rs
//
// Tradovate-family adapter (§4.2): backs TAKEPROFIT_TRADER and
// MYFUNDED_FUTURES accounts on the Tradovate platform.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use super::base::{GenericAdapter, Normalizer, PlatformWiring};
use super::discovery::DiscoveryCache;
use super::model::{
    AccountSnapshot, Firm, NormalizedExecution, NormalizedPosition, OrderKind, Platform,
    TradeSide, TradeStatus,
};
use super::Adapter;

#[derive(Clone, Default)]
struct TradovateNormalizer;

impl TradovateNormalizer {
    fn side(raw: &str) -> TradeSide {
        if raw.eq_ignore_ascii_case("Buy") {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        }
    }

    fn status(raw: i64) -> TradeStatus {
        match raw {
            0 => TradeStatus::Pending,
            1 => TradeStatus::Filled,
            2 => TradeStatus::PartiallyFilled,
            3 => TradeStatus::Cancelled,
            _ => TradeStatus::Rejected,
        }
    }
}

impl Normalizer for TradovateNormalizer {
    fn parse_execution(&self, raw: &Value) -> Option<NormalizedExecution> {
        if raw.get("e").and_then(Value::as_str) != Some("fill") {
            return None;
        }
        let d = raw.get("d")?;
        Some(NormalizedExecution {
            external_order_id: d.get("orderId")?.as_i64()?.to_string(),
            external_trade_id: d.get("id").and_then(Value::as_i64).map(|v| v.to_string()),
            symbol: d.get("contractName")?.as_str()?.to_string(),
            side: Self::side(d.get("action")?.as_str()?),
            order_kind: match d.get("orderType").and_then(Value::as_str) {
                Some("Limit") => OrderKind::Limit,
                Some("Stop") => OrderKind::Stop,
                _ => OrderKind::Market,
            },
            quantity: d.get("qty")?.as_i64()?,
            price: d.get("price").and_then(Value::as_f64),
            stop_loss: None,
            take_profit: None,
            status: Self::status(d.get("ordStatus").and_then(Value::as_i64).unwrap_or(1)),
            realised_pnl: d.get("pnl").and_then(Value::as_f64),
            filled_at: None,
            is_modification: false,
        })
    }

    fn parse_position(&self, raw: &Value) -> Option<NormalizedPosition> {
        if raw.get("e").and_then(Value::as_str) != Some("position") {
            return None;
        }
        let d = raw.get("d")?;
        Some(NormalizedPosition {
            symbol: d.get("contractName")?.as_str()?.to_string(),
            side: Self::side(d.get("action").and_then(Value::as_str).unwrap_or("Buy")),
            quantity: d.get("netPos")?.as_i64()?,
            average_price: d.get("netPrice").and_then(Value::as_f64),
        })
    }

    fn parse_account(&self, raw: &Value) -> Option<AccountSnapshot> {
        let d = raw.get("d").unwrap_or(raw);
        Some(AccountSnapshot {
            account_id: d.get("accountId")?.as_i64()?.to_string(),
            balance: d.get("cashBalance")?.as_f64()?,
            equity: d.get("netLiquidatingValue").and_then(Value::as_f64).unwrap_or_default(),
            margin_used: d.get("initialMargin").and_then(Value::as_f64).unwrap_or_default(),
            positions: Vec::new(),
        })
    }

    fn subscribe_frame(&self, account_number: &str) -> Value {
        json!({ "url": "user/syncrequest", "body": { "accountId": account_number } })
    }
}

fn wiring(firm: Firm) -> PlatformWiring {
    PlatformWiring {
        firm,
        platform: Platform::Tradovate,
        default_base_urls: vec!["https://live.tradovateapi.example.com/v1".to_string()],
        ws_url_template: Some("wss://live.tradovateapi.example.com/v1/websocket".to_string()),
        account_path: "/account/list",
        trades_path: "/fill/list",
        order_path: "/order/placeorder",
        cancel_path: "/order/cancelorder",
        modify_path: "/order/modifyorder",
        close_path: "/position/closeposition",
    }
}

/// Builds a Tradovate-family adapter for the given firm.
pub fn new_adapter(
    firm: Firm,
    polling_interval: Duration,
    reconnect_cap: Duration,
    enable_discovery: bool,
    discovery_cache: Arc<DiscoveryCache>,
) -> Arc<dyn Adapter> {
    Arc::new(GenericAdapter::new(
        wiring(firm),
        TradovateNormalizer,
        polling_interval,
        reconnect_cap,
        enable_discovery,
        discovery_cache,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fill_envelope() {
        let normalizer = TradovateNormalizer;
        let raw = json!({
            "e": "fill",
            "d": {
                "orderId": 555,
                "id": 777,
                "contractName": "ESZ5",
                "action": "Buy",
                "orderType": "Market",
                "qty": 1,
                "price": 5800.25,
                "ordStatus": 1,
            }
        });
        let exec = normalizer.parse_execution(&raw).expect("parses");
        assert_eq!(exec.side, TradeSide::Buy);
        assert_eq!(exec.status, TradeStatus::Filled);
        assert_eq!(exec.external_order_id, "555");
    }

    #[test]
    fn sell_action_normalizes_to_sell_side() {
        let normalizer = TradovateNormalizer;
        assert_eq!(TradovateNormalizer::side("Sell"), TradeSide::Sell);
    }
}
