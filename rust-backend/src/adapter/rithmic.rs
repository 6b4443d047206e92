// src/adapter/rithmic.rs
//
// Rithmic-family adapter (§4.2): backs TAKEPROFIT_TRADER, MYFUNDED_FUTURES,
// ALPHA_FUTURES and TRADEFY accounts, and is the fallback transport for
// TOPSTEPX until a dedicated integration exists. Wraps `GenericAdapter` with
// Rithmic's wire shapes; the connection-lifecycle plumbing itself lives in
// `super::base`/`super::transport`.

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
struct RithmicNormalizer;

impl RithmicNormalizer {
    fn side(raw: &str) -> TradeSide {
        match raw.to_ascii_uppercase().as_str() {
            "B" | "BUY" | "LONG" => TradeSide::Buy,
            _ => TradeSide::Sell,
        }
    }

    fn status(raw: &str) -> TradeStatus {
        match raw.to_ascii_lowercase().as_str() {
            "complete" | "filled" => TradeStatus::Filled,
            "partial" | "partially_filled" => TradeStatus::PartiallyFilled,
            "cancelled" | "canceled" => TradeStatus::Cancelled,
            "rejected" => TradeStatus::Rejected,
            _ => TradeStatus::Pending,
        }
    }
}

impl Normalizer for RithmicNormalizer {
    fn parse_execution(&self, raw: &Value) -> Option<NormalizedExecution> {
        if raw.get("type").and_then(Value::as_str) != Some("order_fill") {
            return None;
        }
        Some(NormalizedExecution {
            external_order_id: raw.get("orderId")?.as_str()?.to_string(),
            external_trade_id: raw.get("fillId").and_then(Value::as_str).map(str::to_string),
            symbol: raw.get("symbol")?.as_str()?.to_string(),
            side: Self::side(raw.get("side")?.as_str()?),
            order_kind: match raw.get("orderType").and_then(Value::as_str) {
                Some("LIMIT") => OrderKind::Limit,
                Some("STOP") => OrderKind::Stop,
                _ => OrderKind::Market,
            },
            quantity: raw.get("quantity")?.as_i64()?,
            price: raw.get("avgFillPrice").and_then(Value::as_f64),
            stop_loss: raw.get("stopLoss").and_then(Value::as_f64),
            take_profit: raw.get("takeProfit").and_then(Value::as_f64),
            status: Self::status(raw.get("status")?.as_str()?),
            realised_pnl: raw.get("realizedPnl").and_then(Value::as_f64),
            filled_at: None,
            is_modification: raw.get("isModification").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    fn parse_position(&self, raw: &Value) -> Option<NormalizedPosition> {
        if raw.get("type").and_then(Value::as_str) != Some("position_update") {
            return None;
        }
        Some(NormalizedPosition {
            symbol: raw.get("symbol")?.as_str()?.to_string(),
            side: Self::side(raw.get("side")?.as_str()?),
            quantity: raw.get("quantity")?.as_i64()?,
            average_price: raw.get("avgPrice").and_then(Value::as_f64),
        })
    }

    fn parse_account(&self, raw: &Value) -> Option<AccountSnapshot> {
        Some(AccountSnapshot {
            account_id: raw.get("accountId")?.as_str()?.to_string(),
            balance: raw.get("balance")?.as_f64()?,
            equity: raw.get("equity").and_then(Value::as_f64).unwrap_or_default(),
            margin_used: raw.get("marginUsed").and_then(Value::as_f64).unwrap_or_default(),
            positions: Vec::new(),
        })
    }

    fn subscribe_frame(&self, account_number: &str) -> Value {
        json!({ "op": "subscribe", "account": account_number, "channels": ["trades", "positions", "account"] })
    }
}

fn wiring(firm: Firm) -> PlatformWiring {
    PlatformWiring {
        firm,
        platform: Platform::Rithmic,
        default_base_urls: vec![
            "https://rithmic01.example.com".to_string(),
            "https://rithmic02.example.com".to_string(),
        ],
        ws_url_template: Some("wss://rithmic-stream.example.com/ws".to_string()),
        account_path: "/api/v1/account",
        trades_path: "/api/v1/trades",
        order_path: "/api/v1/orders",
        cancel_path: "/api/v1/orders/{id}/cancel",
        modify_path: "/api/v1/orders/{id}",
        close_path: "/api/v1/positions/close",
    }
}

/// Builds a Rithmic-family adapter for the given firm.
pub fn new_adapter(
    firm: Firm,
    polling_interval: Duration,
    reconnect_cap: Duration,
    enable_discovery: bool,
    discovery_cache: Arc<DiscoveryCache>,
) -> Arc<dyn Adapter> {
    Arc::new(GenericAdapter::new(
        wiring(firm),
        RithmicNormalizer,
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
    fn parses_order_fill_message() {
        let normalizer = RithmicNormalizer;
        let raw = json!({
            "type": "order_fill",
            "orderId": "ord-1",
            "fillId": "fill-1",
            "symbol": "MNQ",
            "side": "B",
            "orderType": "MARKET",
            "quantity": 2,
            "avgFillPrice": 18250.25,
            "status": "complete",
        });
        let exec = normalizer.parse_execution(&raw).expect("parses");
        assert_eq!(exec.side, TradeSide::Buy);
        assert_eq!(exec.status, TradeStatus::Filled);
        assert_eq!(exec.quantity, 2);
    }

    #[test]
    fn ignores_unrelated_message_types() {
        let normalizer = RithmicNormalizer;
        let raw = json!({ "type": "heartbeat" });
        assert!(normalizer.parse_execution(&raw).is_none());
    }
}
