// src/adapter/projectx.rs
//
// ProjectX adapter (§4.2): the primary, real integration for TOPSTEPX
// accounts. Pushes executions over a WS stream keyed by session token, same
// lifecycle as every other `GenericAdapter`-backed platform family.

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
struct ProjectXNormalizer;

impl ProjectXNormalizer {
    fn side(raw: &str) -> TradeSide {
        match raw.to_ascii_uppercase().as_str() {
            "BUY" | "BOT" => TradeSide::Buy,
            _ => TradeSide::Sell,
        }
    }

    fn status(raw: &str) -> TradeStatus {
        match raw {
            "1" => TradeStatus::Pending,
            "2" => TradeStatus::Filled,
            "3" => TradeStatus::PartiallyFilled,
            "4" => TradeStatus::Cancelled,
            "5" => TradeStatus::Rejected,
            _ => TradeStatus::Pending,
        }
    }
}

impl Normalizer for ProjectXNormalizer {
    fn parse_execution(&self, raw: &Value) -> Option<NormalizedExecution> {
        let event = raw.get("event").and_then(Value::as_str)?;
        if event != "fill" {
            return None;
        }
        let data = raw.get("data")?;
        Some(NormalizedExecution {
            external_order_id: data.get("orderId")?.as_str()?.to_string(),
            external_trade_id: data.get("tradeId").and_then(Value::as_str).map(str::to_string),
            symbol: data.get("contractId")?.as_str()?.to_string(),
            side: Self::side(data.get("side")?.as_str()?),
            order_kind: match data.get("type").and_then(Value::as_str) {
                Some("LIMIT") => OrderKind::Limit,
                Some("STOP") => OrderKind::Stop,
                _ => OrderKind::Market,
            },
            quantity: data.get("size")?.as_i64()?,
            price: data.get("fillPrice").and_then(Value::as_f64),
            stop_loss: None,
            take_profit: None,
            status: Self::status(data.get("statusCode")?.as_str().unwrap_or("2")),
            realised_pnl: data.get("profitAndLoss").and_then(Value::as_f64),
            filled_at: None,
            is_modification: false,
        })
    }

    fn parse_position(&self, raw: &Value) -> Option<NormalizedPosition> {
        if raw.get("event").and_then(Value::as_str) != Some("position") {
            return None;
        }
        let data = raw.get("data")?;
        Some(NormalizedPosition {
            symbol: data.get("contractId")?.as_str()?.to_string(),
            side: Self::side(data.get("side")?.as_str()?),
            quantity: data.get("size")?.as_i64()?,
            average_price: data.get("averagePrice").and_then(Value::as_f64),
        })
    }

    fn parse_account(&self, raw: &Value) -> Option<AccountSnapshot> {
        let data = raw.get("data").unwrap_or(raw);
        Some(AccountSnapshot {
            account_id: data.get("accountId")?.as_str()?.to_string(),
            balance: data.get("balance")?.as_f64()?,
            equity: data.get("equity").and_then(Value::as_f64).unwrap_or_default(),
            margin_used: data.get("marginUsed").and_then(Value::as_f64).unwrap_or_default(),
            positions: Vec::new(),
        })
    }

    fn subscribe_frame(&self, account_number: &str) -> Value {
        json!({ "action": "subscribe", "accountId": account_number, "topics": ["fill", "position", "account"] })
    }
}

fn wiring(firm: Firm) -> PlatformWiring {
    PlatformWiring {
        firm,
        platform: Platform::ProjectX,
        default_base_urls: vec!["https://api.projectx.example.com".to_string()],
        ws_url_template: Some("wss://stream.projectx.example.com/v1".to_string()),
        account_path: "/v1/accounts/me",
        trades_path: "/v1/trades",
        order_path: "/v1/orders",
        cancel_path: "/v1/orders/{id}",
        modify_path: "/v1/orders/{id}",
        close_path: "/v1/positions/close",
    }
}

/// Builds the ProjectX adapter for the given firm (TOPSTEPX in practice, §4.2).
pub fn new_adapter(
    firm: Firm,
    polling_interval: Duration,
    reconnect_cap: Duration,
    enable_discovery: bool,
    discovery_cache: Arc<DiscoveryCache>,
) -> Arc<dyn Adapter> {
    Arc::new(GenericAdapter::new(
        wiring(firm),
        ProjectXNormalizer,
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
    fn parses_fill_event_envelope() {
        let normalizer = ProjectXNormalizer;
        let raw = json!({
            "event": "fill",
            "data": {
                "orderId": "o-9",
                "tradeId": "t-9",
                "contractId": "CON.F.US.MNQ",
                "side": "BUY",
                "type": "MARKET",
                "size": 3,
                "fillPrice": 18300.5,
                "statusCode": "2",
            }
        });
        let exec = normalizer.parse_execution(&raw).expect("parses");
        assert_eq!(exec.side, TradeSide::Buy);
        assert_eq!(exec.status, TradeStatus::Filled);
    }

    #[test]
    fn non_fill_events_are_ignored() {
        let normalizer = ProjectXNormalizer;
        let raw = json!({ "event": "account", "data": {} });
        assert!(normalizer.parse_execution(&raw).is_none());
    }
}
