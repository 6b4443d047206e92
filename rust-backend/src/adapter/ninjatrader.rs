// src/adapter/ninjatrader.rs
//
// NinjaTrader-family adapter (§4.2): backs TAKEPROFIT_TRADER and
// MYFUNDED_FUTURES accounts running against a locally-hosted NinjaTrader
// bridge. NinjaTrader exposes no push stream, so this is the one concrete
// adapter that always falls through `GenericAdapter`'s polling path
// (`ws_url_template: None`, §4.1.1.3).

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
struct NinjaTraderNormalizer;

impl NinjaTraderNormalizer {
    fn side(raw: &str) -> TradeSide {
        match raw {
            "Long" => TradeSide::Buy,
            _ => TradeSide::Sell,
        }
    }

    fn status(raw: &str) -> TradeStatus {
        match raw {
            "Working" => TradeStatus::Pending,
            "Filled" => TradeStatus::Filled,
            "PartFilled" => TradeStatus::PartiallyFilled,
            "Cancelled" => TradeStatus::Cancelled,
            "Rejected" => TradeStatus::Rejected,
            _ => TradeStatus::Pending,
        }
    }
}

impl Normalizer for NinjaTraderNormalizer {
    fn parse_execution(&self, raw: &Value) -> Option<NormalizedExecution> {
        Some(NormalizedExecution {
            external_order_id: raw.get("OrderId")?.as_str()?.to_string(),
            external_trade_id: raw.get("ExecutionId").and_then(Value::as_str).map(str::to_string),
            symbol: raw.get("Instrument")?.as_str()?.to_string(),
            side: Self::side(raw.get("MarketPosition")?.as_str()?),
            order_kind: match raw.get("OrderType").and_then(Value::as_str) {
                Some("Limit") => OrderKind::Limit,
                Some("StopMarket") | Some("StopLimit") => OrderKind::Stop,
                _ => OrderKind::Market,
            },
            quantity: raw.get("Quantity")?.as_i64()?,
            price: raw.get("AveragePrice").and_then(Value::as_f64),
            stop_loss: raw.get("StopPrice").and_then(Value::as_f64),
            take_profit: raw.get("LimitPrice").and_then(Value::as_f64),
            status: Self::status(raw.get("OrderState")?.as_str()?),
            realised_pnl: raw.get("RealizedPnL").and_then(Value::as_f64),
            filled_at: None,
            is_modification: false,
        })
    }

    fn parse_position(&self, raw: &Value) -> Option<NormalizedPosition> {
        Some(NormalizedPosition {
            symbol: raw.get("Instrument")?.as_str()?.to_string(),
            side: Self::side(raw.get("MarketPosition")?.as_str()?),
            quantity: raw.get("Quantity")?.as_i64()?,
            average_price: raw.get("AveragePrice").and_then(Value::as_f64),
        })
    }

    fn parse_account(&self, raw: &Value) -> Option<AccountSnapshot> {
        Some(AccountSnapshot {
            account_id: raw.get("AccountName")?.as_str()?.to_string(),
            balance: raw.get("CashValue")?.as_f64()?,
            equity: raw.get("NetLiquidation").and_then(Value::as_f64).unwrap_or_default(),
            margin_used: raw.get("InitialMargin").and_then(Value::as_f64).unwrap_or_default(),
            positions: Vec::new(),
        })
    }

    /// Never sent over the wire (no push stream); kept so the trait is
    /// uniform across platform families.
    fn subscribe_frame(&self, account_number: &str) -> Value {
        json!({ "account": account_number })
    }
}

fn wiring(firm: Firm) -> PlatformWiring {
    PlatformWiring {
        firm,
        platform: Platform::NinjaTrader,
        default_base_urls: vec!["http://127.0.0.1:8088".to_string()],
        ws_url_template: None,
        account_path: "/accounts/current",
        trades_path: "/executions",
        order_path: "/orders",
        cancel_path: "/orders/{id}/cancel",
        modify_path: "/orders/{id}",
        close_path: "/positions/close",
    }
}

/// Builds a NinjaTrader-family adapter for the given firm.
pub fn new_adapter(
    firm: Firm,
    polling_interval: Duration,
    reconnect_cap: Duration,
    enable_discovery: bool,
    discovery_cache: Arc<DiscoveryCache>,
) -> Arc<dyn Adapter> {
    Arc::new(GenericAdapter::new(
        wiring(firm),
        NinjaTraderNormalizer,
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
    fn long_market_position_normalizes_to_buy() {
        assert_eq!(NinjaTraderNormalizer::side("Long"), TradeSide::Buy);
        assert_eq!(NinjaTraderNormalizer::side("Short"), TradeSide::Sell);
    }

    #[test]
    fn parses_execution_report() {
        let normalizer = NinjaTraderNormalizer;
        let raw = json!({
            "OrderId": "nt-1",
            "ExecutionId": "nt-exec-1",
            "Instrument": "NQ 12-26",
            "MarketPosition": "Long",
            "OrderType": "Market",
            "Quantity": 1,
            "AveragePrice": 21000.0,
            "OrderState": "Filled",
        });
        let exec = normalizer.parse_execution(&raw).expect("parses");
        assert_eq!(exec.status, TradeStatus::Filled);
        assert_eq!(exec.side, TradeSide::Buy);
    }
}
