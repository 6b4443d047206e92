// src/adapter/mock.rs
//
// An in-memory `Adapter` used two ways: as the registry's fallback for
// firm/platform combinations with no real integration yet (§4.2, TOPSTEPX
// under RITHMIC), and as the harness the engine's own tests drive instead of
// a live brokerage (§9 "driven by an in-memory mock Adapter").

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::model::{
    AccountSnapshot, ConnectConfig, Firm, NormalizedExecution, NormalizedPosition, OrderUpdate,
    OrderKind, Platform, TradeExecution, TradeOrder, TradeSide, TradeStatus,
};
use super::{Adapter, Disposer, PositionCallback, TradeCallback};
use crate::utils::errors::AdapterError;

struct CallbackRegistry<T> {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, T>>,
}

impl<T: Clone> CallbackRegistry<T> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    fn register(self: &Arc<Self>, cb: T) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.callbacks.lock().unwrap().insert(id, cb);
        id
    }

    fn remove(&self, id: u64) {
        self.callbacks.lock().unwrap().remove(&id);
    }

    fn snapshot(&self) -> Vec<T> {
        self.callbacks.lock().unwrap().values().cloned().collect()
    }

    fn clear(&self) {
        self.callbacks.lock().unwrap().clear();
    }
}

/// A fully in-memory adapter. `place_order` fills immediately at the
/// requested price (or 0.0 for market orders with no price hint) and fans the
/// resulting execution out to registered trade callbacks, the same as a real
/// adapter's push stream would.
pub struct MockAdapter {
    firm: Firm,
    platform: Platform,
    connected: AtomicBool,
    order_seq: AtomicU64,
    account: Mutex<AccountSnapshot>,
    trade_callbacks: Arc<CallbackRegistry<TradeCallback>>,
    position_callbacks: Arc<CallbackRegistry<PositionCallback>>,
}

impl MockAdapter {
    pub fn new(firm: Firm, platform: Platform) -> Self {
        Self {
            firm,
            platform,
            connected: AtomicBool::new(false),
            order_seq: AtomicU64::new(1),
            account: Mutex::new(AccountSnapshot {
                account_id: "mock-account".into(),
                balance: 50_000.0,
                equity: 50_000.0,
                margin_used: 0.0,
                positions: Vec::new(),
            }),
            trade_callbacks: Arc::new(CallbackRegistry::new()),
            position_callbacks: Arc::new(CallbackRegistry::new()),
        }
    }

    /// Test/supervision hook: seeds the balance the mock reports from
    /// `getAccountInfo`, used to exercise scaling math against a known balance.
    pub fn set_balance(&self, balance: f64) {
        let mut acct = self.account.lock().unwrap();
        acct.balance = balance;
        acct.equity = balance;
    }

    /// Test hook: pushes a synthetic execution to every registered trade
    /// callback, simulating a master account's push stream.
    pub fn push_execution(&self, exec: NormalizedExecution) {
        for cb in self.trade_callbacks.snapshot() {
            cb(exec.clone());
        }
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn identity(&self) -> (Firm, Platform) {
        (self.firm, self.platform)
    }

    async fn connect(&self, _cfg: ConnectConfig) -> Result<(), AdapterError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.trade_callbacks.clear();
        self.position_callbacks.clear();
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn place_order(&self, order: &TradeOrder) -> Result<TradeExecution, AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        let id = self.order_seq.fetch_add(1, Ordering::SeqCst);
        let filled_price = order.price.unwrap_or(0.0);
        let exec = TradeExecution {
            external_order_id: format!("mock-order-{id}"),
            external_trade_id: Some(format!("mock-trade-{id}")),
            status: TradeStatus::Filled,
            filled_price: Some(filled_price),
            filled_quantity: order.quantity,
        };
        self.push_execution(NormalizedExecution {
            external_order_id: exec.external_order_id.clone(),
            external_trade_id: exec.external_trade_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            order_kind: order.order_kind,
            quantity: order.quantity,
            price: Some(filled_price),
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
            status: TradeStatus::Filled,
            realised_pnl: None,
            filled_at: Some(chrono::Utc::now()),
            is_modification: false,
        });
        Ok(exec)
    }

    async fn cancel_order(&self, _external_order_id: &str) -> Result<(), AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        Ok(())
    }

    async fn modify_order(
        &self,
        _external_order_id: &str,
        _updates: OrderUpdate,
    ) -> Result<(), AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        Ok(())
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: Option<TradeSide>,
    ) -> Result<(), AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        let closing_side = side.unwrap_or(TradeSide::Sell);
        self.push_execution(NormalizedExecution {
            external_order_id: format!("mock-close-{}", self.order_seq.fetch_add(1, Ordering::SeqCst)),
            external_trade_id: None,
            symbol: symbol.to_string(),
            side: closing_side,
            order_kind: OrderKind::Market,
            quantity: 0,
            price: None,
            stop_loss: None,
            take_profit: None,
            status: TradeStatus::Filled,
            realised_pnl: None,
            filled_at: Some(chrono::Utc::now()),
            is_modification: false,
        });
        Ok(())
    }

    async fn get_account_info(&self) -> Result<AccountSnapshot, AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        Ok(self.account.lock().unwrap().clone())
    }

    fn on_trade_update(&self, cb: TradeCallback) -> Disposer {
        let id = self.trade_callbacks.register(cb);
        let registry = self.trade_callbacks.clone();
        Box::new(move || registry.remove(id))
    }

    fn on_position_update(&self, cb: PositionCallback) -> Disposer {
        let id = self.position_callbacks.register(cb);
        let registry = self.position_callbacks.clone();
        Box::new(move || registry.remove(id))
    }

    fn unsubscribe(&self) {
        self.trade_callbacks.clear();
        self.position_callbacks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn place_order_fans_out_to_trade_callbacks() {
        let adapter = MockAdapter::new(Firm::TopstepX, Platform::Rithmic);
        adapter.connect(ConnectConfig::default()).await.unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        let _disposer = adapter.on_trade_update(Arc::new(move |_exec| {
            seen2.fetch_add(1, Ordering::SeqCst);
        }));

        adapter
            .place_order(&TradeOrder {
                symbol: "MNQ".into(),
                side: TradeSide::Buy,
                order_kind: OrderKind::Market,
                quantity: 2,
                price: None,
                stop_loss: None,
                take_profit: None,
            })
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disconnect_clears_callbacks_and_blocks_orders() {
        let adapter = MockAdapter::new(Firm::TopstepX, Platform::Rithmic);
        adapter.connect(ConnectConfig::default()).await.unwrap();
        adapter.disconnect().await;

        let result = adapter
            .place_order(&TradeOrder {
                symbol: "MNQ".into(),
                side: TradeSide::Buy,
                order_kind: OrderKind::Market,
                quantity: 1,
                price: None,
                stop_loss: None,
                take_profit: None,
            })
            .await;
        assert!(matches!(result, Err(AdapterError::NotConnected)));
    }

    #[tokio::test]
    async fn disposer_unregisters_callback() {
        let adapter = MockAdapter::new(Firm::TopstepX, Platform::Rithmic);
        adapter.connect(ConnectConfig::default()).await.unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        let disposer = adapter.on_trade_update(Arc::new(move |_exec| {
            seen2.fetch_add(1, Ordering::SeqCst);
        }));
        disposer();

        adapter
            .place_order(&TradeOrder {
                symbol: "MNQ".into(),
                side: TradeSide::Sell,
                order_kind: OrderKind::Market,
                quantity: 1,
                price: None,
                stop_loss: None,
                take_profit: None,
            })
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }
}
