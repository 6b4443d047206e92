// src/adapter/base.rs
//
// `GenericAdapter` carries every piece of connection-lifecycle and callback
// plumbing a concrete adapter needs (§4.1.1, §9 "shared behaviour... belongs
// in a reusable helper consumed by each implementation"). Platform-specific
// adapters (`rithmic`, `projectx`, `tradovate`, `ninjatrader`) configure one
// of these with their own base-URL list, wire endpoints and a `Normalizer`
// that knows that platform's message shapes; they do not reimplement auth
// probing, reconnect backoff or the polling fallback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tungstenite::Message;

use super::discovery::{self, DiscoveryCache};
use super::model::{
    AccountSnapshot, ConnectConfig, Firm, NormalizedExecution, NormalizedPosition, OrderUpdate,
    Platform, TradeExecution, TradeOrder, TradeSide,
};
use super::transport::{self, MAX_RECONNECT_ATTEMPTS};
use super::{Adapter, Disposer, PositionCallback, TradeCallback};
use crate::utils::errors::AdapterError;

/// Platform-specific wiring a `GenericAdapter` needs. Concrete adapter
/// modules build one of these and normalise wire payloads through `Normalizer`.
pub trait Normalizer: Send + Sync + 'static {
    /// Parses one execution out of a stream/poll message. `None` for
    /// messages that aren't executions (unknown discriminators are ignored, §6).
    fn parse_execution(&self, raw: &Value) -> Option<NormalizedExecution>;
    fn parse_position(&self, raw: &Value) -> Option<NormalizedPosition>;
    fn parse_account(&self, raw: &Value) -> Option<AccountSnapshot>;
    /// The subscribe frame naming the account and {trades, positions, account} channels.
    fn subscribe_frame(&self, account_number: &str) -> Value;
}

#[derive(Clone)]
pub struct PlatformWiring {
    pub firm: Firm,
    pub platform: Platform,
    pub default_base_urls: Vec<String>,
    /// `None` means this platform family has no push stream; adapters for
    /// it always use the polling fallback.
    pub ws_url_template: Option<String>,
    pub account_path: &'static str,
    pub trades_path: &'static str,
    pub order_path: &'static str,
    pub cancel_path: &'static str,
    pub modify_path: &'static str,
    pub close_path: &'static str,
}

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

struct SessionState {
    connected: AtomicBool,
    session_token: Mutex<Option<String>>,
    base_url: Mutex<Option<String>>,
    reconnect_attempt: AtomicU32,
    stream_task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            session_token: Mutex::new(None),
            base_url: Mutex::new(None),
            reconnect_attempt: AtomicU32::new(0),
            stream_task: AsyncMutex::new(None),
        }
    }
}

pub struct GenericAdapter<N: Normalizer> {
    wiring: PlatformWiring,
    http: reqwest::Client,
    polling_interval: Duration,
    reconnect_cap: Duration,
    enable_discovery: bool,
    normalizer: Arc<N>,
    state: Arc<SessionState>,
    trade_callbacks: Arc<CallbackRegistry<TradeCallback>>,
    position_callbacks: Arc<CallbackRegistry<PositionCallback>>,
    discovery_cache: Arc<DiscoveryCache>,
}

impl<N: Normalizer> GenericAdapter<N> {
    pub fn new(
        wiring: PlatformWiring,
        normalizer: N,
        polling_interval: Duration,
        reconnect_cap: Duration,
        enable_discovery: bool,
        discovery_cache: Arc<DiscoveryCache>,
    ) -> Self {
        Self {
            wiring,
            http: reqwest::Client::new(),
            polling_interval,
            reconnect_cap,
            enable_discovery,
            normalizer: Arc::new(normalizer),
            state: Arc::new(SessionState::new()),
            trade_callbacks: Arc::new(CallbackRegistry::new()),
            position_callbacks: Arc::new(CallbackRegistry::new()),
            discovery_cache,
        }
    }

    fn candidates(&self, cfg: &ConnectConfig) -> Vec<String> {
        let overrides: Vec<String> = cfg.base_url_override.iter().cloned().collect();
        transport::candidate_base_urls(&overrides, &self.wiring.default_base_urls)
    }

    fn base_url(&self) -> Option<String> {
        self.state.base_url.lock().unwrap().clone()
    }

    fn session_token(&self) -> Option<String> {
        self.state.session_token.lock().unwrap().clone()
    }

    async fn connect_impl(&self, cfg: ConnectConfig) -> Result<(), AdapterError> {
        let account_number = cfg.account_number.clone().unwrap_or_default();
        let candidates = self.candidates(&cfg);

        let (base_url, _account_path, trades_path, token) = if self.enable_discovery {
            let discovered = discovery::discover(
                &self.http,
                &candidates,
                &cfg,
                self.wiring.account_path,
                self.wiring.trades_path,
            )
            .await?;
            self.discovery_cache.put(&account_number, discovered.clone());
            (
                discovered.base_url,
                discovered.account_endpoint,
                discovered.trades_endpoint,
                discovered.session_token,
            )
        } else {
            let outcome = transport::probe_auth(&self.http, &candidates, &cfg).await?;
            (
                outcome.base_url,
                self.wiring.account_path.to_string(),
                self.wiring.trades_path.to_string(),
                outcome.session_token,
            )
        };

        *self.state.base_url.lock().unwrap() = Some(base_url);
        *self.state.session_token.lock().unwrap() = token;
        self.state.reconnect_attempt.store(0, Ordering::SeqCst);

        self.spawn_stream_or_poll(account_number, trades_path).await;
        Ok(())
    }

    async fn disconnect_impl(&self) {
        self.state.connected.store(false, Ordering::SeqCst);
        if let Some(handle) = self.state.stream_task.lock().await.take() {
            handle.abort();
        }
        *self.state.session_token.lock().unwrap() = None;
        self.trade_callbacks.clear();
        self.position_callbacks.clear();
    }

    async fn spawn_stream_or_poll(&self, account_number: String, trades_path: String) {
        let token = self.session_token();

        if let (Some(ws_template), Some(token)) = (self.wiring.ws_url_template.clone(), token) {
            self.spawn_ws_stream(ws_template, token, account_number).await;
        } else {
            let base_url = self.base_url().unwrap_or_default();
            self.spawn_polling(base_url, trades_path).await;
        }
    }

    async fn spawn_ws_stream(&self, ws_template: String, token: String, account_number: String) {
        let url = format!("{ws_template}?token={token}");
        let state = self.state.clone();
        let trade_cbs = self.trade_callbacks.clone();
        let position_cbs = self.position_callbacks.clone();
        let subscribe_frame = self.normalizer.subscribe_frame(&account_number);
        let reconnect_cap = self.reconnect_cap;
        let normalizer = self.normalizer.clone();

        state.connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            loop {
                match connect_async(&url).await {
                    Ok((mut ws, _)) => {
                        state.reconnect_attempt.store(0, Ordering::SeqCst);
                        if ws
                            .send(Message::Text(subscribe_frame.to_string().into()))
                            .await
                            .is_err()
                        {
                            tracing::warn!("adapter stream: failed to send subscribe frame");
                        }

                        while let Some(msg) = ws.next().await {
                            let Ok(msg) = msg else { break };
                            if let Message::Text(txt) = msg {
                                dispatch_message(&txt, &normalizer, &trade_cbs, &position_cbs);
                            }
                        }
                        tracing::warn!("adapter stream closed, will reconnect if still connected");
                    }
                    Err(e) => {
                        tracing::warn!("adapter stream connect failed: {e}");
                    }
                }

                if !state.connected.load(Ordering::SeqCst) {
                    break;
                }

                let attempt = state.reconnect_attempt.fetch_add(1, Ordering::SeqCst);
                if attempt >= MAX_RECONNECT_ATTEMPTS {
                    tracing::error!(
                        "adapter exhausted {MAX_RECONNECT_ATTEMPTS} reconnect attempts, giving up"
                    );
                    state.connected.store(false, Ordering::SeqCst);
                    break;
                }
                let delay = transport::reconnect_delay(attempt, reconnect_cap);
                tokio::time::sleep(delay).await;
            }
        });

        *self.state.stream_task.lock().await = Some(handle);
    }

    async fn spawn_polling(&self, base_url: String, trades_path: String) {
        let state = self.state.clone();
        let trade_cbs = self.trade_callbacks.clone();
        let http = self.http.clone();
        let token = self.session_token();
        let period = self.polling_interval;
        let normalizer = self.normalizer.clone();

        state.connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            let mut timer = transport::PollingTimer::new(period);
            loop {
                timer.tick().await;
                if !state.connected.load(Ordering::SeqCst) {
                    break;
                }
                let url = format!("{base_url}{trades_path}");
                let mut req = http.get(&url);
                if let Some(tok) = &token {
                    req = req.bearer_auth(tok);
                }
                match req.send().await {
                    Ok(resp) if resp.status().is_success() => {
                        if let Ok(Value::Array(items)) = resp.json::<Value>().await {
                            for item in items {
                                if let Some(exec) = normalizer.parse_execution(&item) {
                                    for cb in trade_cbs.snapshot() {
                                        cb(exec.clone());
                                    }
                                }
                            }
                        }
                    }
                    Ok(resp) => tracing::warn!("poll trades http {}", resp.status()),
                    Err(e) => tracing::warn!("poll trades failed: {e}"),
                }
            }
        });

        *self.state.stream_task.lock().await = Some(handle);
    }

    fn endpoint(&self, path: &'static str) -> String {
        let base = self.base_url().unwrap_or_default();
        format!("{base}{path}")
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session_token() {
            Some(tok) => builder.bearer_auth(tok),
            None => builder,
        }
    }
}

fn dispatch_message<N: Normalizer>(
    txt: &str,
    normalizer: &Arc<N>,
    trade_cbs: &Arc<CallbackRegistry<TradeCallback>>,
    position_cbs: &Arc<CallbackRegistry<PositionCallback>>,
) {
    let Ok(value) = serde_json::from_str::<Value>(txt) else {
        return;
    };
    if let Some(exec) = normalizer.parse_execution(&value) {
        for cb in trade_cbs.snapshot() {
            cb(exec.clone());
        }
        return;
    }
    if let Some(pos) = normalizer.parse_position(&value) {
        for cb in position_cbs.snapshot() {
            cb(pos.clone());
        }
    }
}

#[async_trait]
impl<N: Normalizer> Adapter for GenericAdapter<N> {
    fn identity(&self) -> (Firm, Platform) {
        (self.wiring.firm, self.wiring.platform)
    }

    async fn connect(&self, cfg: ConnectConfig) -> Result<(), AdapterError> {
        self.connect_impl(cfg).await
    }

    async fn disconnect(&self) {
        self.disconnect_impl().await
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn place_order(&self, order: &TradeOrder) -> Result<TradeExecution, AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        let url = self.endpoint(self.wiring.order_path);
        let resp = self
            .authed(self.http.post(&url).json(order))
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.into()))?;
        if !resp.status().is_success() {
            return Err(AdapterError::Auth(format!(
                "place_order rejected with status {}",
                resp.status()
            )));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AdapterError::Transport(e.into()))?;
        self.normalizer
            .parse_execution(&body)
            .map(|exec| TradeExecution {
                external_order_id: exec.external_order_id.clone(),
                external_trade_id: exec.external_trade_id.clone(),
                status: exec.status,
                filled_price: exec.price,
                filled_quantity: exec.quantity,
            })
            .ok_or_else(|| AdapterError::Auth("place_order response not parseable".into()))
    }

    async fn cancel_order(&self, external_order_id: &str) -> Result<(), AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        let url = format!(
            "{}{}",
            self.base_url().unwrap_or_default(),
            self.wiring.cancel_path.replace("{id}", external_order_id)
        );
        let resp = self
            .authed(self.http.post(&url))
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.into()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(AdapterError::Auth(format!(
                "cancel_order rejected with status {}",
                resp.status()
            )))
        }
    }

    async fn modify_order(
        &self,
        external_order_id: &str,
        updates: OrderUpdate,
    ) -> Result<(), AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        let url = format!(
            "{}{}",
            self.base_url().unwrap_or_default(),
            self.wiring.modify_path.replace("{id}", external_order_id)
        );
        let resp = self
            .authed(self.http.patch(&url).json(&updates))
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.into()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(AdapterError::Auth(format!(
                "modify_order rejected with status {}",
                resp.status()
            )))
        }
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: Option<TradeSide>,
    ) -> Result<(), AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        let url = self.endpoint(self.wiring.close_path);
        let body = serde_json::json!({ "symbol": symbol, "side": side });
        let resp = self
            .authed(self.http.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.into()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(AdapterError::Auth(format!(
                "close_position rejected with status {}",
                resp.status()
            )))
        }
    }

    async fn get_account_info(&self) -> Result<AccountSnapshot, AdapterError> {
        if !self.is_connected() {
            return Err(AdapterError::NotConnected);
        }
        let url = self.endpoint(self.wiring.account_path);
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.into()))?;
        if !resp.status().is_success() {
            return Err(AdapterError::Auth(format!(
                "get_account_info rejected with status {}",
                resp.status()
            )));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AdapterError::Transport(e.into()))?;
        self.normalizer
            .parse_account(&body)
            .ok_or_else(|| AdapterError::Auth("account response not parseable".into()))
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
