// src/adapter/mod.rs
//
// The Adapter Contract (§4.1): a uniform brokerage interface normalising
// authentication, execution streams, order placement and account discovery
// across platform families. Concrete adapters live in sibling modules
// (`rithmic`, `projectx`, `tradovate`, `ninjatrader`, `mock`) and share the
// connection-lifecycle plumbing in `transport`/`discovery`/`signer`.

pub mod base;
pub mod discovery;
pub mod mock;
pub mod model;
pub mod ninjatrader;
pub mod projectx;
pub mod registry;
pub mod rithmic;
pub mod signer;
pub mod tradovate;
pub mod transport;

use std::sync::Arc;

use async_trait::async_trait;

use crate::utils::errors::AdapterError;
use model::{
    AccountSnapshot, ConnectConfig, Firm, NormalizedExecution, NormalizedPosition, OrderUpdate,
    Platform, TradeExecution, TradeOrder, TradeSide,
};

/// Registered callback for normalised trade executions.
pub type TradeCallback = Arc<dyn Fn(NormalizedExecution) + Send + Sync>;
/// Registered callback for normalised position updates.
pub type PositionCallback = Arc<dyn Fn(NormalizedPosition) + Send + Sync>;
/// Disposer returned by `on_trade_update`/`on_position_update`; dropping it
/// has no effect, it must be invoked to deregister the callback.
pub type Disposer = Box<dyn FnOnce() + Send>;

/// The uniform brokerage contract every concrete adapter implements (§4.1).
#[async_trait]
pub trait Adapter: Send + Sync {
    /// (firm, platform) this instance speaks for.
    fn identity(&self) -> (Firm, Platform);

    /// Authenticate and open a session. Fails with `AdapterError::Auth` when
    /// no credential combination succeeds, `AdapterError::Transport` on
    /// network failure. On success the adapter is Connected and has
    /// attached its stream (or started the polling fallback).
    async fn connect(&self, cfg: ConnectConfig) -> Result<(), AdapterError>;

    /// Idempotent: releases timers and streams.
    async fn disconnect(&self);

    /// Live connection state, reflecting underlying socket health.
    fn is_connected(&self) -> bool;

    async fn place_order(&self, order: &TradeOrder) -> Result<TradeExecution, AdapterError>;

    async fn cancel_order(&self, external_order_id: &str) -> Result<(), AdapterError>;

    async fn modify_order(
        &self,
        external_order_id: &str,
        updates: OrderUpdate,
    ) -> Result<(), AdapterError>;

    async fn close_position(
        &self,
        symbol: &str,
        side: Option<TradeSide>,
    ) -> Result<(), AdapterError>;

    /// A single normalised account snapshot.
    async fn get_account_info(&self) -> Result<AccountSnapshot, AdapterError>;

    /// All accounts reachable under the current session. Providers that
    /// can't enumerate fall back to `[get_account_info()]`.
    async fn get_all_accounts(&self) -> Result<Vec<AccountSnapshot>, AdapterError> {
        Ok(vec![self.get_account_info().await?])
    }

    /// Register a trade-update callback; returns a disposer.
    fn on_trade_update(&self, cb: TradeCallback) -> Disposer;

    /// Register a position-update callback; returns a disposer.
    fn on_position_update(&self, cb: PositionCallback) -> Disposer;

    /// Clears all registered callbacks.
    fn unsubscribe(&self);
}
