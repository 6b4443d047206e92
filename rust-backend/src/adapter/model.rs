// src/adapter/model.rs
//
// Types shared by every concrete adapter and by the engine/persistence
// layers that consume normalised executions. Enums that are persisted carry
// `sqlx::Type` so the gateway can bind/read them as native Postgres enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Underlying trading platform shared by multiple prop firms (§2, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "platform", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Rithmic,
    Tradovate,
    NinjaTrader,
    ProjectX,
    Other,
}

impl Platform {
    pub const ALL: &'static [Platform] = &[
        Platform::Rithmic,
        Platform::Tradovate,
        Platform::NinjaTrader,
        Platform::ProjectX,
        Platform::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Rithmic => "RITHMIC",
            Platform::Tradovate => "TRADOVATE",
            Platform::NinjaTrader => "NINJATRADER",
            Platform::ProjectX => "PROJECTX",
            Platform::Other => "OTHER",
        }
    }
}

/// Prop firm issuing the funded account (§2, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "firm", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Firm {
    TopstepX,
    AlphaFutures,
    MyFundedFutures,
    TakeProfitTrader,
    Tradefy,
    Other,
}

/// Canonical side, normalised from every vendor's wire shape (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trade_side", rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn opposite(self) -> Self {
        match self {
            TradeSide::Buy => TradeSide::Sell,
            TradeSide::Sell => TradeSide::Buy,
        }
    }

    /// Signed direction multiplier used by the position tracker: +1 long, -1 short.
    pub fn sign(self) -> i64 {
        match self {
            TradeSide::Buy => 1,
            TradeSide::Sell => -1,
        }
    }
}

/// Order type. Non-goal: anything beyond market/limit/stop (§1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_kind", rename_all = "UPPERCASE")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
}

/// Canonical execution status, normalised from vendor-specific strings (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trade_status", rename_all = "snake_case")]
pub enum TradeStatus {
    Pending,
    Filled,
    PartiallyFilled,
    Cancelled,
    Rejected,
}

/// A single normalised execution delivered by an adapter's trade stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedExecution {
    pub external_order_id: String,
    pub external_trade_id: Option<String>,
    pub symbol: String,
    pub side: TradeSide,
    pub order_kind: OrderKind,
    pub quantity: i64,
    pub price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub status: TradeStatus,
    pub realised_pnl: Option<f64>,
    pub filled_at: Option<DateTime<Utc>>,
    /// True when this execution is a cancel/amend of a resting order rather
    /// than a fill (feeds the `copyModifications` filter, §4.3.3).
    pub is_modification: bool,
}

/// A normalised open position, as returned by `getAccountInfo`/`getAllAccounts`
/// or pushed by the position-update stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedPosition {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: i64,
    pub average_price: Option<f64>,
}

/// A normalised account snapshot (§4.1 `getAccountInfo`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: String,
    pub balance: f64,
    pub equity: f64,
    pub margin_used: f64,
    pub positions: Vec<NormalizedPosition>,
}

/// Credentials and session parameters an adapter needs to `connect` (§4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub account_number: Option<String>,
    pub environment: Option<String>,
    pub base_url_override: Option<String>,
}

impl ConnectConfig {
    /// Credential shapes to try, in the order §4.1.1 mandates:
    /// (a) email+password, (b) apiKey+apiSecret, (c) username(=accountNumber)+password.
    pub fn credential_shapes(&self) -> Vec<CredentialShape<'_>> {
        let mut shapes = Vec::with_capacity(3);
        if let (Some(email), Some(password)) = (&self.email, &self.password) {
            shapes.push(CredentialShape::EmailPassword { email, password });
        }
        if let (Some(key), Some(secret)) = (&self.api_key, &self.api_secret) {
            shapes.push(CredentialShape::ApiKeySecret { key, secret });
        }
        if let (Some(account_number), Some(password)) = (&self.account_number, &self.password) {
            shapes.push(CredentialShape::UsernamePassword { account_number, password });
        }
        shapes
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CredentialShape<'a> {
    EmailPassword { email: &'a str, password: &'a str },
    ApiKeySecret { key: &'a str, secret: &'a str },
    UsernamePassword { account_number: &'a str, password: &'a str },
}

/// An outbound order request (§4.1 `placeOrder`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOrder {
    pub symbol: String,
    pub side: TradeSide,
    pub order_kind: OrderKind,
    pub quantity: i64,
    pub price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

/// The result of a successful `placeOrder` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecution {
    pub external_order_id: String,
    pub external_trade_id: Option<String>,
    pub status: TradeStatus,
    pub filled_price: Option<f64>,
    pub filled_quantity: i64,
}

/// Partial updates accepted by `modifyOrder`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}
