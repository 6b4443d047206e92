// src/db/models.rs
//
// Row types for the Persistence Gateway (§3, §6). Enums shared with the
// adapter layer (`TradeSide`, `OrderKind`, `TradeStatus`, `Platform`, `Firm`)
// are reused here rather than duplicated, since a `Trade` row and a
// `NormalizedExecution` describe the same concept at rest vs. in flight.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::adapter::model::{Firm, OrderKind, Platform, TradeSide, TradeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "copier_status", rename_all = "UPPERCASE")]
pub enum CopierStatus {
    Stopped,
    Active,
    Paused,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "scaling_type", rename_all = "UPPERCASE")]
pub enum ScalingType {
    Fixed,
    Percentage,
    BalanceBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "mapping_status", rename_all = "snake_case")]
pub enum MappingStatus {
    Pending,
    Synced,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "log_level", rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Owner of all resources; deleting one cascades to `TradingAccount` and
/// `Copier` rows (§3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub credential_hash: String,
    pub role: UserRole,
    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    pub organisation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tenant grouping, referenced by `User.organisation_id` and optionally by
/// `Copier.organisation_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organisation {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A brokerage account belonging to a `User` (§3). Credentials are stored as
/// plain columns — see DESIGN.md Open Question 4: encryption at rest is an
/// underlying-platform concern, not this core's.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradingAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub firm: Firm,
    pub platform: Platform,
    pub account_number: String,
    pub nominal_size: BigDecimal,
    pub current_balance: BigDecimal,
    pub email: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub is_connected: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub max_drawdown: Option<BigDecimal>,
    pub daily_loss_limit: Option<BigDecimal>,
    pub additional_config: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A replication rule: exactly one master account, any number of follower
/// bindings (`CopierAccountConfig`) (§3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Copier {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organisation_id: Option<Uuid>,
    pub name: String,
    pub master_account_id: Uuid,
    pub status: CopierStatus,
    pub latency_tolerance_ms: i32,
    pub copy_entries: bool,
    pub copy_exits: bool,
    pub copy_modifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A follower binding. `(copier_id, slave_account_id)` is unique (§3, §6).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CopierAccountConfig {
    pub id: Uuid,
    pub copier_id: Uuid,
    pub slave_account_id: Uuid,
    pub scaling_type: ScalingType,
    pub fixed_contracts: Option<i32>,
    pub percentage_scale: Option<BigDecimal>,
    /// Parameterised `BALANCE_BASED` denominator; defaults to 50000 per §4.3.5
    /// (DESIGN.md Open Question 3).
    pub balance_reference_size: BigDecimal,
    pub max_contracts: Option<i32>,
    pub daily_loss_limit: Option<BigDecimal>,
    pub auto_disable: bool,
    pub is_active: bool,
    pub disabled_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A recorded execution on one `TradingAccount`, optionally linked to the
/// `Copier` that produced it (set-null on copier delete, §3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub account_id: Uuid,
    pub copier_id: Option<Uuid>,
    pub symbol: String,
    pub side: TradeSide,
    pub order_kind: OrderKind,
    pub quantity: i32,
    pub entry_price: Option<BigDecimal>,
    pub exit_price: Option<BigDecimal>,
    pub stop_loss: Option<BigDecimal>,
    pub take_profit: Option<BigDecimal>,
    pub status: TradeStatus,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub realised_pnl: Option<BigDecimal>,
    pub external_order_id: Option<String>,
    pub external_trade_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A master-trade-to-follower-trade edge. `(master_trade_id,
/// slave_account_id)` is unique — the idempotency signal on retry (§3, §7).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradeMapping {
    pub id: Uuid,
    pub master_trade_id: Uuid,
    pub slave_account_id: Uuid,
    pub copier_id: Uuid,
    pub slave_trade_id: Option<Uuid>,
    pub status: MappingStatus,
    pub synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named threshold/action attached to a follower binding. The base risk
/// gate (§4.3.4) evaluates only the config-level daily loss; rows here are
/// advisory extensions a caller MAY layer on top.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RiskRule {
    pub id: Uuid,
    pub copier_account_config_id: Uuid,
    pub name: String,
    pub threshold: BigDecimal,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit entry (§3). Dies with its `Copier`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionLog {
    pub id: Uuid,
    pub copier_id: Uuid,
    pub level: LogLevel,
    pub message: String,
    pub master_trade_id: Option<Uuid>,
    pub slave_trade_id: Option<Uuid>,
    pub slave_account_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
