// src/db/trades.rs
//
// Persistence Gateway reads/writes for `Trade` and `TradeMapping` (§3, §4.3.3,
// §7, §8). `insert_master_trade` upserts on `(account_id, external_trade_id)`
// so replaying the same broker execution twice persists exactly one row
// (seed scenario 6). `insert_mapping` surfaces a uniqueness violation on
// `(master_trade_id, slave_account_id)` as `PersistError::Conflict`, which
// the fan-out step (§4.3.3/§7) treats as "already ran, no-op" rather than a
// failure.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::adapter::model::{OrderKind, TradeSide, TradeStatus};
use crate::db::models::{MappingStatus, Trade, TradeMapping};
use crate::utils::errors::PersistError;

pub struct NewTrade {
    pub account_id: Uuid,
    pub copier_id: Option<Uuid>,
    pub symbol: String,
    pub side: TradeSide,
    pub order_kind: OrderKind,
    pub quantity: i32,
    pub entry_price: Option<BigDecimal>,
    pub stop_loss: Option<BigDecimal>,
    pub take_profit: Option<BigDecimal>,
    pub status: TradeStatus,
    pub filled_at: Option<DateTime<Utc>>,
    pub realised_pnl: Option<BigDecimal>,
    pub external_order_id: Option<String>,
    pub external_trade_id: Option<String>,
}

/// Inserts a trade, upserting on `(account_id, external_trade_id)` so a
/// replayed execution with the same broker-assigned id is a no-op rather
/// than a duplicate row (§8 scenario 6). Trades with no external trade id
/// (e.g. synthetic close orders) always insert a fresh row.
pub async fn insert_trade(pool: &PgPool, new: NewTrade) -> Result<Trade, PersistError> {
    sqlx::query_as::<_, Trade>(
        r#"
        INSERT INTO trades
            (id, account_id, copier_id, symbol, side, order_kind, quantity,
             entry_price, stop_loss, take_profit, status, opened_at, filled_at,
             realised_pnl, external_order_id, external_trade_id, created_at, updated_at)
        VALUES
            ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), $12, $13, $14, $15, now(), now())
        ON CONFLICT (account_id, external_trade_id)
        WHERE external_trade_id IS NOT NULL
        DO UPDATE SET status = EXCLUDED.status, updated_at = now()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.account_id)
    .bind(new.copier_id)
    .bind(new.symbol)
    .bind(new.side)
    .bind(new.order_kind)
    .bind(new.quantity)
    .bind(new.entry_price)
    .bind(new.stop_loss)
    .bind(new.take_profit)
    .bind(new.status)
    .bind(new.filled_at)
    .bind(new.realised_pnl)
    .bind(new.external_order_id)
    .bind(new.external_trade_id)
    .fetch_one(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn get_trade(pool: &PgPool, id: Uuid) -> Result<Trade, PersistError> {
    sqlx::query_as::<_, Trade>("SELECT * FROM trades WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(PersistError::from_sqlx)?
        .ok_or(PersistError::NotFound)
}

pub async fn list_trades_for_account(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Vec<Trade>, PersistError> {
    sqlx::query_as::<_, Trade>(
        "SELECT * FROM trades WHERE account_id = $1 ORDER BY created_at DESC",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn list_trade_history_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Trade>, PersistError> {
    sqlx::query_as::<_, Trade>(
        r#"
        SELECT t.* FROM trades t
        JOIN trading_accounts a ON a.id = t.account_id
        WHERE a.user_id = $1
        ORDER BY t.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

/// Sum of realised P&L across FILLED trades for `account_id` within the
/// current UTC day — the risk gate's daily-loss input (§4.3.4).
pub async fn sum_realised_pnl_today(pool: &PgPool, account_id: Uuid) -> Result<BigDecimal, PersistError> {
    let row: (Option<BigDecimal>,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(realised_pnl), 0) FROM trades
        WHERE account_id = $1
          AND status = 'filled'
          AND filled_at >= date_trunc('day', now() AT TIME ZONE 'UTC')
        "#,
    )
    .bind(account_id)
    .fetch_one(pool)
    .await
    .map_err(PersistError::from_sqlx)?;
    Ok(row.0.unwrap_or_default())
}

pub struct NewTradeMapping {
    pub master_trade_id: Uuid,
    pub slave_account_id: Uuid,
    pub copier_id: Uuid,
    pub slave_trade_id: Option<Uuid>,
    pub status: MappingStatus,
    pub error_message: Option<String>,
}

/// Inserts a `TradeMapping`, normally as a `Pending` claim taken before the
/// fan-out step places any follower order. A uniqueness violation on
/// `(master_trade_id, slave_account_id)` surfaces as `PersistError::Conflict`
/// — the caller (fan-out, §4.3.3) must treat that as "already claimed by an
/// earlier attempt", not a failure, and must not place a second order.
pub async fn insert_mapping(
    pool: &PgPool,
    new: NewTradeMapping,
) -> Result<TradeMapping, PersistError> {
    let synced_at = matches!(new.status, MappingStatus::Synced).then(Utc::now);
    sqlx::query_as::<_, TradeMapping>(
        r#"
        INSERT INTO trade_mappings
            (id, master_trade_id, slave_account_id, copier_id, slave_trade_id,
             status, synced_at, error_message, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.master_trade_id)
    .bind(new.slave_account_id)
    .bind(new.copier_id)
    .bind(new.slave_trade_id)
    .bind(new.status)
    .bind(synced_at)
    .bind(new.error_message)
    .fetch_one(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

/// Marks a previously-claimed (`Pending`) mapping as synced once the
/// follower order has actually been placed.
pub async fn mark_mapping_synced(
    pool: &PgPool,
    mapping_id: Uuid,
    slave_trade_id: Uuid,
) -> Result<(), PersistError> {
    sqlx::query(
        "UPDATE trade_mappings SET status = $2, slave_trade_id = $3, synced_at = now(), updated_at = now() WHERE id = $1",
    )
    .bind(mapping_id)
    .bind(MappingStatus::Synced)
    .bind(slave_trade_id)
    .execute(pool)
    .await
    .map_err(PersistError::from_sqlx)?;
    Ok(())
}

/// Marks a previously-claimed (`Pending`) mapping as failed, recording why.
pub async fn mark_mapping_failed(
    pool: &PgPool,
    mapping_id: Uuid,
    message: &str,
) -> Result<(), PersistError> {
    sqlx::query(
        "UPDATE trade_mappings SET status = $2, error_message = $3, updated_at = now() WHERE id = $1",
    )
    .bind(mapping_id)
    .bind(MappingStatus::Failed)
    .bind(message)
    .execute(pool)
    .await
    .map_err(PersistError::from_sqlx)?;
    Ok(())
}

pub async fn list_mappings_for_copier(
    pool: &PgPool,
    copier_id: Uuid,
) -> Result<Vec<TradeMapping>, PersistError> {
    sqlx::query_as::<_, TradeMapping>(
        "SELECT * FROM trade_mappings WHERE copier_id = $1 ORDER BY created_at DESC",
    )
    .bind(copier_id)
    .fetch_all(pool)
    .await
    .map_err(PersistError::from_sqlx)
}
