// src/db/audit.rs
//
// Append-only `ExecutionLog` writes/queries (§3). Every fan-out decision —
// risk rejection, successful replication, placement failure, heartbeat
// liveness — lands here so the testable invariant "for every ExecutionLog
// entry with a master trade id, a Trade row with that id exists" (§8) holds
// by construction: callers always insert the Trade first.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{ExecutionLog, LogLevel};
use crate::utils::errors::PersistError;

pub struct NewLogEntry {
    pub copier_id: Uuid,
    pub level: LogLevel,
    pub message: String,
    pub master_trade_id: Option<Uuid>,
    pub slave_trade_id: Option<Uuid>,
    pub slave_account_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
}

pub async fn log(pool: &PgPool, entry: NewLogEntry) -> Result<ExecutionLog, PersistError> {
    sqlx::query_as::<_, ExecutionLog>(
        r#"
        INSERT INTO execution_logs
            (id, copier_id, level, message, master_trade_id, slave_trade_id,
             slave_account_id, details, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.copier_id)
    .bind(entry.level)
    .bind(entry.message)
    .bind(entry.master_trade_id)
    .bind(entry.slave_trade_id)
    .bind(entry.slave_account_id)
    .bind(entry.details)
    .fetch_one(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn list_for_copier(
    pool: &PgPool,
    copier_id: Uuid,
    limit: i64,
) -> Result<Vec<ExecutionLog>, PersistError> {
    sqlx::query_as::<_, ExecutionLog>(
        "SELECT * FROM execution_logs WHERE copier_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(copier_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

/// Convenience for the common `info`-level liveness/lifecycle note.
pub async fn info(pool: &PgPool, copier_id: Uuid, message: impl Into<String>) -> Result<(), PersistError> {
    log(
        pool,
        NewLogEntry {
            copier_id,
            level: LogLevel::Info,
            message: message.into(),
            master_trade_id: None,
            slave_trade_id: None,
            slave_account_id: None,
            details: None,
        },
    )
    .await?;
    Ok(())
}

/// Convenience for a `warn`-level entry (risk gate rejection, §4.3.4).
pub async fn warn(
    pool: &PgPool,
    copier_id: Uuid,
    slave_account_id: Uuid,
    message: impl Into<String>,
) -> Result<(), PersistError> {
    log(
        pool,
        NewLogEntry {
            copier_id,
            level: LogLevel::Warn,
            message: message.into(),
            master_trade_id: None,
            slave_trade_id: None,
            slave_account_id: Some(slave_account_id),
            details: None,
        },
    )
    .await?;
    Ok(())
}

/// Convenience for an `error`-level entry (placement failure, §4.3.3e).
pub async fn error(
    pool: &PgPool,
    copier_id: Uuid,
    master_trade_id: Uuid,
    slave_account_id: Uuid,
    message: impl Into<String>,
) -> Result<(), PersistError> {
    log(
        pool,
        NewLogEntry {
            copier_id,
            level: LogLevel::Error,
            message: message.into(),
            master_trade_id: Some(master_trade_id),
            slave_trade_id: None,
            slave_account_id: Some(slave_account_id),
            details: None,
        },
    )
    .await?;
    Ok(())
}
