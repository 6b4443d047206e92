// src/db/copiers.rs
//
// Persistence Gateway reads/writes for `Copier` and `CopierAccountConfig`
// (§3, §4.3, §4.4). `add_follower` relies on the database's
// `(copier_id, slave_account_id)` uniqueness constraint — a conflict here is
// a real validation failure (unlike the `TradeMapping` conflict, which is an
// idempotency success signal).

use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::accounts;
use crate::db::models::{Copier, CopierAccountConfig, CopierStatus, ScalingType};
use crate::utils::errors::PersistError;

pub struct NewCopier {
    pub user_id: Uuid,
    pub organisation_id: Option<Uuid>,
    pub name: String,
    pub master_account_id: Uuid,
    pub latency_tolerance_ms: i32,
    pub copy_entries: bool,
    pub copy_exits: bool,
    pub copy_modifications: bool,
}

/// Creates a `Copier`. The master account must belong to `new.user_id` (§3,
/// §8 "a Copier ever ACTIVE has a masterAccountId resolving to a
/// TradingAccount owned by the same userId") — verified here so the
/// invariant holds from the moment the row is created, not just while the
/// engine happens to check it later.
pub async fn create_copier(pool: &PgPool, new: NewCopier) -> Result<Copier, PersistError> {
    accounts::get(pool, new.master_account_id, new.user_id).await?;

    sqlx::query_as::<_, Copier>(
        r#"
        INSERT INTO copiers
            (id, user_id, organisation_id, name, master_account_id, status,
             latency_tolerance_ms, copy_entries, copy_exits, copy_modifications,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.organisation_id)
    .bind(new.name)
    .bind(new.master_account_id)
    .bind(CopierStatus::Stopped)
    .bind(new.latency_tolerance_ms)
    .bind(new.copy_entries)
    .bind(new.copy_exits)
    .bind(new.copy_modifications)
    .fetch_one(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn get_copier(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Copier, PersistError> {
    sqlx::query_as::<_, Copier>("SELECT * FROM copiers WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(PersistError::from_sqlx)?
        .ok_or(PersistError::NotFound)
}

/// Loads a `Copier` without ownership scoping — used by the engine on its
/// own hot path (§4.3.2 step 1), which already trusts the caller because it
/// is re-reading a copier it was told to start by the owning request.
pub async fn get_copier_unscoped(pool: &PgPool, id: Uuid) -> Result<Copier, PersistError> {
    sqlx::query_as::<_, Copier>("SELECT * FROM copiers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(PersistError::from_sqlx)?
        .ok_or(PersistError::NotFound)
}

pub async fn list_copiers(pool: &PgPool, user_id: Uuid) -> Result<Vec<Copier>, PersistError> {
    sqlx::query_as::<_, Copier>("SELECT * FROM copiers WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(PersistError::from_sqlx)
}

/// Lists every copier with the given status, across all users — used by the
/// supervisor's crash-recovery boot scan (§4.3.7), which has no per-request
/// user in scope.
pub async fn list_copiers_by_status(
    pool: &PgPool,
    status: CopierStatus,
) -> Result<Vec<Copier>, PersistError> {
    sqlx::query_as::<_, Copier>("SELECT * FROM copiers WHERE status = $1")
        .bind(status)
        .fetch_all(pool)
        .await
        .map_err(PersistError::from_sqlx)
}

pub async fn set_status(pool: &PgPool, id: Uuid, status: CopierStatus) -> Result<(), PersistError> {
    sqlx::query("UPDATE copiers SET status = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await
        .map_err(PersistError::from_sqlx)?;
    Ok(())
}

pub struct CopierUpdate {
    pub name: String,
    pub copy_entries: bool,
    pub copy_exits: bool,
    pub copy_modifications: bool,
    pub latency_tolerance_ms: i32,
}

/// `PATCH /copiers/{id}`. `master_account_id` is intentionally not editable
/// here — moving a copier to a different master is a delete-and-recreate,
/// since it would otherwise silently reset position-tracker state.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    update: CopierUpdate,
) -> Result<Copier, PersistError> {
    get_copier(pool, id, user_id).await?;
    sqlx::query_as::<_, Copier>(
        r#"
        UPDATE copiers
        SET name = $3, copy_entries = $4, copy_exits = $5, copy_modifications = $6,
            latency_tolerance_ms = $7, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(update.name)
    .bind(update.copy_entries)
    .bind(update.copy_exits)
    .bind(update.copy_modifications)
    .bind(update.latency_tolerance_ms)
    .fetch_one(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn delete_copier(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), PersistError> {
    get_copier(pool, id, user_id).await?;
    sqlx::query("DELETE FROM copiers WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(PersistError::from_sqlx)?;
    Ok(())
}

pub struct NewFollowerConfig {
    pub copier_id: Uuid,
    pub slave_account_id: Uuid,
    pub scaling_type: ScalingType,
    pub fixed_contracts: Option<i32>,
    pub percentage_scale: Option<BigDecimal>,
    pub balance_reference_size: BigDecimal,
    pub max_contracts: Option<i32>,
    pub daily_loss_limit: Option<BigDecimal>,
    pub auto_disable: bool,
}

pub async fn add_follower(
    pool: &PgPool,
    new: NewFollowerConfig,
) -> Result<CopierAccountConfig, PersistError> {
    sqlx::query_as::<_, CopierAccountConfig>(
        r#"
        INSERT INTO copier_account_configs
            (id, copier_id, slave_account_id, scaling_type, fixed_contracts,
             percentage_scale, balance_reference_size, max_contracts, daily_loss_limit,
             auto_disable, is_active, disabled_reason, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, true, NULL, now(), now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.copier_id)
    .bind(new.slave_account_id)
    .bind(new.scaling_type)
    .bind(new.fixed_contracts)
    .bind(new.percentage_scale)
    .bind(new.balance_reference_size)
    .bind(new.max_contracts)
    .bind(new.daily_loss_limit)
    .bind(new.auto_disable)
    .fetch_one(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn list_followers(
    pool: &PgPool,
    copier_id: Uuid,
) -> Result<Vec<CopierAccountConfig>, PersistError> {
    sqlx::query_as::<_, CopierAccountConfig>(
        "SELECT * FROM copier_account_configs WHERE copier_id = $1 ORDER BY created_at",
    )
    .bind(copier_id)
    .fetch_all(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn list_active_followers(
    pool: &PgPool,
    copier_id: Uuid,
) -> Result<Vec<CopierAccountConfig>, PersistError> {
    sqlx::query_as::<_, CopierAccountConfig>(
        "SELECT * FROM copier_account_configs WHERE copier_id = $1 AND is_active = true ORDER BY created_at",
    )
    .bind(copier_id)
    .fetch_all(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn remove_follower(
    pool: &PgPool,
    copier_id: Uuid,
    slave_account_id: Uuid,
) -> Result<(), PersistError> {
    let result = sqlx::query(
        "DELETE FROM copier_account_configs WHERE copier_id = $1 AND slave_account_id = $2",
    )
    .bind(copier_id)
    .bind(slave_account_id)
    .execute(pool)
    .await
    .map_err(PersistError::from_sqlx)?;

    if result.rows_affected() == 0 {
        return Err(PersistError::NotFound);
    }
    Ok(())
}

/// Atomically disables a follower binding and records why (§4.3.4 risk
/// gate auto-disable).
pub async fn disable_follower(
    pool: &PgPool,
    config_id: Uuid,
    disabled_reason: String,
) -> Result<(), PersistError> {
    sqlx::query(
        "UPDATE copier_account_configs SET is_active = false, disabled_reason = $2, updated_at = now() WHERE id = $1",
    )
    .bind(config_id)
    .bind(disabled_reason)
    .execute(pool)
    .await
    .map_err(PersistError::from_sqlx)?;
    Ok(())
}

/// Same as `disable_follower` but addressed by `(copier_id, slave_account_id)`
/// — the shape the `PATCH /copiers/{id}/slaves/{slaveAccountId}` route has in
/// hand, rather than the config row's own id.
pub async fn disable_follower_for_account(
    pool: &PgPool,
    copier_id: Uuid,
    slave_account_id: Uuid,
    disabled_reason: String,
) -> Result<(), PersistError> {
    let result = sqlx::query(
        "UPDATE copier_account_configs SET is_active = false, disabled_reason = $3, updated_at = now() \
         WHERE copier_id = $1 AND slave_account_id = $2",
    )
    .bind(copier_id)
    .bind(slave_account_id)
    .bind(disabled_reason)
    .execute(pool)
    .await
    .map_err(PersistError::from_sqlx)?;

    if result.rows_affected() == 0 {
        return Err(PersistError::NotFound);
    }
    Ok(())
}

/// Re-activates a previously disabled follower binding, clearing the reason.
pub async fn enable_follower_for_account(
    pool: &PgPool,
    copier_id: Uuid,
    slave_account_id: Uuid,
) -> Result<(), PersistError> {
    let result = sqlx::query(
        "UPDATE copier_account_configs SET is_active = true, disabled_reason = NULL, updated_at = now() \
         WHERE copier_id = $1 AND slave_account_id = $2",
    )
    .bind(copier_id)
    .bind(slave_account_id)
    .execute(pool)
    .await
    .map_err(PersistError::from_sqlx)?;

    if result.rows_affected() == 0 {
        return Err(PersistError::NotFound);
    }
    Ok(())
}
