// src/db/accounts.rs
//
// Persistence Gateway reads/writes for `TradingAccount` (§3, §4.4). Every
// read is scoped by `user_id` so one user can never observe another's
// accounts; `PersistError::NotFound` covers both "doesn't exist" and
// "exists but isn't yours" to avoid leaking existence (§7).

use bigdecimal::BigDecimal;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::adapter::model::{Firm, Platform};
use crate::db::models::TradingAccount;
use crate::utils::errors::PersistError;

pub struct NewTradingAccount {
    pub user_id: Uuid,
    pub firm: Firm,
    pub platform: Platform,
    pub account_number: String,
    pub nominal_size: BigDecimal,
    pub email: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub max_drawdown: Option<BigDecimal>,
    pub daily_loss_limit: Option<BigDecimal>,
    pub additional_config: Option<serde_json::Value>,
}

pub async fn create(pool: &PgPool, new: NewTradingAccount) -> Result<TradingAccount, PersistError> {
    sqlx::query_as::<_, TradingAccount>(
        r#"
        INSERT INTO trading_accounts
            (id, user_id, firm, platform, account_number, nominal_size, current_balance,
             email, password, api_key, api_secret, is_connected, last_sync_at, error_message,
             max_drawdown, daily_loss_limit, additional_config, created_at, updated_at)
        VALUES
            ($1, $2, $3, $4, $5, $6, $6,
             $7, $8, $9, $10, false, NULL, NULL,
             $11, $12, $13, now(), now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.firm)
    .bind(new.platform)
    .bind(new.account_number)
    .bind(new.nominal_size)
    .bind(new.email)
    .bind(new.password)
    .bind(new.api_key)
    .bind(new.api_secret)
    .bind(new.max_drawdown)
    .bind(new.daily_loss_limit)
    .bind(new.additional_config)
    .fetch_one(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn get(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<TradingAccount, PersistError> {
    sqlx::query_as::<_, TradingAccount>(
        "SELECT * FROM trading_accounts WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(PersistError::from_sqlx)?
    .ok_or(PersistError::NotFound)
}

/// Loads a `TradingAccount` without ownership scoping — used by the engine's
/// own hot path, which already knows the account is reachable through a
/// `Copier`/`CopierAccountConfig` it was told to act on.
pub async fn get_unscoped(pool: &PgPool, id: Uuid) -> Result<TradingAccount, PersistError> {
    sqlx::query_as::<_, TradingAccount>("SELECT * FROM trading_accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(PersistError::from_sqlx)?
        .ok_or(PersistError::NotFound)
}

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<TradingAccount>, PersistError> {
    sqlx::query_as::<_, TradingAccount>(
        "SELECT * FROM trading_accounts WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

pub async fn set_connection_state(
    pool: &PgPool,
    id: Uuid,
    is_connected: bool,
    error_message: Option<String>,
) -> Result<(), PersistError> {
    sqlx::query(
        "UPDATE trading_accounts SET is_connected = $2, last_sync_at = $3, error_message = $4, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(is_connected)
    .bind(if is_connected { Some(Utc::now()) } else { None })
    .bind(error_message)
    .execute(pool)
    .await
    .map_err(PersistError::from_sqlx)?;
    Ok(())
}

pub async fn update_balance(pool: &PgPool, id: Uuid, balance: BigDecimal) -> Result<(), PersistError> {
    sqlx::query("UPDATE trading_accounts SET current_balance = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(balance)
        .execute(pool)
        .await
        .map_err(PersistError::from_sqlx)?;
    Ok(())
}

pub struct AccountUpdate {
    pub max_drawdown: Option<BigDecimal>,
    pub daily_loss_limit: Option<BigDecimal>,
    pub additional_config: Option<serde_json::Value>,
}

/// `PATCH /accounts/{id}`. Only the risk-parameter/config fields are
/// editable post-creation; firm/platform/account_number/credentials are set
/// once at creation time and changed by deleting and recreating the account.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    update: AccountUpdate,
) -> Result<TradingAccount, PersistError> {
    get(pool, id, user_id).await?;
    sqlx::query_as::<_, TradingAccount>(
        r#"
        UPDATE trading_accounts
        SET max_drawdown = $3, daily_loss_limit = $4, additional_config = $5, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(update.max_drawdown)
    .bind(update.daily_loss_limit)
    .bind(update.additional_config)
    .fetch_one(pool)
    .await
    .map_err(PersistError::from_sqlx)
}

/// Deletes a `TradingAccount`, refusing when it's referenced as a master or
/// follower anywhere (§4.4). The conflict message names the referencing
/// copiers so the caller can report something actionable.
pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), PersistError> {
    get(pool, id, user_id).await?;

    let referencing: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT name FROM copiers WHERE master_account_id = $1
        UNION
        SELECT c.name FROM copiers c
        JOIN copier_account_configs cac ON cac.copier_id = c.id
        WHERE cac.slave_account_id = $1
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .map_err(PersistError::from_sqlx)?;

    if !referencing.is_empty() {
        let names: Vec<String> = referencing.into_iter().map(|(n,)| n).collect();
        return Err(PersistError::Conflict(format!(
            "account is referenced by copier(s): {}",
            names.join(", ")
        )));
    }

    sqlx::query("DELETE FROM trading_accounts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(PersistError::from_sqlx)?;
    Ok(())
}
