// src/routes/trades.rs
//
// The `/trades` surface (§6): read-only views over the Persistence Gateway's
// `Trade`/`TradeMapping` tables. No state-changing operations live here —
// trades are only ever written by the fan-out step (§4.3.3).

use actix_web::{get, web, HttpRequest, HttpResponse, Scope};
use uuid::Uuid;

use crate::db::{accounts, trades};
use crate::middleware::auth::AuthenticatedUser;
use crate::utils::errors::PersistError;
use crate::utils::types::ApiResponse;

fn current_user(req: &HttpRequest) -> Result<Uuid, actix_web::Error> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.0)
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("missing authenticated user"))
}

#[derive(Debug, serde::Deserialize)]
struct AccountQuery {
    account_id: Uuid,
}

/// `GET /trades?account_id=...`: trades for one account the caller owns.
#[get("")]
async fn list_trades(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    query: web::Query<AccountQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    // Ownership check: `accounts::get` 404s if the account isn't the caller's.
    accounts::get(&pool, query.account_id, user_id).await?;
    let list = trades::list_trades_for_account(&pool, query.account_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list)))
}

/// `GET /trades/history`: every trade across every account the caller owns.
#[get("/history")]
async fn trade_history(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let list = trades::list_trade_history_for_user(&pool, user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list)))
}

/// `GET /trades/mappings/{copierId}`: replication ledger for one copier.
#[get("/mappings/{copier_id}")]
async fn list_mappings(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    copier_id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let copier_id = copier_id.into_inner();
    // Ownership check via the gateway's existing scoped copier lookup.
    crate::db::copiers::get_copier(&pool, copier_id, user_id).await?;
    let list = trades::list_mappings_for_copier(&pool, copier_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list)))
}

#[get("/{id}")]
async fn get_trade(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let trade = trades::get_trade(&pool, id.into_inner()).await?;
    accounts::get(&pool, trade.account_id, user_id)
        .await
        .map_err(|_| PersistError::NotFound)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(trade)))
}

pub fn trades_scope() -> Scope {
    web::scope("/trades")
        .service(trade_history)
        .service(list_mappings)
        .service(list_trades)
        .service(get_trade)
}
