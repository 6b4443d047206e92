// src/routes/accounts.rs
//
// The `/accounts` surface (§6). A thin shell: handlers extract the
// authenticated user, delegate to the Persistence Gateway / Account
// Manager, and serialise the result — no business logic lives here.

use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse, Scope};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::account_manager::AccountManager;
use crate::adapter::model::{ConnectConfig, Firm, Platform};
use crate::db::accounts::{self, AccountUpdate, NewTradingAccount};
use crate::middleware::auth::AuthenticatedUser;
use crate::utils::types::ApiResponse;

fn current_user(req: &HttpRequest) -> Result<Uuid, actix_web::Error> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.0)
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("missing authenticated user"))
}

#[derive(Debug, Deserialize)]
struct CreateAccountPayload {
    firm: Firm,
    platform: Platform,
    account_number: String,
    nominal_size: BigDecimal,
    email: Option<String>,
    password: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
}

#[post("")]
async fn create_account(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    payload: web::Json<CreateAccountPayload>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let payload = payload.into_inner();
    let account = accounts::create(
        &pool,
        NewTradingAccount {
            user_id,
            firm: payload.firm,
            platform: payload.platform,
            account_number: payload.account_number,
            nominal_size: payload.nominal_size,
            email: payload.email,
            password: payload.password,
            api_key: payload.api_key,
            api_secret: payload.api_secret,
            max_drawdown: None,
            daily_loss_limit: None,
            additional_config: None,
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(account)))
}

#[get("")]
async fn list_accounts(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let list = accounts::list(&pool, user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list)))
}

#[get("/{id}")]
async fn get_account(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let account = accounts::get(&pool, id.into_inner(), user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(account)))
}

#[derive(Debug, Deserialize)]
struct PatchAccountPayload {
    max_drawdown: Option<BigDecimal>,
    daily_loss_limit: Option<BigDecimal>,
    additional_config: Option<serde_json::Value>,
}

#[patch("/{id}")]
async fn patch_account(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    id: web::Path<Uuid>,
    payload: web::Json<PatchAccountPayload>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let payload = payload.into_inner();
    let account = accounts::update(
        &pool,
        id.into_inner(),
        user_id,
        AccountUpdate {
            max_drawdown: payload.max_drawdown,
            daily_loss_limit: payload.daily_loss_limit,
            additional_config: payload.additional_config,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(account)))
}

#[delete("/{id}")]
async fn delete_account(
    req: HttpRequest,
    manager: web::Data<AccountManager>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    manager.delete_account(user_id, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("deleted", ())))
}

#[post("/{id}/connect")]
async fn connect_account(
    req: HttpRequest,
    manager: web::Data<AccountManager>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    manager.connect(user_id, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("connected", ())))
}

#[post("/{id}/disconnect")]
async fn disconnect_account(
    req: HttpRequest,
    manager: web::Data<AccountManager>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    manager.disconnect(user_id, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("disconnected", ())))
}

#[derive(Debug, Deserialize)]
struct TestConnectionPayload {
    firm: Firm,
    platform: Platform,
    #[serde(flatten)]
    credentials: ConnectConfig,
}

#[post("/test-connection")]
async fn test_connection(
    manager: web::Data<AccountManager>,
    payload: web::Json<TestConnectionPayload>,
) -> HttpResponse {
    let payload = payload.into_inner();
    let result = manager
        .test_connection(payload.firm, payload.platform, payload.credentials)
        .await;
    HttpResponse::Ok().json(ApiResponse::ok(result))
}

#[derive(Debug, Deserialize)]
struct PlatformConnectPayload {
    firm: Firm,
    platform: Platform,
    #[serde(flatten)]
    credentials: ConnectConfig,
}

#[post("/platforms/connect")]
async fn connect_platform(
    manager: web::Data<AccountManager>,
    payload: web::Json<PlatformConnectPayload>,
) -> Result<HttpResponse, actix_web::Error> {
    let payload = payload.into_inner();
    let summary = manager
        .connect_platform(payload.firm, payload.platform, payload.credentials)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(summary)))
}

#[derive(Debug, Deserialize)]
struct CreateAccountsFromPlatformPayload {
    firm: Firm,
    platform: Platform,
    #[serde(flatten)]
    credentials: ConnectConfig,
    accounts: Vec<crate::account_manager::DiscoveredAccount>,
}

#[post("/platforms/create-accounts")]
async fn create_accounts_from_platform(
    req: HttpRequest,
    manager: web::Data<AccountManager>,
    payload: web::Json<CreateAccountsFromPlatformPayload>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let payload = payload.into_inner();
    let created = manager
        .create_accounts_from_platform(
            user_id,
            payload.firm,
            payload.platform,
            &payload.accounts,
            &payload.credentials,
        )
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(created)))
}

pub fn accounts_scope() -> Scope {
    web::scope("/accounts")
        .service(test_connection)
        .service(connect_platform)
        .service(create_accounts_from_platform)
        .service(create_account)
        .service(list_accounts)
        .service(get_account)
        .service(patch_account)
        .service(delete_account)
        .service(connect_account)
        .service(disconnect_account)
}
