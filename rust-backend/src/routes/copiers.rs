// src/routes/copiers.rs
//
// The `/copiers` surface (§6): CRUD plus `start`/`stop`/`pause` which
// delegate to the engine `Supervisor`, and follower (`slaves`) management
// which delegates to the Persistence Gateway directly.

use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse, Scope};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::accounts;
use crate::db::copiers::{self, CopierUpdate, NewCopier, NewFollowerConfig};
use crate::db::models::{CopierStatus, ScalingType};
use crate::engine::Supervisor;
use crate::middleware::auth::AuthenticatedUser;
use crate::utils::types::ApiResponse;

fn current_user(req: &HttpRequest) -> Result<Uuid, actix_web::Error> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.0)
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("missing authenticated user"))
}

#[derive(Debug, Deserialize)]
struct CreateCopierPayload {
    name: String,
    master_account_id: Uuid,
    organisation_id: Option<Uuid>,
    #[serde(default)]
    latency_tolerance_ms: i32,
    #[serde(default = "default_true")]
    copy_entries: bool,
    #[serde(default = "default_true")]
    copy_exits: bool,
    #[serde(default)]
    copy_modifications: bool,
}

fn default_true() -> bool {
    true
}

#[post("")]
async fn create_copier(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    payload: web::Json<CreateCopierPayload>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let payload = payload.into_inner();
    let copier = copiers::create_copier(
        &pool,
        NewCopier {
            user_id,
            organisation_id: payload.organisation_id,
            name: payload.name,
            master_account_id: payload.master_account_id,
            latency_tolerance_ms: payload.latency_tolerance_ms,
            copy_entries: payload.copy_entries,
            copy_exits: payload.copy_exits,
            copy_modifications: payload.copy_modifications,
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(copier)))
}

#[get("")]
async fn list_copiers(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let list = copiers::list_copiers(&pool, user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list)))
}

#[get("/{id}")]
async fn get_copier(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let copier = copiers::get_copier(&pool, id.into_inner(), user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(copier)))
}

#[patch("/{id}")]
async fn patch_copier(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    id: web::Path<Uuid>,
    payload: web::Json<CopierUpdatePayload>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let payload = payload.into_inner();
    let copier = copiers::update(
        &pool,
        id.into_inner(),
        user_id,
        CopierUpdate {
            name: payload.name,
            copy_entries: payload.copy_entries,
            copy_exits: payload.copy_exits,
            copy_modifications: payload.copy_modifications,
            latency_tolerance_ms: payload.latency_tolerance_ms,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(copier)))
}

#[derive(Debug, Deserialize)]
struct CopierUpdatePayload {
    name: String,
    copy_entries: bool,
    copy_exits: bool,
    copy_modifications: bool,
    latency_tolerance_ms: i32,
}

#[delete("/{id}")]
async fn delete_copier(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    copiers::delete_copier(&pool, id.into_inner(), user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("deleted", ())))
}

#[post("/{id}/start")]
async fn start_copier(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    supervisor: web::Data<Supervisor>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let id = id.into_inner();
    copiers::get_copier(&pool, id, user_id).await?;
    supervisor.start_copier(id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("started", ())))
}

#[post("/{id}/stop")]
async fn stop_copier(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    supervisor: web::Data<Supervisor>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let id = id.into_inner();
    copiers::get_copier(&pool, id, user_id).await?;
    supervisor.stop_copier(id, CopierStatus::Stopped).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("stopped", ())))
}

#[post("/{id}/pause")]
async fn pause_copier(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    supervisor: web::Data<Supervisor>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let id = id.into_inner();
    copiers::get_copier(&pool, id, user_id).await?;
    supervisor.stop_copier(id, CopierStatus::Paused).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("paused", ())))
}

#[derive(Debug, Deserialize)]
struct AddFollowerPayload {
    slave_account_id: Uuid,
    scaling_type: ScalingType,
    fixed_contracts: Option<i32>,
    percentage_scale: Option<BigDecimal>,
    #[serde(default = "default_balance_reference")]
    balance_reference_size: BigDecimal,
    max_contracts: Option<i32>,
    daily_loss_limit: Option<BigDecimal>,
    #[serde(default)]
    auto_disable: bool,
}

fn default_balance_reference() -> BigDecimal {
    BigDecimal::from(50_000)
}

#[post("/{id}/slaves")]
async fn add_follower(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    id: web::Path<Uuid>,
    payload: web::Json<AddFollowerPayload>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let copier_id = id.into_inner();
    let payload = payload.into_inner();

    // A follower account bound to a Copier must belong to the same User (§3):
    // both ends of the binding have to resolve under the caller's ownership.
    copiers::get_copier(&pool, copier_id, user_id).await?;
    accounts::get(&pool, payload.slave_account_id, user_id).await?;

    let config = copiers::add_follower(
        &pool,
        NewFollowerConfig {
            copier_id,
            slave_account_id: payload.slave_account_id,
            scaling_type: payload.scaling_type,
            fixed_contracts: payload.fixed_contracts,
            percentage_scale: payload.percentage_scale,
            balance_reference_size: payload.balance_reference_size,
            max_contracts: payload.max_contracts,
            daily_loss_limit: payload.daily_loss_limit,
            auto_disable: payload.auto_disable,
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(config)))
}

#[derive(Debug, Deserialize)]
struct PatchFollowerPayload {
    is_active: Option<bool>,
}

#[patch("/{id}/slaves/{slave_account_id}")]
async fn patch_follower(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    path: web::Path<(Uuid, Uuid)>,
    payload: web::Json<PatchFollowerPayload>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let (copier_id, slave_account_id) = path.into_inner();
    copiers::get_copier(&pool, copier_id, user_id).await?;
    match payload.is_active {
        Some(false) => {
            copiers::disable_follower_for_account(
                &pool,
                copier_id,
                slave_account_id,
                "disabled by operator".to_string(),
            )
            .await?;
        }
        Some(true) => {
            copiers::enable_follower_for_account(&pool, copier_id, slave_account_id).await?;
        }
        None => {}
    }
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("updated", ())))
}

#[delete("/{id}/slaves/{slave_account_id}")]
async fn remove_follower(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = current_user(&req)?;
    let (copier_id, slave_account_id) = path.into_inner();
    copiers::get_copier(&pool, copier_id, user_id).await?;
    copiers::remove_follower(&pool, copier_id, slave_account_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message("removed", ())))
}

pub fn copiers_scope() -> Scope {
    web::scope("/copiers")
        .service(create_copier)
        .service(list_copiers)
        .service(get_copier)
        .service(patch_copier)
        .service(delete_copier)
        .service(start_copier)
        .service(stop_copier)
        .service(pause_copier)
        .service(add_follower)
        .service(patch_follower)
        .service(remove_follower)
}
