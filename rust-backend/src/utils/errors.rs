// src/utils/errors.rs
//
// Layered error taxonomy: transport-level failures lift into adapter-level
// failures, which lift into engine-level failures; persistence failures are
// a separate branch used by the gateway and surfaced directly to callers.

use thiserror::Error;

/// Errors from the raw transport (HTTP, JSON framing, WebSocket).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("{0}")]
    Other(String),
}

/// Errors from the Adapter Layer (§4.1, §7).
#[derive(Error, Debug)]
pub enum AdapterError {
    /// No credential combination yielded a session.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Transient network failure.
    #[error("transport error: {0}")]
    Transport(#[from] ApiError),
    /// Called placeOrder/getAccountInfo/etc. without a live session.
    #[error("adapter not connected")]
    NotConnected,
    /// No adapter registered for (platform, firm).
    #[error("no adapter registered for platform={platform:?} firm={firm:?}")]
    UnknownAdapter {
        platform: crate::adapter::model::Platform,
        firm: crate::adapter::model::Firm,
    },
}

/// Errors from the Copier Engine (§4.3, §7).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("risk gate rejected: {0}")]
    RiskRejected(String),
    #[error("copier is already running")]
    AlreadyRunning,
    #[error("copier cannot start: {0}")]
    CannotStart(String),
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),
    #[error("unrecoverable engine fault: {0}")]
    Fault(String),
}

/// Errors from the Persistence Gateway (§6, §7).
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("not found")]
    NotFound,
    #[error("unauthorised")]
    Unauthorised,
    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },
    /// Uniqueness violation. For `TradeMapping(masterTradeId, slaveAccountId)`
    /// this is the idempotency signal: treat as success, not failure.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl PersistError {
    /// Best-effort classification of a raw `sqlx::Error` as a uniqueness
    /// violation, so callers can map Postgres's `23505` onto `Conflict`.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return PersistError::Conflict(db_err.message().to_string());
            }
        }
        PersistError::Db(err)
    }
}

/// HTTP status mapping for the thin route layer (§7: NotFound/Unauthorised/
/// Validation/Conflict are all surfaced directly to the caller).
impl actix_web::ResponseError for PersistError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            PersistError::NotFound => StatusCode::NOT_FOUND,
            PersistError::Unauthorised => StatusCode::UNAUTHORIZED,
            PersistError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PersistError::Conflict(_) => StatusCode::CONFLICT,
            PersistError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// AuthError/NotConnected are caller errors; transport failures surface as
/// 502 since they originate from the upstream brokerage (§7).
impl actix_web::ResponseError for AdapterError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            AdapterError::Auth(_) => StatusCode::UNAUTHORIZED,
            AdapterError::NotConnected => StatusCode::CONFLICT,
            AdapterError::UnknownAdapter { .. } => StatusCode::NOT_FOUND,
            AdapterError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl actix_web::ResponseError for EngineError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            EngineError::RiskRejected(_) => StatusCode::CONFLICT,
            EngineError::AlreadyRunning => StatusCode::CONFLICT,
            EngineError::CannotStart(_) => StatusCode::CONFLICT,
            EngineError::Adapter(e) => e.status_code(),
            EngineError::Persist(e) => e.status_code(),
            EngineError::Fault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
