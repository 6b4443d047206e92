// src/account_manager.rs
//
// The Account Manager (§4.4): platform onboarding and per-account connection
// lifecycle. Generalises the teacher's `db::api_keys::ApiKey` upsert-by-
// `(user, exchange)` pattern into upsert-by-`(userId, firm, accountNumber)`.

use bigdecimal::{BigDecimal, FromPrimitive};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapter::model::{AccountSnapshot, ConnectConfig, Firm, Platform};
use crate::adapter::registry::AdapterRegistry;
use crate::db::accounts::{self, NewTradingAccount};
use crate::db::models::TradingAccount;
use crate::utils::errors::{AdapterError, PersistError};

pub struct AccountManager {
    pool: sqlx::PgPool,
    adapters: std::sync::Arc<AdapterRegistry>,
}

/// A platform account discovered via `connectPlatform`, echoed back with
/// secrets masked per §4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredAccount {
    pub account_number: String,
    pub balance: f64,
    pub equity: f64,
}

/// Echoes which credential fields were supplied, as booleans only — never
/// the values themselves (§9 "only booleans for presence").
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CredentialEcho {
    pub email: bool,
    pub password: bool,
    pub api_key: bool,
    pub api_secret: bool,
    pub account_number: bool,
}

impl CredentialEcho {
    fn from_config(credentials: &ConnectConfig) -> Self {
        Self {
            email: credentials.email.is_some(),
            password: credentials.password.is_some(),
            api_key: credentials.api_key.is_some(),
            api_secret: credentials.api_secret.is_some(),
            account_number: credentials.account_number.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformConnectSummary {
    pub accounts: Vec<DiscoveredAccount>,
    pub credentials: CredentialEcho,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestConnectionResult {
    pub success: bool,
    pub message: String,
    pub snapshot: Option<AccountSnapshot>,
}

#[derive(thiserror::Error, Debug)]
pub enum AccountManagerError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl actix_web::ResponseError for AccountManagerError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            AccountManagerError::Adapter(e) => e.status_code(),
            AccountManagerError::Persist(e) => e.status_code(),
        }
    }
}

impl AccountManager {
    pub fn new(pool: sqlx::PgPool, adapters: std::sync::Arc<AdapterRegistry>) -> Self {
        Self { pool, adapters }
    }

    /// `connectPlatform` (§4.4): resolves the adapter, connects transiently,
    /// enumerates accounts, disconnects, and returns a summary. Never
    /// persists on its own.
    pub async fn connect_platform(
        &self,
        firm: Firm,
        platform: Platform,
        credentials: ConnectConfig,
    ) -> Result<PlatformConnectSummary, AccountManagerError> {
        let adapter = self.adapters.get_adapter(platform, firm)?;
        let echo = CredentialEcho::from_config(&credentials);
        adapter.connect(credentials).await?;
        let snapshots = adapter.get_all_accounts().await?;
        adapter.disconnect().await;

        Ok(PlatformConnectSummary {
            accounts: snapshots
                .into_iter()
                .map(|s| DiscoveredAccount {
                    account_number: s.account_id,
                    balance: s.balance,
                    equity: s.equity,
                })
                .collect(),
            credentials: echo,
        })
    }

    /// `createAccountsFromPlatform` (§4.4): upserts each discovered account
    /// keyed by `(userId, firm, accountNumber)`, storing the credentials
    /// supplied and marking it connected.
    pub async fn create_accounts_from_platform(
        &self,
        user_id: Uuid,
        firm: Firm,
        platform: Platform,
        discovered: &[DiscoveredAccount],
        credentials: &ConnectConfig,
    ) -> Result<Vec<TradingAccount>, PersistError> {
        let mut created = Vec::with_capacity(discovered.len());
        for account in discovered {
            let nominal_size = BigDecimal::from_f64(account.balance).unwrap_or_default();
            let row = accounts::create(
                &self.pool,
                NewTradingAccount {
                    user_id,
                    firm,
                    platform,
                    account_number: account.account_number.clone(),
                    nominal_size,
                    email: credentials.email.clone(),
                    password: credentials.password.clone(),
                    api_key: credentials.api_key.clone(),
                    api_secret: credentials.api_secret.clone(),
                    max_drawdown: None,
                    daily_loss_limit: None,
                    additional_config: None,
                },
            )
            .await?;
            accounts::set_connection_state(&self.pool, row.id, true, None).await?;
            created.push(accounts::get(&self.pool, row.id, user_id).await?);
        }
        Ok(created)
    }

    /// `connect(accountId)` (§4.4): opens a live session and persists the
    /// resulting connection state, including the error on failure.
    pub async fn connect(&self, user_id: Uuid, account_id: Uuid) -> Result<(), AccountManagerError> {
        let account = accounts::get(&self.pool, account_id, user_id).await?;
        let adapter = self.adapters.get_adapter(account.platform, account.firm)?;

        let cfg = ConnectConfig {
            email: account.email.clone(),
            password: account.password.clone(),
            api_key: account.api_key.clone(),
            api_secret: account.api_secret.clone(),
            account_number: Some(account.account_number.clone()),
            environment: None,
            base_url_override: None,
        };

        match adapter.connect(cfg).await {
            Ok(()) => {
                accounts::set_connection_state(&self.pool, account_id, true, None).await?;
                Ok(())
            }
            Err(e) => {
                accounts::set_connection_state(&self.pool, account_id, false, Some(e.to_string()))
                    .await?;
                Err(e.into())
            }
        }
    }

    /// `disconnect(accountId)`.
    pub async fn disconnect(&self, user_id: Uuid, account_id: Uuid) -> Result<(), AccountManagerError> {
        let account = accounts::get(&self.pool, account_id, user_id).await?;
        let adapter = self.adapters.get_adapter(account.platform, account.firm)?;
        adapter.disconnect().await;
        accounts::set_connection_state(&self.pool, account_id, false, None).await?;
        Ok(())
    }

    /// `testConnection(payload)` (§4.4): a transient connect -> getAccountInfo
    /// -> disconnect that never touches persistence.
    pub async fn test_connection(
        &self,
        firm: Firm,
        platform: Platform,
        credentials: ConnectConfig,
    ) -> TestConnectionResult {
        let adapter = match self.adapters.get_adapter(platform, firm) {
            Ok(a) => a,
            Err(e) => {
                return TestConnectionResult {
                    success: false,
                    message: e.to_string(),
                    snapshot: None,
                }
            }
        };

        if let Err(e) = adapter.connect(credentials).await {
            return TestConnectionResult {
                success: false,
                message: e.to_string(),
                snapshot: None,
            };
        }

        let result = adapter.get_account_info().await;
        adapter.disconnect().await;

        match result {
            Ok(snapshot) => TestConnectionResult {
                success: true,
                message: "connected".to_string(),
                snapshot: Some(snapshot),
            },
            Err(e) => TestConnectionResult {
                success: false,
                message: e.to_string(),
                snapshot: None,
            },
        }
    }

    /// Deletes a `TradingAccount`, refusing when referenced by a Copier as
    /// master or follower (§4.4 deletion guard, enforced by the gateway).
    pub async fn delete_account(&self, user_id: Uuid, account_id: Uuid) -> Result<(), PersistError> {
        accounts::delete(&self.pool, account_id, user_id).await
    }
}
