// src/engine/copier_worker.rs
//
// The per-copier background task (§4.3.2, §4.3.6): owns the master adapter
// subscription, the 30s heartbeat, and the copier's in-memory position
// tracker. One `CopierWorker` exists per ACTIVE copier; the supervisor owns
// the map of `copier_id -> CopierWorker`.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::adapter::model::ConnectConfig;
use crate::adapter::registry::AdapterRegistry;
use crate::adapter::Disposer;
use crate::db::models::CopierStatus;
use crate::db::{accounts, audit, copiers};
use crate::engine::fanout::{self, FanoutContext};
use crate::engine::position_tracker::PositionTracker;
use crate::utils::errors::EngineError;

/// A running copier: its master subscription disposer and heartbeat task,
/// held so `stop`/`pause` can tear both down (§4.3.6).
pub struct CopierWorker {
    copier_id: Uuid,
    disposer: AsyncMutex<Option<Disposer>>,
    heartbeat: AsyncMutex<Option<JoinHandle<()>>>,
    tracker: Arc<PositionTracker>,
}

impl CopierWorker {
    /// Executes the §4.3.2 start sequence: loads the copier, confirms the
    /// master account is connected, subscribes to its trade stream, and
    /// starts the heartbeat. Returns a running worker on success.
    pub async fn start(
        ctx: Arc<FanoutContext>,
        adapters: Arc<AdapterRegistry>,
        heartbeat_interval: std::time::Duration,
        copier_id: Uuid,
    ) -> Result<Self, EngineError> {
        let copier = copiers::get_copier_unscoped(&ctx.pool, copier_id).await?;
        let master_account = accounts::get_unscoped(&ctx.pool, copier.master_account_id).await?;

        if !master_account.is_connected {
            return Err(EngineError::CannotStart(format!(
                "master account {} is not connected",
                master_account.id
            )));
        }

        let adapter = adapters.get_adapter(master_account.platform, master_account.firm)?;

        if !adapter.is_connected() {
            let cfg = ConnectConfig {
                email: master_account.email.clone(),
                password: master_account.password.clone(),
                api_key: master_account.api_key.clone(),
                api_secret: master_account.api_secret.clone(),
                account_number: Some(master_account.account_number.clone()),
                environment: None,
                base_url_override: None,
            };
            adapter.connect(cfg).await?;
        }

        let tracker = Arc::new(PositionTracker::new());

        let disposer = {
            let ctx = ctx.clone();
            let tracker = tracker.clone();
            adapter.on_trade_update(Arc::new(move |exec| {
                let ctx = ctx.clone();
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    fanout::handle_master_execution(&ctx, copier_id, &tracker, exec).await;
                });
            }))
        };

        let heartbeat = {
            let ctx = ctx.clone();
            let adapter = adapter.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(heartbeat_interval);
                loop {
                    ticker.tick().await;
                    let connected = adapter.is_connected();
                    tracing::info!(%copier_id, connected, "copier heartbeat");
                    if !connected {
                        let _ = audit::warn(
                            &ctx.pool,
                            copier_id,
                            master_account.id,
                            "heartbeat detected master adapter disconnected",
                        )
                        .await;
                    }
                }
            })
        };

        copiers::set_status(&ctx.pool, copier_id, CopierStatus::Active).await?;
        audit::info(&ctx.pool, copier_id, "copier started").await?;

        Ok(Self {
            copier_id,
            disposer: AsyncMutex::new(Some(disposer)),
            heartbeat: AsyncMutex::new(Some(heartbeat)),
            tracker,
        })
    }

    /// §4.3.6: disposes the subscription, clears the heartbeat, persists the
    /// given terminal status, and logs. Idempotent — calling `stop` twice is
    /// a no-op the second time.
    pub async fn stop(&self, ctx: &FanoutContext, status: CopierStatus) -> Result<(), EngineError> {
        if let Some(disposer) = self.disposer.lock().await.take() {
            disposer();
        }
        if let Some(handle) = self.heartbeat.lock().await.take() {
            handle.abort();
        }
        copiers::set_status(&ctx.pool, self.copier_id, status).await?;
        audit::info(&ctx.pool, self.copier_id, format!("copier {status:?}")).await?;
        Ok(())
    }

    pub fn tracker(&self) -> Arc<PositionTracker> {
        self.tracker.clone()
    }
}
