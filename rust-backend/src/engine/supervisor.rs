// src/engine/supervisor.rs
//
// Process-wide registry of running `CopierWorker`s (§4.3.6, §4.3.7). Mirrors
// the teacher's `services::scheduler` task-registry shape, keyed by copier
// id instead of strategy id.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::adapter::registry::AdapterRegistry;
use crate::db::models::CopierStatus;
use crate::db::copiers;
use crate::engine::copier_worker::CopierWorker;
use crate::engine::fanout::FanoutContext;
use crate::engine::state_machine::{self, Command};
use crate::utils::errors::EngineError;

pub struct Supervisor {
    ctx: Arc<FanoutContext>,
    adapters: Arc<AdapterRegistry>,
    heartbeat_interval: std::time::Duration,
    workers: DashMap<Uuid, CopierWorker>,
}

impl Supervisor {
    pub fn new(
        ctx: Arc<FanoutContext>,
        adapters: Arc<AdapterRegistry>,
        heartbeat_interval: std::time::Duration,
    ) -> Self {
        Self {
            ctx,
            adapters,
            heartbeat_interval,
            workers: DashMap::new(),
        }
    }

    /// `start`/`resume`: validates the state transition, then runs the
    /// §4.3.2 start sequence. Rolls the persisted status back to its prior
    /// value if the start sequence itself fails, so a bad credential or a
    /// disconnected master account never leaves the row claiming ACTIVE.
    pub async fn start_copier(&self, copier_id: Uuid) -> Result<(), EngineError> {
        let copier = copiers::get_copier_unscoped(&self.ctx.pool, copier_id).await?;
        state_machine::transition(copier.status, Command::Start)?;

        if self.workers.contains_key(&copier_id) {
            return Err(EngineError::AlreadyRunning);
        }

        match CopierWorker::start(
            self.ctx.clone(),
            self.adapters.clone(),
            self.heartbeat_interval,
            copier_id,
        )
        .await
        {
            Ok(worker) => {
                self.workers.insert(copier_id, worker);
                Ok(())
            }
            Err(e) => {
                copiers::set_status(&self.ctx.pool, copier_id, copier.status).await?;
                Err(e)
            }
        }
    }

    /// `stop`/`pause` (§4.3.6). Idempotent: if no worker is running for this
    /// copier, only the persisted status is updated.
    pub async fn stop_copier(&self, copier_id: Uuid, status: CopierStatus) -> Result<(), EngineError> {
        if let Some((_, worker)) = self.workers.remove(&copier_id) {
            worker.stop(&self.ctx, status).await?;
        } else {
            copiers::set_status(&self.ctx.pool, copier_id, status).await?;
        }
        Ok(())
    }

    pub fn is_running(&self, copier_id: Uuid) -> bool {
        self.workers.contains_key(&copier_id)
    }

    /// §4.3.7: on process start, re-subscribes every Copier whose persisted
    /// status is ACTIVE. Follower replication is idempotent via TradeMapping
    /// uniqueness, so re-subscribing is safe even if some executions are
    /// replayed; a copier whose start sequence fails (e.g. master account no
    /// longer connected) is downgraded to STOPPED rather than left ACTIVE
    /// with no running worker.
    pub async fn recover_on_boot(&self) -> Result<(), EngineError> {
        let active = copiers::list_copiers_by_status(&self.ctx.pool, CopierStatus::Active).await?;
        for copier in active {
            match CopierWorker::start(
                self.ctx.clone(),
                self.adapters.clone(),
                self.heartbeat_interval,
                copier.id,
            )
            .await
            {
                Ok(worker) => {
                    self.workers.insert(copier.id, worker);
                }
                Err(e) => {
                    tracing::warn!(copier_id = %copier.id, error = %e, "recovery start failed, downgrading to STOPPED");
                    copiers::set_status(&self.ctx.pool, copier.id, CopierStatus::Stopped).await?;
                }
            }
        }
        Ok(())
    }

    /// Shutdown: stops every running copier so subscriptions/timers are torn
    /// down before adapters disconnect (§5).
    pub async fn stop_all(&self) {
        let ids: Vec<Uuid> = self.workers.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, worker)) = self.workers.remove(&id) {
                if let Err(e) = worker.stop(&self.ctx, CopierStatus::Stopped).await {
                    tracing::warn!(copier_id = %id, error = %e, "error stopping copier during shutdown");
                }
            }
        }
    }
}
