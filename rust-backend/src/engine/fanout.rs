// src/engine/fanout.rs
//
// The fan-out step (§4.3.3): turns one normalised master execution into at
// most one follower order per active `CopierAccountConfig`, run
// concurrently with per-follower failure isolation (§5 "one follower's
// failure must never block others").

use std::sync::Arc;

use futures::future::join_all;
use sqlx::PgPool;
use uuid::Uuid;

use crate::adapter::model::{ConnectConfig, NormalizedExecution, OrderKind, TradeOrder, TradeSide};
use crate::adapter::registry::AdapterRegistry;
use crate::db::models::{Copier, CopierStatus, MappingStatus};
use crate::db::trades::{NewTrade, NewTradeMapping};
use crate::db::{accounts, audit, copiers, trades};
use crate::engine::position_tracker::{Classification, PositionTracker};
use crate::engine::{risk_gate, scaling};
use crate::utils::errors::PersistError;

pub struct FanoutContext {
    pub pool: PgPool,
    pub adapters: Arc<AdapterRegistry>,
}

/// Processes one execution received on a copier's master subscription
/// (§4.3.3 steps 1-5).
pub async fn handle_master_execution(
    ctx: &FanoutContext,
    copier_id: Uuid,
    tracker: &PositionTracker,
    exec: NormalizedExecution,
) {
    let copier = match copiers::get_copier_unscoped(&ctx.pool, copier_id).await {
        Ok(c) => c,
        Err(_) => return,
    };

    if copier.status != CopierStatus::Active {
        return;
    }

    if !passes_copy_filters(&copier, &exec, tracker) {
        return;
    }

    let master_trade = match persist_master_trade(ctx, &copier, &exec).await {
        Ok(trade_id) => trade_id,
        Err(e) => {
            tracing::error!("failed to persist master trade for copier {copier_id}: {e}");
            return;
        }
    };

    let followers = match copiers::list_active_followers(&ctx.pool, copier.id).await {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("failed to load followers for copier {copier_id}: {e}");
            return;
        }
    };

    let tasks = followers.into_iter().map(|config| {
        let ctx = ctx;
        let copier = &copier;
        let exec = &exec;
        async move {
            if let Err(e) =
                replicate_to_follower(ctx, copier, master_trade, config, exec).await
            {
                tracing::warn!("follower replication failed: {e}");
            }
        }
    });

    join_all(tasks).await;
}

fn passes_copy_filters(copier: &Copier, exec: &NormalizedExecution, tracker: &PositionTracker) -> bool {
    if exec.is_modification {
        return copier.copy_modifications;
    }
    match tracker.classify_and_update(exec) {
        Classification::Entry => copier.copy_entries,
        Classification::Exit => copier.copy_exits,
    }
}

async fn persist_master_trade(
    ctx: &FanoutContext,
    copier: &Copier,
    exec: &NormalizedExecution,
) -> Result<Uuid, PersistError> {
    let trade = trades::insert_trade(
        &ctx.pool,
        NewTrade {
            account_id: copier.master_account_id,
            copier_id: Some(copier.id),
            symbol: exec.symbol.clone(),
            side: exec.side,
            order_kind: exec.order_kind,
            quantity: exec.quantity as i32,
            entry_price: exec.price.map(bigdecimal_from_f64),
            stop_loss: exec.stop_loss.map(bigdecimal_from_f64),
            take_profit: exec.take_profit.map(bigdecimal_from_f64),
            status: exec.status,
            filled_at: exec.filled_at,
            realised_pnl: exec.realised_pnl.map(bigdecimal_from_f64),
            external_order_id: Some(exec.external_order_id.clone()),
            external_trade_id: exec.external_trade_id.clone(),
        },
    )
    .await?;

    let side = match exec.side {
        TradeSide::Buy => "BUY",
        TradeSide::Sell => "SELL",
    };
    audit::info(
        &ctx.pool,
        copier.id,
        format!("master fill {} {side} x{}", exec.symbol, exec.quantity),
    )
    .await?;

    Ok(trade.id)
}

async fn replicate_to_follower(
    ctx: &FanoutContext,
    copier: &Copier,
    master_trade_id: Uuid,
    config: crate::db::models::CopierAccountConfig,
    exec: &NormalizedExecution,
) -> Result<(), PersistError> {
    let gate = risk_gate::evaluate(&ctx.pool, &config).await?;
    if let risk_gate::GateOutcome::Rejected { reason, .. } = gate {
        audit::warn(&ctx.pool, copier.id, config.slave_account_id, reason).await?;
        return Ok(());
    }

    let follower_account = accounts::get_unscoped(&ctx.pool, config.slave_account_id).await?;
    let quantity = scaling::scale_quantity(exec.quantity, &config, &follower_account.current_balance);
    if quantity <= 0 {
        audit::warn(
            &ctx.pool,
            copier.id,
            config.slave_account_id,
            format!("scaled quantity {quantity} <= 0, skipping"),
        )
        .await?;
        return Ok(());
    }

    // Claim this (master trade, follower account) pair before touching the
    // broker at all. The uniqueness constraint on `trade_mappings` means a
    // replayed execution hits `Conflict` here and returns before ever
    // placing a second order — the prior attempt, synced or failed, already
    // owns this pair (§8 "replaying the same master execution twice
    // produces exactly one follower Trade per active follower").
    let mapping = match trades::insert_mapping(
        &ctx.pool,
        NewTradeMapping {
            master_trade_id,
            slave_account_id: config.slave_account_id,
            copier_id: copier.id,
            slave_trade_id: None,
            status: MappingStatus::Pending,
            error_message: None,
        },
    )
    .await
    {
        Ok(m) => m,
        Err(PersistError::Conflict(_)) => return Ok(()),
        Err(e) => return Err(e),
    };

    let adapter = match ctx.adapters.get_adapter(follower_account.platform, follower_account.firm) {
        Ok(a) => a,
        Err(e) => {
            trades::mark_mapping_failed(&ctx.pool, mapping.id, &e.to_string()).await?;
            audit::warn(&ctx.pool, copier.id, config.slave_account_id, e.to_string()).await?;
            return Ok(());
        }
    };

    if !adapter.is_connected() {
        let cfg = ConnectConfig {
            email: follower_account.email.clone(),
            password: follower_account.password.clone(),
            api_key: follower_account.api_key.clone(),
            api_secret: follower_account.api_secret.clone(),
            account_number: Some(follower_account.account_number.clone()),
            environment: None,
            base_url_override: None,
        };
        if let Err(e) = adapter.connect(cfg).await {
            record_failure(ctx, copier, master_trade_id, &config, mapping.id, &e.to_string()).await?;
            return Ok(());
        }
    }

    let order = TradeOrder {
        symbol: exec.symbol.clone(),
        side: exec.side,
        order_kind: OrderKind::Market,
        quantity,
        price: None,
        stop_loss: exec.stop_loss,
        take_profit: exec.take_profit,
    };

    match adapter.place_order(&order).await {
        Ok(execution) => {
            let follower_trade = trades::insert_trade(
                &ctx.pool,
                NewTrade {
                    account_id: config.slave_account_id,
                    copier_id: Some(copier.id),
                    symbol: exec.symbol.clone(),
                    side: exec.side,
                    order_kind: OrderKind::Market,
                    quantity: execution.filled_quantity as i32,
                    entry_price: execution.filled_price.map(bigdecimal_from_f64),
                    stop_loss: exec.stop_loss.map(bigdecimal_from_f64),
                    take_profit: exec.take_profit.map(bigdecimal_from_f64),
                    status: execution.status,
                    filled_at: Some(chrono::Utc::now()),
                    realised_pnl: None,
                    external_order_id: Some(execution.external_order_id.clone()),
                    external_trade_id: execution.external_trade_id.clone(),
                },
            )
            .await?;

            trades::mark_mapping_synced(&ctx.pool, mapping.id, follower_trade.id).await
        }
        Err(e) => record_failure(ctx, copier, master_trade_id, &config, mapping.id, &e.to_string()).await,
    }
}

async fn record_failure(
    ctx: &FanoutContext,
    copier: &Copier,
    master_trade_id: Uuid,
    config: &crate::db::models::CopierAccountConfig,
    mapping_id: Uuid,
    message: &str,
) -> Result<(), PersistError> {
    trades::mark_mapping_failed(&ctx.pool, mapping_id, message).await?;
    audit::error(&ctx.pool, copier.id, master_trade_id, config.slave_account_id, message).await
}

fn bigdecimal_from_f64(value: f64) -> bigdecimal::BigDecimal {
    bigdecimal::BigDecimal::try_from(value).unwrap_or_default()
}
