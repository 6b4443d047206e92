// src/engine/risk_gate.rs
//
// The per-follower risk gate (§4.3.4): evaluated before scaling on every
// master fill. Only the config-level daily loss is a hard rejection in this
// core; account-level `maxDrawdown`/`dailyLossLimit` and `RiskRule` rows are
// advisory extensions a caller MAY layer on top (§4.3.4, §9).

use bigdecimal::BigDecimal;
use sqlx::PgPool;

use crate::db::models::CopierAccountConfig;
use crate::db::{copiers, trades};
use crate::utils::errors::PersistError;

pub enum GateOutcome {
    Allowed,
    /// Rejected; `auto_disabled` is true when this rejection also flipped
    /// the follower binding to `isActive=false` (§4.3.4).
    Rejected { reason: String, auto_disabled: bool },
}

/// Evaluates the daily-loss gate for one follower binding. `>=` rejects, not
/// `>` (§8 boundary behaviour: "sum exactly equal to the limit rejects").
pub async fn evaluate(
    pool: &PgPool,
    config: &CopierAccountConfig,
) -> Result<GateOutcome, PersistError> {
    let Some(limit) = &config.daily_loss_limit else {
        return Ok(GateOutcome::Allowed);
    };

    let realised = trades::sum_realised_pnl_today(pool, config.slave_account_id).await?;
    let loss = -realised.clone();

    if loss >= *limit {
        let reason = format!(
            "daily realised P&L {realised} meets or exceeds loss limit {limit} for account {}",
            config.slave_account_id
        );

        let mut auto_disabled = false;
        if config.auto_disable {
            copiers::disable_follower(pool, config.id, reason.clone()).await?;
            auto_disabled = true;
        }

        return Ok(GateOutcome::Rejected { reason, auto_disabled });
    }

    Ok(GateOutcome::Allowed)
}

/// Standalone boundary check used by unit tests and by `evaluate` above —
/// kept pure so the `>=` rule is independently testable without a pool.
pub fn exceeds_limit(realised_pnl_sum: &BigDecimal, limit: &BigDecimal) -> bool {
    let loss = -realised_pnl_sum.clone();
    loss >= *limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn loss_exactly_at_limit_rejects() {
        let sum = BigDecimal::from_str("-500").unwrap();
        let limit = BigDecimal::from_str("500").unwrap();
        assert!(exceeds_limit(&sum, &limit));
    }

    #[test]
    fn loss_below_limit_passes() {
        let sum = BigDecimal::from_str("-400").unwrap();
        let limit = BigDecimal::from_str("500").unwrap();
        assert!(!exceeds_limit(&sum, &limit));
    }

    #[test]
    fn profit_never_rejects() {
        let sum = BigDecimal::from_str("800").unwrap();
        let limit = BigDecimal::from_str("500").unwrap();
        assert!(!exceeds_limit(&sum, &limit));
    }
}
