// src/engine/scaling.rs
//
// Pure scaling math (§4.3.5): maps a master fill quantity onto a follower
// quantity given the follower's `CopierAccountConfig`. No I/O, so this is
// tested directly against the seed scenarios in §8 rather than through a
// mock adapter.

use bigdecimal::{BigDecimal, ToPrimitive};

use crate::db::models::{CopierAccountConfig, ScalingType};

/// Computes q' for a master fill of `master_quantity`, then clamps to
/// `[0, maxContracts]` when set (§4.3.5 final step).
pub fn scale_quantity(master_quantity: i64, config: &CopierAccountConfig, follower_balance: &BigDecimal) -> i64 {
    let raw = match config.scaling_type {
        ScalingType::Fixed => config.fixed_contracts.map(i64::from).unwrap_or(master_quantity),
        ScalingType::Percentage => {
            let ratio = config
                .percentage_scale
                .as_ref()
                .and_then(ToPrimitive::to_f64)
                .unwrap_or(1.0);
            ((master_quantity as f64) * ratio).floor() as i64
        }
        ScalingType::BalanceBased => {
            let reference = config
                .balance_reference_size
                .to_f64()
                .filter(|r| *r > 0.0)
                .unwrap_or(50_000.0);
            let balance = follower_balance.to_f64().unwrap_or(0.0);
            ((master_quantity as f64) * (balance / reference)).floor() as i64
        }
    };

    let clamped = raw.max(0);
    match config.max_contracts {
        Some(cap) => clamped.min(i64::from(cap)),
        None => clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use std::str::FromStr;
    use uuid::Uuid;

    fn base_config(scaling_type: ScalingType) -> CopierAccountConfig {
        CopierAccountConfig {
            id: Uuid::new_v4(),
            copier_id: Uuid::new_v4(),
            slave_account_id: Uuid::new_v4(),
            scaling_type,
            fixed_contracts: None,
            percentage_scale: None,
            balance_reference_size: BigDecimal::from_str("50000").unwrap(),
            max_contracts: None,
            daily_loss_limit: None,
            auto_disable: false,
            is_active: true,
            disabled_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn fixed_uses_configured_contracts() {
        let mut config = base_config(ScalingType::Fixed);
        config.fixed_contracts = Some(2);
        assert_eq!(scale_quantity(1, &config, &BigDecimal::from(0)), 2);
    }

    #[test]
    fn fixed_falls_back_to_master_quantity_when_unset() {
        let config = base_config(ScalingType::Fixed);
        assert_eq!(scale_quantity(3, &config, &BigDecimal::from(0)), 3);
    }

    #[test]
    fn percentage_scaling_rounds_down() {
        let mut config = base_config(ScalingType::Percentage);
        config.percentage_scale = Some(BigDecimal::from_str("0.5").unwrap());
        assert_eq!(scale_quantity(3, &config, &BigDecimal::from(0)), 1);
    }

    #[test]
    fn percentage_zero_yields_zero() {
        let mut config = base_config(ScalingType::Percentage);
        config.percentage_scale = Some(BigDecimal::from(0));
        assert_eq!(scale_quantity(5, &config, &BigDecimal::from(0)), 0);
    }

    #[test]
    fn balance_based_uses_default_reference_of_50000() {
        let config = base_config(ScalingType::BalanceBased);
        let balance = BigDecimal::from_str("25000").unwrap();
        assert_eq!(scale_quantity(4, &config, &balance), 2);
    }

    #[test]
    fn max_contracts_clamps_down() {
        let mut config = base_config(ScalingType::Fixed);
        config.fixed_contracts = Some(10);
        config.max_contracts = Some(3);
        assert_eq!(scale_quantity(1, &config, &BigDecimal::from(0)), 3);
    }

    #[test]
    fn max_contracts_zero_skips_follower() {
        let mut config = base_config(ScalingType::Fixed);
        config.fixed_contracts = Some(5);
        config.max_contracts = Some(0);
        assert_eq!(scale_quantity(1, &config, &BigDecimal::from(0)), 0);
    }
}
