// src/adapter/registry.rs
//
// The process-wide `(Platform, Firm)` -> `Adapter` lookup table (§4.2).
// Built once at startup from `Settings` and shared via `web::Data`/the
// copier supervisor; adapter instances are created lazily and cached so two
// trading accounts on the same firm/platform share one connection.

use std::sync::Arc;

use dashmap::DashMap;

use super::discovery::DiscoveryCache;
use super::mock::MockAdapter;
use super::model::{Firm, Platform};
use super::{ninjatrader, projectx, rithmic, tradovate, Adapter};
use crate::config::Settings;
use crate::utils::errors::AdapterError;

/// Which concrete implementation backs a `(Platform, Firm)` pair (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backing {
    Rithmic,
    ProjectX,
    Tradovate,
    NinjaTrader,
    /// No real integration exists yet; always served by the in-memory mock.
    MockOnly,
}

fn backing_for(platform: Platform, firm: Firm) -> Option<Backing> {
    use Firm::*;
    use Platform::*;
    match (platform, firm) {
        (Rithmic, TopstepX) => Some(Backing::MockOnly),
        (Rithmic, TakeProfitTrader | MyFundedFutures | AlphaFutures | Tradefy) => {
            Some(Backing::Rithmic)
        }
        (ProjectX, TopstepX) => Some(Backing::ProjectX),
        (Tradovate, TakeProfitTrader | MyFundedFutures) => Some(Backing::Tradovate),
        (NinjaTrader, TakeProfitTrader | MyFundedFutures) => Some(Backing::NinjaTrader),
        _ => None,
    }
}

pub struct AdapterRegistry {
    settings: Settings,
    discovery_cache: Arc<DiscoveryCache>,
    instances: DashMap<(Platform, Firm), Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            discovery_cache: Arc::new(DiscoveryCache::new()),
            instances: DashMap::new(),
        }
    }

    /// Returns the shared adapter instance for `(platform, firm)`, building
    /// it on first use. Unmapped combinations fail with
    /// `AdapterError::UnknownAdapter` (§4.2).
    pub fn get_adapter(
        &self,
        platform: Platform,
        firm: Firm,
    ) -> Result<Arc<dyn Adapter>, AdapterError> {
        if let Some(existing) = self.instances.get(&(platform, firm)) {
            return Ok(existing.clone());
        }

        let backing = backing_for(platform, firm).ok_or(AdapterError::UnknownAdapter { platform, firm })?;
        let adapter = self.build(platform, firm, backing);
        self.instances.insert((platform, firm), adapter.clone());
        Ok(adapter)
    }

    fn build(&self, platform: Platform, firm: Firm, backing: Backing) -> Arc<dyn Adapter> {
        if !self.settings.use_real_adapters || backing == Backing::MockOnly {
            return Arc::new(MockAdapter::new(firm, platform));
        }

        let polling = self.settings.polling_interval;
        let reconnect_cap = self.settings.reconnect_cap;
        let discovery = self.settings.enable_api_discovery;
        let cache = self.discovery_cache.clone();

        match backing {
            Backing::Rithmic => rithmic::new_adapter(firm, polling, reconnect_cap, discovery, cache),
            Backing::ProjectX => projectx::new_adapter(firm, polling, reconnect_cap, discovery, cache),
            Backing::Tradovate => tradovate::new_adapter(firm, polling, reconnect_cap, discovery, cache),
            Backing::NinjaTrader => ninjatrader::new_adapter(firm, polling, reconnect_cap, discovery, cache),
            Backing::MockOnly => Arc::new(MockAdapter::new(firm, platform)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_settings(use_real: bool) -> Settings {
        Settings {
            server_port: 8080,
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1".into(),
            jwt_secret: "secret".into(),
            use_real_adapters: use_real,
            enable_api_discovery: false,
            http_timeout: Duration::from_secs(30),
            polling_interval: Duration::from_secs(5),
            reconnect_cap: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(30),
            base_url_overrides: Default::default(),
            ws_url_overrides: Default::default(),
        }
    }

    #[test]
    fn topstepx_on_rithmic_is_always_mock() {
        let registry = AdapterRegistry::new(test_settings(true));
        let adapter = registry
            .get_adapter(Platform::Rithmic, Firm::TopstepX)
            .expect("mapped");
        assert_eq!(adapter.identity(), (Firm::TopstepX, Platform::Rithmic));
    }

    #[test]
    fn unmapped_combination_is_rejected() {
        let registry = AdapterRegistry::new(test_settings(true));
        let result = registry.get_adapter(Platform::Tradovate, Firm::TopstepX);
        assert!(matches!(result, Err(AdapterError::UnknownAdapter { .. })));
    }

    #[test]
    fn repeated_lookups_return_the_same_instance() {
        let registry = AdapterRegistry::new(test_settings(false));
        let a = registry.get_adapter(Platform::Rithmic, Firm::Tradefy).unwrap();
        let b = registry.get_adapter(Platform::Rithmic, Firm::Tradefy).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn mock_mode_serves_mock_even_for_mapped_combination() {
        let registry = AdapterRegistry::new(test_settings(false));
        let adapter = registry
            .get_adapter(Platform::ProjectX, Firm::TopstepX)
            .expect("mapped");
        assert_eq!(adapter.identity(), (Firm::TopstepX, Platform::ProjectX));
    }
}
