// src/adapter/discovery.rs
//
// The shared endpoint-discovery helper (§4.1.2): probes candidate base URLs
// for a working `(authEndpoint, accountEndpoint, tradesEndpoint)` tuple so
// firms sharing a platform family can be onboarded without hard-coded URLs.
// Discovery is an expensive one-shot (§9) — callers cache the result
// alongside the account so subsequent connects skip probing.

use std::collections::HashMap;
use std::sync::Mutex;

use super::model::ConnectConfig;
use super::transport::{self, AuthProbeOutcome};
use crate::utils::errors::AdapterError;

#[derive(Debug, Clone)]
pub struct DiscoveredEndpoints {
    pub base_url: String,
    pub auth_endpoint: &'static str,
    pub account_endpoint: String,
    pub trades_endpoint: String,
    pub session_token: Option<String>,
}

/// Probes each candidate in turn: auth probe, then — using whatever session
/// the auth probe yielded — an account-info probe. The first candidate
/// where both succeed wins.
pub async fn discover(
    http: &reqwest::Client,
    candidates: &[String],
    cfg: &ConnectConfig,
    account_path: &str,
    trades_path: &str,
) -> Result<DiscoveredEndpoints, AdapterError> {
    for base in candidates {
        let single = std::slice::from_ref(base);
        let auth: AuthProbeOutcome = match transport::probe_auth(http, single, cfg).await {
            Ok(outcome) => outcome,
            Err(_) => continue,
        };

        let account_url = format!("{base}{account_path}");
        let mut req = http.get(&account_url);
        if let Some(token) = &auth.session_token {
            req = req.bearer_auth(token);
        }
        let probe = req.send().await;
        let account_ok = matches!(probe, Ok(resp) if resp.status().is_success());
        if !account_ok {
            continue;
        }

        return Ok(DiscoveredEndpoints {
            base_url: base.clone(),
            auth_endpoint: auth.endpoint,
            account_endpoint: account_path.to_string(),
            trades_endpoint: trades_path.to_string(),
            session_token: auth.session_token,
        });
    }

    Err(AdapterError::Auth(
        "endpoint discovery exhausted all candidates".into(),
    ))
}

/// Process-wide cache of resolved endpoint tuples, keyed by account number.
/// Avoids re-running discovery on every reconnect within the process
/// lifetime (§9).
#[derive(Default)]
pub struct DiscoveryCache {
    inner: Mutex<HashMap<String, DiscoveredEndpoints>>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account_number: &str) -> Option<DiscoveredEndpoints> {
        self.inner.lock().unwrap().get(account_number).cloned()
    }

    pub fn put(&self, account_number: &str, endpoints: DiscoveredEndpoints) {
        self.inner
            .lock()
            .unwrap()
            .insert(account_number.to_string(), endpoints);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_roundtrips() {
        let cache = DiscoveryCache::new();
        assert!(cache.get("acct-1").is_none());
        cache.put(
            "acct-1",
            DiscoveredEndpoints {
                base_url: "https://example.com".into(),
                auth_endpoint: "/auth/login",
                account_endpoint: "/account".into(),
                trades_endpoint: "/trades".into(),
                session_token: Some("tok".into()),
            },
        );
        let hit = cache.get("acct-1").expect("cached");
        assert_eq!(hit.base_url, "https://example.com");
    }
}
