// src/adapter/transport.rs
//
// Shared connection-lifecycle plumbing (§4.1.1): base-URL candidate
// selection, the auth-endpoint/credential-shape probe loop, and the
// exponential-backoff reconnect policy. Every concrete adapter drives its
// `connect`/reconnect loop through this module instead of re-implementing
// the probe/backoff logic per platform family.

use std::time::Duration;

use serde_json::json;

use super::model::{ConnectConfig, CredentialShape};
use super::signer::{current_timestamp, generate_nonce, HmacSigner, Signer};
use crate::utils::errors::{AdapterError, ApiError};

/// Auth endpoints tried, in order, against every candidate base URL (§4.1.1.2).
pub const AUTH_ENDPOINTS: &[&str] = &[
    "/auth/login",
    "/api/auth/login",
    "/v1/auth/login",
    "/login",
    "/api/login",
    "/authenticate",
    "/api/authenticate",
    "/oauth/token",
];

/// Per-firm overrides first, then platform-family defaults (§4.1.1.1).
pub fn candidate_base_urls(per_firm_overrides: &[String], platform_defaults: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(per_firm_overrides.len() + platform_defaults.len());
    out.extend(per_firm_overrides.iter().cloned());
    out.extend(platform_defaults.iter().cloned());
    out
}

/// `min(1000 * 2^attempt, cap)` — the reconnect backoff schedule (§4.1.1.4).
pub fn reconnect_delay(attempt: u32, cap: Duration) -> Duration {
    let millis = 1000u64.saturating_mul(1u64 << attempt.min(20));
    Duration::from_millis(millis).min(cap)
}

/// Up to this many reconnect attempts before the adapter gives up (§4.1.1.4).
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// The cached result of a successful auth probe: the `(baseUrl, endpoint,
/// authShape)` tuple the session can skip re-discovering on reconnect
/// (§9 "Endpoint discovery is an expensive one-shot").
#[derive(Debug, Clone)]
pub struct AuthProbeOutcome {
    pub base_url: String,
    pub endpoint: &'static str,
    pub shape_description: String,
    pub session_token: Option<String>,
}

/// Status-based triage of a single auth attempt.
enum AttemptOutcome {
    Success(Option<String>),
    /// 4xx: try the next endpoint.
    ClientRejected,
    /// 5xx: abandon this base URL entirely.
    ServerFailed,
}

async fn try_one(
    http: &reqwest::Client,
    base_url: &str,
    endpoint: &str,
    shape: CredentialShape<'_>,
) -> Result<AttemptOutcome, ApiError> {
    let signer = HmacSigner;
    let ts = current_timestamp();
    let nonce = generate_nonce();

    let body = match shape {
        CredentialShape::EmailPassword { email, password } => {
            json!({ "email": email, "password": password })
        }
        CredentialShape::ApiKeySecret { key, secret } => {
            let sign = signer.sign_rest(secret, "POST", endpoint, &ts, &nonce, "");
            json!({ "apiKey": key, "timestamp": ts, "nonce": nonce, "signature": sign })
        }
        CredentialShape::UsernamePassword { account_number, password } => {
            json!({ "username": account_number, "password": password })
        }
    };

    let url = format!("{base_url}{endpoint}");
    let resp = http.post(&url).json(&body).send().await?;
    let status = resp.status();

    if status.is_success() {
        #[derive(serde::Deserialize)]
        struct TokenBody {
            token: Option<String>,
        }
        let token = resp
            .json::<TokenBody>()
            .await
            .ok()
            .and_then(|b| b.token);
        Ok(AttemptOutcome::Success(token))
    } else if status.is_client_error() {
        Ok(AttemptOutcome::ClientRejected)
    } else {
        Ok(AttemptOutcome::ServerFailed)
    }
}

/// Runs the full auth probe: for each candidate base URL, try each auth
/// endpoint, trying each credential shape in order (a) email+password,
/// (b) apiKey+apiSecret, (c) username+password. First 2xx wins (§4.1.1.2).
pub async fn probe_auth(
    http: &reqwest::Client,
    candidates: &[String],
    cfg: &ConnectConfig,
) -> Result<AuthProbeOutcome, AdapterError> {
    let shapes = cfg.credential_shapes();
    if shapes.is_empty() {
        return Err(AdapterError::Auth(
            "no usable credential shape in ConnectConfig".into(),
        ));
    }

    'bases: for base_url in candidates {
        'endpoints: for endpoint in AUTH_ENDPOINTS {
            for shape in &shapes {
                let outcome = try_one(http, base_url, endpoint, *shape)
                    .await
                    .map_err(AdapterError::Transport)?;
                match outcome {
                    AttemptOutcome::Success(token) => {
                        return Ok(AuthProbeOutcome {
                            base_url: base_url.clone(),
                            endpoint,
                            shape_description: shape_label(*shape),
                            session_token: token,
                        });
                    }
                    AttemptOutcome::ClientRejected => continue 'endpoints,
                    AttemptOutcome::ServerFailed => continue 'bases,
                }
            }
        }
    }

    Err(AdapterError::Auth(
        "no base URL/endpoint/credential combination succeeded".into(),
    ))
}

fn shape_label(shape: CredentialShape<'_>) -> String {
    match shape {
        CredentialShape::EmailPassword { .. } => "email_password".into(),
        CredentialShape::ApiKeySecret { .. } => "api_key_secret".into(),
        CredentialShape::UsernamePassword { .. } => "username_password".into(),
    }
}

/// A minimal polling-fallback timer: ticks at a fixed interval, used when
/// the auth probe yields no session token to attach a push stream to
/// (§4.1.1.3). Each tick is expected to drive a trade-fetch REST call.
pub struct PollingTimer {
    interval: tokio::time::Interval,
}

impl PollingTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            interval: tokio::time::interval(period),
        }
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_order_is_overrides_then_defaults() {
        let overrides = vec!["https://firm.example".to_string()];
        let defaults = vec!["https://platform-a.example".to_string(), "https://platform-b.example".to_string()];
        let candidates = candidate_base_urls(&overrides, &defaults);
        assert_eq!(
            candidates,
            vec![
                "https://firm.example".to_string(),
                "https://platform-a.example".to_string(),
                "https://platform-b.example".to_string(),
            ]
        );
    }

    #[test]
    fn reconnect_delay_doubles_up_to_cap() {
        let cap = Duration::from_millis(30_000);
        assert_eq!(reconnect_delay(0, cap), Duration::from_millis(1000));
        assert_eq!(reconnect_delay(1, cap), Duration::from_millis(2000));
        assert_eq!(reconnect_delay(2, cap), Duration::from_millis(4000));
        assert_eq!(reconnect_delay(3, cap), Duration::from_millis(8000));
        assert_eq!(reconnect_delay(4, cap), Duration::from_millis(16000));
        // 2^5 * 1000 = 32000 > cap
        assert_eq!(reconnect_delay(5, cap), cap);
        assert_eq!(reconnect_delay(10, cap), cap);
    }

    #[test]
    fn auth_endpoint_order_matches_spec() {
        assert_eq!(AUTH_ENDPOINTS[0], "/auth/login");
        assert_eq!(AUTH_ENDPOINTS.last(), Some(&"/oauth/token"));
        assert_eq!(AUTH_ENDPOINTS.len(), 8);
    }
}
