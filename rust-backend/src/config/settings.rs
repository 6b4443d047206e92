// src/config/settings.rs

use dotenv::dotenv;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::adapter::model::Platform;

/// Process-wide configuration, loaded once at start-up from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,

    /// When false, the Adapter Registry only ever resolves mock adapters.
    pub use_real_adapters: bool,
    /// When true, adapters run the shared endpoint-discovery probe instead
    /// of trusting the first candidate base URL.
    pub enable_api_discovery: bool,

    pub http_timeout: Duration,
    pub polling_interval: Duration,
    pub reconnect_cap: Duration,
    pub heartbeat_interval: Duration,

    /// `PLATFORM_BASE_URL_<PLATFORM>` / `PLATFORM_WS_URL_<PLATFORM>` overrides,
    /// keyed by the normalised platform tag (e.g. "RITHMIC").
    pub base_url_overrides: HashMap<Platform, String>,
    pub ws_url_overrides: HashMap<Platform, String>,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok();

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse::<u16>()
            .map_err(|_| "SERVER_PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL missing")?;
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_default();

        let use_real_adapters = bool_env("USE_REAL_ADAPTERS", false);
        let enable_api_discovery = bool_env("ENABLE_API_DISCOVERY", false);

        let http_timeout = Duration::from_millis(u64_env("HTTP_TIMEOUT_MS", 30_000));
        let polling_interval = Duration::from_millis(u64_env("POLLING_INTERVAL_MS", 5_000));
        let reconnect_cap = Duration::from_millis(u64_env("RECONNECT_CAP_MS", 30_000));
        let heartbeat_interval = Duration::from_millis(u64_env("HEARTBEAT_INTERVAL_MS", 30_000));

        let mut base_url_overrides = HashMap::new();
        let mut ws_url_overrides = HashMap::new();
        for platform in Platform::ALL {
            let tag = platform.as_str();
            if let Ok(v) = env::var(format!("PLATFORM_BASE_URL_{tag}")) {
                base_url_overrides.insert(*platform, v);
            }
            if let Ok(v) = env::var(format!("PLATFORM_WS_URL_{tag}")) {
                ws_url_overrides.insert(*platform, v);
            }
        }

        Ok(Self {
            server_port,
            database_url,
            redis_url,
            jwt_secret,
            use_real_adapters,
            enable_api_discovery,
            http_timeout,
            polling_interval,
            reconnect_cap,
            heartbeat_interval,
            base_url_overrides,
            ws_url_overrides,
        })
    }
}

fn bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn u64_env(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
