use std::{net::SocketAddr, str::FromStr, time::Duration};

use tickerlens_core::constants::DEFAULT_BATCH_CONCURRENCY;
use tickerlens_core::EngineConfig;

const DEFAULT_DB_PATH: &str = "./db/cache.db";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub batch_concurrency: usize,
    pub engine: EngineConfig,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::from_lookup(|name| std::env::var(name).ok());
        config.engine = EngineConfig::from_env();
        config
    }

    /// Server settings from an arbitrary variable source. The engine part
    /// starts from its defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let listen_addr = parse_or(&lookup, "TL_LISTEN_ADDR", || {
            SocketAddr::from(([0, 0, 0, 0], 8080))
        });
        let db_path = lookup("TL_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.into());
        let cors_allow = lookup("TL_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = parse_or(&lookup, "TL_REQUEST_TIMEOUT_MS", || {
            DEFAULT_REQUEST_TIMEOUT_MS
        });
        let batch_concurrency: usize = parse_or(&lookup, "TL_BATCH_CONCURRENCY", || {
            DEFAULT_BATCH_CONCURRENCY
        });

        Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            batch_concurrency: batch_concurrency.max(1),
            engine: EngineConfig::default(),
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: impl FnOnce() -> T,
) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using the default", name, raw);
            default()
        }),
        None => default(),
    }
}
