use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub slot_hold_ttl_minutes: i64,
    pub remote_latency_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| {
                    warn!("BIND_ADDR not set, using default");
                    "0.0.0.0:3000".to_string()
                }),
            slot_hold_ttl_minutes: env::var("SLOT_HOLD_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("SLOT_HOLD_TTL_MINUTES not set, using default of 10");
                    10
                }),
            remote_latency_ms: env::var("REMOTE_LATENCY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }

    /// Configuration for tests and local tooling: no simulated latency.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            slot_hold_ttl_minutes: 10,
            remote_latency_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = AppConfig::for_tests();
        assert_eq!(config.slot_hold_ttl_minutes, 10);
        assert_eq!(config.remote_latency_ms, 0);
    }
}
