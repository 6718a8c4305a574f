use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

/// Share of the request timeout a search may spend across its collections.
/// The remainder covers serializing the outcome, so a slow collection shows
/// up as a failure entry instead of a timed-out request.
pub const SEARCH_BUDGET_RATIO: f64 = 0.9;

/// HTTP surface settings. Retrieval itself is configured through the
/// session handed to [`start_server`](crate::start_server).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Whole-request timeout; Solr kNN queries over large collections can
    /// take minutes.
    pub timeout_secs: u64,
    /// Profile and intent bodies carry full embeddings.
    pub max_body_size_mb: usize,
    /// Per API key.
    pub rate_limit_per_minute: u32,
    pub api_keys: HashSet<String>,
    pub enable_cors: bool,
    /// `EnvFilter` directive for the JSON log subscriber.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: 8080,
            timeout_secs: 150,
            max_body_size_mb: 10,
            rate_limit_per_minute: 100,
            api_keys: HashSet::new(),
            enable_cors: true,
            log_level: "info".into(),
        }
    }
}

impl ServerConfig {
    /// Optional `server.{yaml,toml,json}` in the working directory, then
    /// `TALENT_SERVER__*` variables (`TALENT_SERVER__API_KEYS=a,b`).
    pub fn load() -> anyhow::Result<Self> {
        let config: ServerConfig = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(
                config::Environment::with_prefix("TALENT_SERVER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api_keys")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Every protected route needs a key, so serving without any is refused.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_keys.iter().all(|k| k.trim().is_empty()) {
            anyhow::bail!("no API keys configured; set TALENT_SERVER__API_KEYS");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.rate_limit_per_minute == 0 {
            anyhow::bail!("rate_limit_per_minute must be greater than zero");
        }
        if self.max_body_size_mb == 0 {
            anyhow::bail!("max_body_size_mb must be greater than zero");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind_addr, self.port).parse()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Deadline budget for one search.
    pub fn search_budget(&self) -> Duration {
        self.timeout().mul_f64(SEARCH_BUDGET_RATIO)
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> ServerConfig {
        let mut cfg = ServerConfig::default();
        cfg.api_keys.insert("k".into());
        cfg
    }

    #[test]
    fn defaults_fit_long_knn_queries() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.socket_addr().unwrap().port(), 8080);
        assert_eq!(cfg.timeout(), Duration::from_secs(150));
        assert_eq!(cfg.max_body_size(), 10 * 1024 * 1024);
        assert!(cfg.api_keys.is_empty());
    }

    #[test]
    fn search_budget_is_below_request_timeout() {
        let cfg = ServerConfig {
            timeout_secs: 10,
            ..with_key()
        };
        assert_eq!(cfg.search_budget(), Duration::from_secs(9));
        assert!(cfg.search_budget() < cfg.timeout());
    }

    #[test]
    fn refuses_to_serve_without_keys() {
        assert!(ServerConfig::default().validate().is_err());
        let mut blank = ServerConfig::default();
        blank.api_keys.insert("  ".into());
        assert!(blank.validate().is_err());
        assert!(with_key().validate().is_ok());
    }

    #[test]
    fn zero_limits_are_rejected() {
        for cfg in [
            ServerConfig {
                timeout_secs: 0,
                ..with_key()
            },
            ServerConfig {
                rate_limit_per_minute: 0,
                ..with_key()
            },
            ServerConfig {
                max_body_size_mb: 0,
                ..with_key()
            },
        ] {
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "api_keys": ["alpha"]}"#).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.timeout_secs, 150);
        assert!(cfg.api_keys.contains("alpha"));
    }
}
