use catalog::BusinessRef;
use dexmatch::DexConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

/// Demo key inserted when no API keys are configured.
pub const DEMO_API_KEY: &str = "demo-key-12345";

/// Business an API key acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiKeyEntry {
    pub business_reference: String,
    pub business_name: String,
}

impl ApiKeyEntry {
    pub fn new(reference: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            business_reference: reference.into(),
            business_name: name.into(),
        }
    }

    pub fn business(&self) -> BusinessRef {
        BusinessRef::new(self.business_reference.clone(), self.business_name.clone())
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Rate limit: requests per minute per API key
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// API key -> owning business
    #[serde(default)]
    pub api_keys: HashMap<String, ApiKeyEntry>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Pipeline YAML (`DexConfig`); defaults apply when unset.
    #[serde(default)]
    pub pipeline_config: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            api_keys: HashMap::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            pipeline_config: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.{toml,yaml}` file
    /// and `DEX_SERVER__*` environment variables, in increasing priority.
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("DEX_SERVER").separator("__"));

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;

        if config.api_keys.is_empty() {
            tracing::warn!("No API keys configured, using demo key '{DEMO_API_KEY}'");
            config.api_keys.insert(
                DEMO_API_KEY.to_string(),
                ApiKeyEntry::new("demo-business", "Demo Business"),
            );
        }

        Ok(config)
    }

    /// Builder used by tests and embedders.
    pub fn with_api_key(
        mut self,
        key: impl Into<String>,
        business_reference: impl Into<String>,
        business_name: impl Into<String>,
    ) -> Self {
        self.api_keys.insert(
            key.into(),
            ApiKeyEntry::new(business_reference, business_name),
        );
        self
    }

    /// The pipeline configuration named by `pipeline_config`.
    pub fn dex_config(&self) -> anyhow::Result<DexConfig> {
        match &self.pipeline_config {
            Some(path) => Ok(DexConfig::from_file(path)?),
            None => Ok(DexConfig::default()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    16
}

fn default_rate_limit_per_minute() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_body_size(), 16 * 1024 * 1024);
        assert_eq!(cfg.rate_limit_per_minute, 100);
        assert!(cfg.enable_cors);
        assert!(cfg.metrics_enabled);
        assert!(cfg.api_keys.is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn api_keys_resolve_to_businesses() {
        let cfg = ServerConfig::default().with_api_key("k1", "biz-1", "First");
        let entry = &cfg.api_keys["k1"];
        assert_eq!(entry.business(), BusinessRef::new("biz-1", "First"));
    }

    #[test]
    fn api_keys_deserialize_from_a_table() {
        let json = r#"{
            "port": 9000,
            "api_keys": {
                "secret": { "business_reference": "biz-9", "business_name": "Nine" }
            }
        }"#;
        let cfg: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.api_keys["secret"].business_reference, "biz-9");
        assert_eq!(cfg.timeout_secs, 30);
    }

    #[test]
    fn missing_pipeline_config_means_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.dex_config().unwrap(), DexConfig::default());
    }
}
