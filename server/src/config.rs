//! Server configuration.

use std::str::FromStr;

use ratebridge_resolver::Strategy;
use ratebridge_upstream::AlphaVantageConfig;

/// Which upstream gateway backs the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    /// The live Alpha Vantage client. Requires an API key.
    AlphaVantage,
    /// The offline stub. No key, no network.
    Stub,
}

impl FromStr for GatewayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alpha-vantage" | "alphavantage" => Ok(GatewayKind::AlphaVantage),
            "stub" => Ok(GatewayKind::Stub),
            other => Err(format!("unknown gateway kind '{other}'")),
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Resolution strategy applied to incoming requests.
    pub strategy: Strategy,
    /// Minutes before a stored rate counts as expired.
    pub expiration_minutes: u32,
    /// Which gateway backs the resolver.
    pub gateway: GatewayKind,
    /// Alpha Vantage client settings.
    pub alpha_vantage: AlphaVantageConfig,
    /// Postgres URL. Rates live in memory when unset.
    pub database_url: Option<String>,
    /// Postgres pool size.
    pub db_max_connections: u32,
    /// Wrap the store in a write-through cache.
    pub cache_enabled: bool,
    /// Per-request timeout.
    pub request_timeout_seconds: u64,
    /// Log filter applied when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            strategy: Strategy::PreferStored,
            expiration_minutes: 5,
            gateway: GatewayKind::Stub,
            alpha_vantage: AlphaVantageConfig::default(),
            database_url: None,
            db_max_connections: 5,
            cache_enabled: false,
            request_timeout_seconds: 10,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("RATEBRIDGE_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Ok(port) = std::env::var("RATEBRIDGE_LISTEN_PORT") {
            if let Ok(port) = port.parse() {
                config.listen_port = port;
            }
        }

        if let Ok(strategy) = std::env::var("RATEBRIDGE_STRATEGY") {
            if let Ok(strategy) = strategy.parse() {
                config.strategy = strategy;
            }
        }

        if let Ok(minutes) = std::env::var("RATEBRIDGE_EXPIRATION_MINUTES") {
            if let Ok(minutes) = minutes.parse() {
                config.expiration_minutes = minutes;
            }
        }

        if let Ok(gateway) = std::env::var("RATEBRIDGE_GATEWAY") {
            if let Ok(gateway) = gateway.parse() {
                config.gateway = gateway;
            }
        }

        if let Ok(key) = std::env::var("ALPHA_VANTAGE_API_KEY") {
            config.alpha_vantage.api_key = key;
        }

        if let Ok(url) = std::env::var("ALPHA_VANTAGE_BASE_URL") {
            config.alpha_vantage.base_url = url;
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(url);
        }

        if let Ok(max) = std::env::var("RATEBRIDGE_DB_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse() {
                config.db_max_connections = max;
            }
        }

        if let Ok(enabled) = std::env::var("RATEBRIDGE_CACHE") {
            if let Ok(enabled) = enabled.parse() {
                config.cache_enabled = enabled;
            }
        }

        if let Ok(seconds) = std::env::var("RATEBRIDGE_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(seconds) = seconds.parse() {
                config.request_timeout_seconds = seconds;
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.gateway == GatewayKind::AlphaVantage && self.alpha_vantage.api_key.is_empty() {
            return Err(
                "Alpha Vantage API key is required for the alpha-vantage gateway".to_string(),
            );
        }

        if self.db_max_connections == 0 {
            return Err("Database pool size cannot be 0".to_string());
        }

        if self.request_timeout_seconds == 0 {
            return Err("Request timeout cannot be 0".to_string());
        }

        Ok(())
    }
}
