use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub price_api_url: String,
    /// Total time budget for retrying one price lookup.
    pub price_max_retry: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_addr = env_map
            .get("BIND_ADDR")
            .map(|s| s.as_str())
            .unwrap_or("127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "BIND_ADDR".to_string(),
                    "must be a valid IP address".to_string(),
                )
            })?;

        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let price_api_url = env_map
            .get("PRICE_API_URL")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "https://coins.llama.fi".to_string());
        if !(price_api_url.starts_with("http://") || price_api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "PRICE_API_URL".to_string(),
                format!("must be an http(s) URL, got {}", price_api_url),
            ));
        }

        let price_max_retry_ms = env_map
            .get("PRICE_MAX_RETRY_MS")
            .map(|s| s.as_str())
            .unwrap_or("30000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "PRICE_MAX_RETRY_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            bind_addr,
            port,
            price_api_url,
            price_max_retry: Duration::from_millis(price_max_retry_ms),
        })
    }
}
