// config.rs - Centralized configuration system
//
// Loaded once in main and passed down explicitly; services never read
// global state.

use crate::types::{AppError, ExchangeId};
use crate::utils::Credentials;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    #[serde(default)]
    pub exchanges: HashMap<String, ExchangeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Root of the per-credential cache partitions.
    pub cache_dir: String,
    /// Default refresh cadence, overridable per exchange.
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub requests_per_second: Option<f64>,
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
}

impl ExchangeConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            passphrase: self.passphrase.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            general: GeneralConfig {
                log_level: "info".to_string(),
                cache_dir: "data-cache".to_string(),
                refresh_interval_secs: 60,
            },
            exchanges: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML or JSON file.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let file_format = path.as_ref().extension().and_then(|os| os.to_str());

        let contents = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| AppError::ConfigError(format!("Failed to read config file: {e}")))?;

        match file_format {
            Some("toml") => toml::from_str(&contents)
                .map_err(|e| AppError::ConfigError(format!("Failed to parse TOML config: {e}"))),
            Some("json") => serde_json::from_str(&contents)
                .map_err(|e| AppError::ConfigError(format!("Failed to parse JSON config: {e}"))),
            _ => Err(AppError::ConfigError(
                "Unsupported config file format".to_string(),
            )),
        }
    }

    /// Get exchange configuration by exchange id.
    pub fn get_exchange_config(&self, exchange: ExchangeId) -> Option<&ExchangeConfig> {
        self.exchanges.get(exchange.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_config() {
        let raw = r#"
            [general]
            log_level = "debug"
            cache_dir = "/tmp/trisync-cache"
            refresh_interval_secs = 30

            [exchanges.bingx]
            api_key = "k"
            api_secret = "s"
            requests_per_second = 2.0

            [exchanges.kucoin]
            api_key = "k2"
            api_secret = "s2"
            passphrase = "p2"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.exchanges.len(), 2);

        let bingx = config.get_exchange_config(ExchangeId::Bingx).unwrap();
        assert_eq!(bingx.requests_per_second, Some(2.0));
        assert!(bingx.credentials().is_complete());
        assert!(bingx.credentials().passphrase.is_none());

        let kucoin = config.get_exchange_config(ExchangeId::Kucoin).unwrap();
        assert_eq!(kucoin.credentials().passphrase.as_deref(), Some("p2"));

        assert!(config.get_exchange_config(ExchangeId::Bitget).is_none());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.refresh_interval_secs, 60);
        assert!(config.exchanges.is_empty());
    }
}
