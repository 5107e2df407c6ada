use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub bank: BankConfig,
    #[serde(default)]
    pub txid: TxIdConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// CSV of registered users (username, argon2 hash)
    pub users_file: String,
    /// Per participant call
    pub rpc_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
            users_file: "./data/gateway_users.txt".to_string(),
            rpc_timeout_ms: 5000,
        }
    }
}

impl GatewayConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BankConfig {
    pub host: String,
    pub port: u16,
    /// Holds `<bank>_users.txt` and `<bank>_transactions.txt`
    pub data_dir: String,
    pub gateway_url: String,
    pub register_timeout_ms: u64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50052,
            data_dir: "./data".to_string(),
            gateway_url: "http://127.0.0.1:50051".to_string(),
            register_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TxIdConfig {
    pub host: String,
    pub port: u16,
    pub counter_file: String,
}

impl Default for TxIdConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50055,
            counter_file: "./data/transaction_counter.txt".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    pub gateway_url: String,
    pub txid_url: String,
    pub retry_interval_secs: u64,
    pub rpc_timeout_ms: u64,
    /// Opening balance when `--register` creates the account
    pub default_balance: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:50051".to_string(),
            txid_url: "http://127.0.0.1:50055".to_string(),
            retry_interval_secs: 10,
            rpc_timeout_ms: 5000,
            default_balance: "1000.00".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: config_path,
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml_uses_section_defaults() {
        let yaml = r#"
log_level: info
log_dir: ./logs
log_file: gateway.log
use_json: false
rotation: daily
enable_tracing: true
gateway:
  host: 0.0.0.0
  port: 6000
  users_file: ./users.txt
  rpc_timeout_ms: 2500
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.gateway.port, 6000);
        assert_eq!(config.gateway.rpc_timeout(), Duration::from_millis(2500));
        assert_eq!(config.txid.port, 50055);
        assert_eq!(config.client.retry_interval(), Duration::from_secs(10));
        assert_eq!(config.bank.data_dir, "./data");
    }

    #[test]
    fn test_shipped_dev_config_loads() {
        let config = AppConfig::load("dev").unwrap();
        assert_eq!(config.gateway.port, 50051);
        assert_eq!(config.bank.gateway_url, config.client.gateway_url);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = AppConfig::load("does-not-exist").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
