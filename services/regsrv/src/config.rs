//! Service configuration
//!
//! Sources, lowest to highest priority:
//! 1. compiled defaults
//! 2. YAML file (`--config`, else `config/regsrv.yaml` if present)
//! 3. legacy variables `DEFAULT_HOST`, `DEFAULT_PORT`, `CONNECTION_TIMEOUT_MS`
//! 4. `REGSRV_` prefixed variables, `__` as separator (`REGSRV_API__PORT=6010`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::executor::ExecutorConfig;
use crate::error::{RegSrvError, Result};

pub const SERVICE_NAME: &str = "regsrv";
pub const DEFAULT_PORT: u16 = 6010;
pub const DEFAULT_CONFIG_PATH: &str = "config/regsrv.yaml";

pub const DEFAULT_DEVICE_HOST: &str = "192.168.2.88";
pub const DEFAULT_DEVICE_PORT: u16 = 502;
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_EXCHANGE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Fallbacks for requests that omit the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub default_host: String,
    pub default_port: u16,
    pub unit_id: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            default_host: DEFAULT_DEVICE_HOST.to_string(),
            default_port: DEFAULT_DEVICE_PORT,
            unit_id: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connect phase
    pub connection_timeout_ms: u64,
    /// Each register exchange once connected
    pub exchange_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            exchange_timeout_ms: DEFAULT_EXCHANGE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/regsrv.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

/// Complete regsrv configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegsrvConfig {
    pub api: ApiConfig,
    pub device: DeviceConfig,
    pub timeouts: TimeoutConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Legacy variable names mapped onto config keys
fn legacy_env() -> Env {
    Env::raw()
        .only(&["DEFAULT_HOST", "DEFAULT_PORT", "CONNECTION_TIMEOUT_MS"])
        .map(|key| {
            match key.as_str().to_ascii_lowercase().as_str() {
                "default_host" => "device.default_host",
                "default_port" => "device.default_port",
                "connection_timeout_ms" => "timeouts.connection_timeout_ms",
                _ => "unused",
            }
            .into()
        })
}

impl RegsrvConfig {
    /// Build the figment without extracting; exposed for inspection in tests
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        Figment::from(Serialized::defaults(RegsrvConfig::default()))
            .merge(Yaml::file(file))
            .merge(legacy_env())
            .merge(Env::prefixed("REGSRV_").split("__"))
    }

    /// Load and validate configuration
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(RegSrvError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }

        let config: Self = Self::figment(config_path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.port == 0 {
            return Err(RegSrvError::config("api.port must be non-zero"));
        }
        if self.device.default_host.trim().is_empty() {
            return Err(RegSrvError::config("device.default_host must not be empty"));
        }
        if self.device.default_port == 0 {
            return Err(RegSrvError::config("device.default_port must be non-zero"));
        }
        if self.timeouts.connection_timeout_ms == 0 {
            return Err(RegSrvError::config(
                "timeouts.connection_timeout_ms must be positive",
            ));
        }
        if self.timeouts.exchange_timeout_ms == 0 {
            return Err(RegSrvError::config(
                "timeouts.exchange_timeout_ms must be positive",
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            connection_timeout: Duration::from_millis(self.timeouts.connection_timeout_ms),
        }
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.exchange_timeout_ms)
    }
}
