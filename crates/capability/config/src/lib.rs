//! 网关运行配置加载。

use gw_device::DeviceConfig;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("device file {0}: {1}")]
    DeviceFile(String, String),
}

/// 网关运行配置。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub devices_file: PathBuf,
    pub event_dir: PathBuf,
    pub tick_interval_ms: u64,
    pub default_timeout_ms: u64,
}

impl GatewayConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let devices_file = env::var("GW_DEVICES_FILE")
            .map_err(|_| ConfigError::Missing("GW_DEVICES_FILE".to_string()))?;
        let event_dir = env::var("GW_EVENT_DIR").unwrap_or_else(|_| "./data/events".to_string());
        let tick_interval_ms = read_u64_with_default("GW_TICK_INTERVAL_MS", 100)?;
        if tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "GW_TICK_INTERVAL_MS".to_string(),
                "0".to_string(),
            ));
        }
        let default_timeout_ms = read_u64_with_default("GW_DEFAULT_TIMEOUT_MS", 2000)?;

        Ok(Self {
            devices_file: PathBuf::from(devices_file),
            event_dir: PathBuf::from(event_dir),
            tick_interval_ms,
            default_timeout_ms,
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

#[derive(Deserialize)]
struct DeviceFile {
    #[serde(default)]
    devices: Vec<DeviceConfig>,
}

/// 读取设备定义文件 `{"devices": [...]}`。
pub fn load_devices(path: impl AsRef<Path>) -> Result<Vec<DeviceConfig>, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path)
        .map_err(|err| ConfigError::DeviceFile(display.clone(), err.to_string()))?;
    let file: DeviceFile = serde_json::from_str(&content)
        .map_err(|err| ConfigError::DeviceFile(display, err.to_string()))?;
    Ok(file.devices)
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}
