//! Sidecar configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object is a
//! valid configuration.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub app: AppConfig,
    pub export_endpoints: Vec<ExportEndpoint>,
    #[serde(rename = "edgeXConnector")]
    pub edgex: EdgeXConnectorConfig,
    pub logger: LoggerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub debug: bool,
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: true,
            name: String::from("Health monitor"),
        }
    }
}

/// An export destination; one export client is registered per endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportEndpoint {
    pub name: String,
    pub protocol: String,
    pub address: String,
    pub path: String,
    pub port: u16,
}

impl Default for ExportEndpoint {
    fn default() -> Self {
        Self {
            name: String::new(),
            protocol: String::from("HTTP"),
            address: String::from("localhost"),
            path: String::from("/"),
            port: 8111,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeXConnectorConfig {
    #[serde(rename = "edgeXEndpoint")]
    pub base_url: String,
    pub consul: ConsulPaths,
    pub export_client: ExportClientPaths,
    pub meta_data: MetaDataPaths,
    pub core_data: CoreDataPaths,
    #[serde(rename = "timeoutMS")]
    pub timeout_ms: u64,
    pub max_retries: u32,
    #[serde(rename = "retryWaitMinMS")]
    pub retry_wait_min_ms: u64,
    #[serde(rename = "retryWaitMaxMS")]
    pub retry_wait_max_ms: u64,
    #[serde(rename = "pollingIntervalMS")]
    pub polling_interval_ms: u64,
}

impl Default for EdgeXConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost"),
            consul: ConsulPaths::default(),
            export_client: ExportClientPaths::default(),
            meta_data: MetaDataPaths::default(),
            core_data: CoreDataPaths::default(),
            timeout_ms: 3_000,
            max_retries: 4,
            retry_wait_min_ms: 1_000,
            retry_wait_max_ms: 30_000,
            polling_interval_ms: 10_000,
        }
    }
}

impl EdgeXConnectorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::exponential(
            self.max_retries,
            Duration::from_millis(self.retry_wait_min_ms),
            Duration::from_millis(self.retry_wait_max_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsulPaths {
    #[serde(rename = "consulPath")]
    pub base_path: String,
    pub health: String,
}

impl Default for ConsulPaths {
    fn default() -> Self {
        Self {
            base_path: String::from(":8500/v1"),
            health: String::from("health/state/any"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportClientPaths {
    #[serde(rename = "exportClientPath")]
    pub base_path: String,
    pub registration: String,
}

impl Default for ExportClientPaths {
    fn default() -> Self {
        Self {
            base_path: String::from(":48071/api/v1"),
            registration: String::from("registration"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaDataPaths {
    #[serde(rename = "metaDataPath")]
    pub base_path: String,
    #[serde(rename = "addressablePath")]
    pub addressable: String,
    #[serde(rename = "devicePath")]
    pub device: String,
    #[serde(rename = "deviceProfilePath")]
    pub device_profile: String,
    #[serde(rename = "deviceServicePath")]
    pub device_service: String,
}

impl Default for MetaDataPaths {
    fn default() -> Self {
        Self {
            base_path: String::from(":48081/api/v1"),
            addressable: String::from("addressable"),
            device: String::from("device"),
            device_profile: String::from("deviceprofile"),
            device_service: String::from("deviceservice"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreDataPaths {
    #[serde(rename = "coreDataPath")]
    pub base_path: String,
    #[serde(rename = "eventPath")]
    pub event: String,
    #[serde(rename = "valuedescriptorPath")]
    pub value_descriptor: String,
}

impl Default for CoreDataPaths {
    fn default() -> Self {
        Self {
            base_path: String::from(":48080/api/v1"),
            event: String::from("event"),
            value_descriptor: String::from("valuedescriptor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: String::from("debug"),
        }
    }
}

impl Configuration {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.edgex.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "edgeXConnector.edgeXEndpoint cannot be empty",
            )));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "edgeXConnector.edgeXEndpoint must be an http(s) URL: '{base_url}'"
            )));
        }
        if self.edgex.timeout_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "edgeXConnector.timeoutMS must be greater than zero",
            )));
        }
        if self.edgex.polling_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "edgeXConnector.pollingIntervalMS must be greater than zero",
            )));
        }
        if self.app.name.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from("app.name cannot be empty")));
        }

        let mut seen = HashSet::new();
        for endpoint in &self.export_endpoints {
            if endpoint.name.trim().is_empty() {
                return Err(ConfigError::Invalid(String::from(
                    "exportEndpoints[].name cannot be empty",
                )));
            }
            if !seen.insert(endpoint.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate export endpoint name '{}'",
                    endpoint.name
                )));
            }
        }

        Ok(())
    }
}
