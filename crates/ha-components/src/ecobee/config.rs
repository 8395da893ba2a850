//! ecobee configuration block

use std::time::Duration;

use serde::Deserialize;

use super::client::{EcobeeError, EcobeeResult};

/// Default seconds between entity polls
pub const DEFAULT_SCAN_INTERVAL: u64 = 180;

/// Default seconds between cloud refreshes
pub const DEFAULT_MIN_TIME_BETWEEN_UPDATES: u64 = 180;

/// ecobee configuration from YAML
///
/// ```yaml
/// ecobee:
///   api_key: abc123
///   scan_interval: 120
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EcobeeConfig {
    /// Developer API key
    pub api_key: String,
    /// Seconds between entity polls
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    /// Seconds a cloud refresh stays fresh
    #[serde(default = "default_min_time_between_updates")]
    pub min_time_between_updates: u64,
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL
}

fn default_min_time_between_updates() -> u64 {
    DEFAULT_MIN_TIME_BETWEEN_UPDATES
}

impl EcobeeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            min_time_between_updates: DEFAULT_MIN_TIME_BETWEEN_UPDATES,
        }
    }

    /// Parse and validate the `ecobee:` block
    pub fn from_yaml(yaml: &str) -> EcobeeResult<Self> {
        let config: EcobeeConfig =
            serde_yaml::from_str(yaml).map_err(|e| EcobeeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EcobeeResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(EcobeeError::Config("api_key must not be empty".to_string()));
        }
        if self.scan_interval == 0 {
            return Err(EcobeeError::Config(
                "scan_interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    pub fn min_time_between_updates(&self) -> Duration {
        Duration::from_secs(self.min_time_between_updates)
    }
}
