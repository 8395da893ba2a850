//! Boundary to the ecobee cloud client

use async_trait::async_trait;
use ha_entity_platform::PlatformError;
use thiserror::Error;

use super::model::{RemoteSensor, Thermostat};

pub type EcobeeResult<T> = Result<T, EcobeeError>;

#[derive(Debug, Error)]
pub enum EcobeeError {
    #[error("no thermostat at index {0}")]
    ThermostatNotFound(usize),

    #[error("ecobee API request failed: {0}")]
    Api(String),

    #[error("failed to parse ecobee payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid ecobee configuration: {0}")]
    Config(String),
}

impl From<EcobeeError> for PlatformError {
    fn from(err: EcobeeError) -> Self {
        PlatformError::integration(err)
    }
}

/// Operations the platforms need from the vendor client
///
/// Implementations own authentication, token refresh and HTTP. Reads return
/// the data fetched by the last successful [`EcobeeClient::update`]; the
/// setters issue their request immediately.
#[async_trait]
pub trait EcobeeClient: Send + Sync {
    /// Fetch fresh thermostat data from the cloud
    async fn update(&self) -> EcobeeResult<()>;

    fn thermostat_count(&self) -> usize;

    fn get_thermostat(&self, index: usize) -> EcobeeResult<Thermostat>;

    fn get_remote_sensors(&self, index: usize) -> EcobeeResult<Vec<RemoteSensor>>;

    fn set_ventilator_min_on_time_home(&self, index: usize, minutes: i64) -> EcobeeResult<()>;

    fn set_ventilator_min_on_time_away(&self, index: usize, minutes: i64) -> EcobeeResult<()>;

    /// Start (`true`) or cancel (`false`) the 20 minute ventilator timer
    fn set_ventilator_timer(&self, index: usize, on: bool) -> EcobeeResult<()>;
}
