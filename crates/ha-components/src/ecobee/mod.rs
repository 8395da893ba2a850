//! ecobee integration
//!
//! Exposes ecobee remote sensor occupancy and ventilator status as
//! `binary_sensor` entities and the ventilator itself as a `fan` entity.
//! All entities share one [`EcobeeData`] holder wrapping the vendor client.

pub mod binary_sensor;
mod client;
mod config;
mod data;
pub mod fan;
mod model;

use std::sync::Arc;

use ha_entity_platform::{EntityPlatform, Hass, PlatformResult};
use tokio::task::JoinHandle;
use tracing::info;

pub use client::{EcobeeClient, EcobeeError, EcobeeResult};
pub use config::{EcobeeConfig, DEFAULT_MIN_TIME_BETWEEN_UPDATES, DEFAULT_SCAN_INTERVAL};
pub use data::EcobeeData;
pub use model::{
    parse_thermostat_list, Capability, RemoteSensor, Thermostat, ThermostatRuntime,
    ThermostatSettings, CAPABILITY_OCCUPANCY,
};

/// Integration domain, also the domain of its entity services
pub const DOMAIN: &str = "ecobee";

pub const MANUFACTURER: &str = "ecobee";

/// Model reported for room sensors
pub const ROOM_SENSOR_MODEL: &str = "ecobee Room Sensor";

/// Vendor model numbers and their product names
pub static ECOBEE_MODEL_TO_NAME: &[(&str, &str)] = &[
    ("idtSmart", "ecobee Smart"),
    ("idtEms", "ecobee Smart EMS"),
    ("siSmart", "ecobee Si Smart"),
    ("siEms", "ecobee Si EMS"),
    ("athenaSmart", "ecobee3 Smart"),
    ("athenaEms", "ecobee3 EMS"),
    ("corSmart", "Carrier/Bryant Cor"),
    ("nikeSmart", "ecobee3 lite Smart"),
    ("nikeEms", "ecobee3 lite EMS"),
    ("apolloSmart", "ecobee4 Smart"),
    ("vulcanSmart", "ecobee4 Smart"),
    ("aresSmart", "ecobee Smart Premium"),
    ("artemisSmart", "ecobee Smart Enhanced"),
];

/// `"<Name> Thermostat"` for a known model number, `None` otherwise
pub fn thermostat_model(model_number: &str) -> Option<String> {
    ECOBEE_MODEL_TO_NAME
        .iter()
        .find(|(number, _)| *number == model_number)
        .map(|(_, name)| format!("{} Thermostat", name))
}

/// A running ecobee integration
pub struct EcobeeIntegration {
    pub data: Arc<EcobeeData>,
    pub binary_sensors: Arc<EntityPlatform>,
    pub fans: Arc<EntityPlatform>,
    pollers: Vec<JoinHandle<()>>,
}

impl EcobeeIntegration {
    /// Stop polling
    pub fn shutdown(self) {
        for poller in self.pollers {
            poller.abort();
        }
    }
}

/// Set up both ecobee platforms and start polling them
pub async fn async_setup(
    hass: Arc<Hass>,
    client: Arc<dyn EcobeeClient>,
    config: &EcobeeConfig,
) -> PlatformResult<EcobeeIntegration> {
    config.validate()?;

    let data = Arc::new(EcobeeData::new(client, config));
    data.update().await?;

    let binary_sensors = EntityPlatform::new(hass.clone(), "binary_sensor", DOMAIN);
    binary_sensor::async_setup_entry(&binary_sensors, data.clone()).await?;

    let fans = EntityPlatform::new(hass, "fan", DOMAIN);
    fan::async_setup_entry(&fans, data.clone()).await?;

    let pollers = vec![
        binary_sensors.start_polling(config.scan_interval()),
        fans.start_polling(config.scan_interval()),
    ];

    info!(
        thermostats = data.thermostat_count(),
        "ecobee integration set up"
    );

    Ok(EcobeeIntegration {
        data,
        binary_sensors,
        fans,
        pollers,
    })
}
