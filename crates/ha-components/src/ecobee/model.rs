//! Typed ecobee thermostat records
//!
//! Field names follow the vendor's camelCase JSON. Only the fields the
//! platforms read are modelled; everything else in the payload is ignored.

use serde::{Deserialize, Serialize};

use super::EcobeeResult;

/// Equipment status token reported while the ventilator runs
const VENTILATOR_EQUIPMENT: &str = "ventilator";

/// `ventilatorType` of a thermostat without a ventilator
const VENTILATOR_TYPE_NONE: &str = "none";

/// Capability type reported by occupancy-capable sensors
pub const CAPABILITY_OCCUPANCY: &str = "occupancy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thermostat {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub model_number: String,
    /// Comma separated list of running equipment, e.g. "fan,ventilator"
    #[serde(default)]
    pub equipment_status: String,
    pub settings: ThermostatSettings,
    pub runtime: ThermostatRuntime,
    #[serde(default)]
    pub remote_sensors: Vec<RemoteSensor>,
}

impl Thermostat {
    /// Whether a ventilator is wired to this thermostat
    pub fn has_ventilator(&self) -> bool {
        self.settings.ventilator_type != VENTILATOR_TYPE_NONE
    }

    /// Whether the equipment status mentions the ventilator
    pub fn is_ventilator_running(&self) -> bool {
        self.equipment_status.contains(VENTILATOR_EQUIPMENT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermostatSettings {
    #[serde(default = "default_ventilator_type")]
    pub ventilator_type: String,
    /// Vent mode ("off", "auto", "minontime", "on")
    #[serde(default)]
    pub vent: String,
    /// Minutes per hour the ventilator runs while home
    #[serde(default)]
    pub ventilator_min_on_time_home: i64,
    /// Minutes per hour the ventilator runs while away
    #[serde(default)]
    pub ventilator_min_on_time_away: i64,
    #[serde(default)]
    pub is_ventilator_timer_on: bool,
}

fn default_ventilator_type() -> String {
    VENTILATOR_TYPE_NONE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatRuntime {
    pub connected: bool,
}

/// A sensor attached to a thermostat, including the thermostat's own sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSensor {
    pub id: String,
    pub name: String,
    /// Pairing code; only room sensors have one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "type", default)]
    pub sensor_type: String,
    #[serde(default)]
    pub capability: Vec<Capability>,
}

impl RemoteSensor {
    /// First capability of the given type
    pub fn capability(&self, kind: &str) -> Option<&Capability> {
        self.capability.iter().find(|c| c.capability_type == kind)
    }

    pub fn has_occupancy(&self) -> bool {
        self.capability(CAPABILITY_OCCUPANCY).is_some()
    }
}

/// A single measurement reported by a sensor. `value` is the raw vendor
/// string ("true", "false", "712", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub capability_type: String,
    pub value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThermostatList {
    thermostat_list: Vec<Thermostat>,
}

/// Parse the `thermostatList` of a thermostat summary response
pub fn parse_thermostat_list(payload: serde_json::Value) -> EcobeeResult<Vec<Thermostat>> {
    let list: ThermostatList = serde_json::from_value(payload)?;
    Ok(list.thermostat_list)
}
