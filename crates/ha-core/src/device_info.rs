//! Device information reported by entities
//!
//! Entities describe the physical device they belong to so that entities
//! sharing an identifier are grouped under one device.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A `(domain, id)` pair identifying a device, e.g. `("ecobee", "411913735722")`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceIdentifier(pub String, pub String);

impl DeviceIdentifier {
    pub fn new(domain: impl Into<String>, id: impl Into<String>) -> Self {
        Self(domain.into(), id.into())
    }
}

/// Device description attached to an entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub identifiers: BTreeSet<DeviceIdentifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    /// Model name; absent when the model is not known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DeviceInfo {
    /// Device info with a single identifier
    pub fn new(identifier: DeviceIdentifier) -> Self {
        Self {
            identifiers: BTreeSet::from([identifier]),
            ..Default::default()
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether two descriptions refer to the same device
    pub fn shares_identifier(&self, other: &DeviceInfo) -> bool {
        !self.identifiers.is_disjoint(&other.identifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_shared_identifier() {
        let thermostat = DeviceInfo::new(DeviceIdentifier::new("ecobee", "4119"))
            .with_manufacturer("ecobee")
            .with_model(Some("ecobee3 Smart Thermostat".to_string()))
            .with_name("Main Floor");
        let sensor = DeviceInfo::new(DeviceIdentifier::new("ecobee", "4119"));
        let other = DeviceInfo::new(DeviceIdentifier::new("ecobee", "RZ7P"));

        assert!(thermostat.shares_identifier(&sensor));
        assert!(!thermostat.shares_identifier(&other));
    }

    #[test]
    fn test_unknown_model_is_omitted() {
        let info = DeviceInfo::new(DeviceIdentifier::new("ecobee", "4119")).with_model(None);
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("model").is_none());
        assert_eq!(json["identifiers"][0][1], "4119");
    }
}
