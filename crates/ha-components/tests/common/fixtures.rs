//! Fixture loading

use std::path::Path;

use ha_components::ecobee::{parse_thermostat_list, Thermostat};

/// Load a fixture file from `tests/fixtures/` as JSON
pub fn load_json_fixture(name: &str) -> serde_json::Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);

    let content = std::fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!("Failed to load fixture '{}' from {:?}: {}", name, path, e)
    });
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture '{}' as JSON: {}", name, e))
}

/// The three thermostats of `thermostats.json`
///
/// 0. "Ecobee": hrv ventilator running, connected, sensors Ecobee
///    (unoccupied), Bedroom (coded, occupied) and Garage (no occupancy)
/// 1. "Basement": erv ventilator idle, disconnected, unknown model
/// 2. "Attic": no ventilator, occupied
pub fn thermostats() -> Vec<Thermostat> {
    parse_thermostat_list(load_json_fixture("thermostats.json"))
        .expect("thermostats.json is a valid thermostat list")
}
