//! ecobee ventilator fan platform tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{setup_data, thermostats, MockClient, SetterCall};
use ha_components::ecobee::binary_sensor::VentilatorControl;
use ha_components::ecobee::fan::{self, EcobeeVentilatorFan};
use ha_components::ecobee::{EcobeeData, DOMAIN};
use ha_core::{STATE_OFF, STATE_ON, STATE_UNAVAILABLE};
use ha_entity_platform::{Entity, EntityPlatform, FanEntity, Hass};
use serde_json::json;

async fn setup_with(data: Arc<EcobeeData>) -> (Arc<Hass>, Arc<EntityPlatform>) {
    let hass = Hass::new();
    let platform = EntityPlatform::new(hass.clone(), "fan", DOMAIN);
    fan::async_setup_entry(&platform, data).await.unwrap();
    (hass, platform)
}

#[tokio::test]
async fn test_one_fan_per_ventilator() {
    let (_client, data) = setup_data();
    let (hass, platform) = setup_with(data).await;

    let mut ids: Vec<String> = platform.entity_ids().iter().map(|id| id.to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["fan.basement_ventilator", "fan.ecobee_ventilator"]);
    assert!(!hass.states.contains("fan.attic_ventilator"));
}

#[tokio::test]
async fn test_fan_state_and_attributes() {
    let (_client, data) = setup_data();
    let (hass, _platform) = setup_with(data).await;

    let state = hass.states.get("fan.ecobee_ventilator").unwrap();
    assert_eq!(state.state, STATE_ON);
    assert_eq!(
        state.attribute::<String>("friendly_name").as_deref(),
        Some("Ecobee Ventilator")
    );
    assert_eq!(state.attribute::<String>("ventilator type").as_deref(), Some("hrv"));
    assert_eq!(state.attribute::<i64>("ventilator_min_on_time_home"), Some(20));
    assert_eq!(state.attribute::<i64>("ventilator_min_on_time_away"), Some(10));
    assert_eq!(state.attribute::<bool>("is_ventilator_timer_on"), Some(false));
    assert_eq!(state.attribute::<String>("device_class"), None);

    assert!(hass.states.is_state("fan.basement_ventilator", STATE_UNAVAILABLE));
}

#[tokio::test]
async fn test_fan_entity_properties() {
    let (_client, data) = setup_data();
    let fan = EcobeeVentilatorFan::new(data, 0).unwrap();

    assert_eq!(fan.name().as_deref(), Some("Ecobee Ventilator"));
    assert_eq!(fan.unique_id().as_deref(), Some("8675309"));
    assert!(fan.available());
    assert_eq!(FanEntity::is_on(&fan), Some(true));

    let device = fan.device_info().unwrap();
    assert_eq!(device.model.as_deref(), Some("ecobee3 Smart Thermostat"));
    assert_eq!(device.manufacturer.as_deref(), Some("ecobee"));
}

#[tokio::test]
async fn test_turn_on_and_off_services() {
    let (client, data) = setup_data();
    let (hass, _platform) = setup_with(data).await;

    hass.call_service("fan", "turn_on", json!({"entity_id": "fan.ecobee_ventilator"}))
        .await
        .unwrap();
    hass.call_service("fan", "turn_off", json!({"entity_id": "fan.basement_ventilator"}))
        .await
        .unwrap();

    assert_eq!(
        client.calls(),
        vec![SetterCall::Timer(0, true), SetterCall::Timer(1, false)]
    );
}

#[tokio::test]
async fn test_turn_on_accepts_speed_and_preset() {
    let (client, data) = setup_data();
    let (hass, _platform) = setup_with(data).await;

    hass.call_service(
        "fan",
        "turn_on",
        json!({"entity_id": "fan.ecobee_ventilator", "percentage": 50}),
    )
    .await
    .unwrap();
    hass.call_service(
        "fan",
        "turn_on",
        json!({"entity_id": "fan.basement_ventilator", "preset_mode": "boost"}),
    )
    .await
    .unwrap();

    assert_eq!(
        client.calls(),
        vec![SetterCall::Timer(0, true), SetterCall::Timer(1, true)]
    );
}

#[tokio::test]
async fn test_ventilator_services_on_fan() {
    let (client, data) = setup_data();
    let (hass, _platform) = setup_with(data).await;

    hass.call_service(
        "ecobee",
        "set_ventilator_min_on_time_away",
        json!({
            "entity_id": ["fan.basement_ventilator"],
            "ventilator_min_on_time_away": 25.0
        }),
    )
    .await
    .unwrap();

    hass.call_service(
        "ecobee",
        "set_ventilator_timer",
        json!({"entity_id": "fan.ecobee_ventilator", "is_ventilator_timer_on": 1}),
    )
    .await
    .unwrap();

    assert_eq!(
        client.calls(),
        vec![SetterCall::MinOnTimeAway(1, 25), SetterCall::Timer(0, true)]
    );
}

#[tokio::test]
async fn test_setter_bypasses_throttle_on_next_refresh() {
    let client = Arc::new(MockClient::new(thermostats()));
    let data = Arc::new(EcobeeData::with_throttle(
        client.clone(),
        Duration::from_secs(3600),
    ));
    let (hass, platform) = setup_with(data).await;

    // Both fans refreshed on add, only one reached the cloud
    assert_eq!(client.update_count(), 1);

    platform.async_update_all().await;
    assert_eq!(client.update_count(), 1);

    client.modify(0, |t| t.equipment_status = String::new());
    hass.call_service("fan", "turn_off", json!({"entity_id": "fan.ecobee_ventilator"}))
        .await
        .unwrap();

    assert_eq!(client.update_count(), 2);
    assert!(hass.states.is_state("fan.ecobee_ventilator", STATE_OFF));

    // Flag is consumed by the forced refresh
    platform.async_update_all().await;
    assert_eq!(client.update_count(), 2);
}

#[tokio::test]
async fn test_failed_setter_keeps_throttle() {
    let client = Arc::new(MockClient::new(thermostats()));
    let data = Arc::new(EcobeeData::with_throttle(
        client.clone(),
        Duration::from_secs(3600),
    ));
    let fan = EcobeeVentilatorFan::new(data, 0).unwrap();
    fan.async_update().await.unwrap();
    assert_eq!(client.update_count(), 1);

    client.fail_setters(true);
    assert!(fan.set_ventilator_min_on_time_home(30).is_err());
    assert!(fan.turn_on().is_err());

    fan.async_update().await.unwrap();
    assert_eq!(client.update_count(), 1);
}
