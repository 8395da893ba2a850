//! ecobee binary sensors: remote sensor occupancy and ventilator status

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use ha_core::{DeviceIdentifier, DeviceInfo, EntityId};
use ha_entity_platform::{
    on_off, BinarySensorDeviceClass, BinarySensorEntity, Entity, EntityPlatform, FieldKind,
    PlatformError, PlatformResult, ServiceSchema,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{
    thermostat_model, EcobeeData, EcobeeResult, RemoteSensor, Thermostat, CAPABILITY_OCCUPANCY,
    DOMAIN, MANUFACTURER, ROOM_SENSOR_MODEL,
};

pub const ATTR_VENTILATOR_MIN_ON_TIME_HOME: &str = "ventilator_min_on_time_home";
pub const ATTR_VENTILATOR_MIN_ON_TIME_AWAY: &str = "ventilator_min_on_time_away";
pub const ATTR_IS_VENTILATOR_TIMER_ON: &str = "is_ventilator_timer_on";

pub const SERVICE_SET_VENTILATOR_MIN_ON_TIME_HOME: &str = "set_ventilator_min_on_time_home";
pub const SERVICE_SET_VENTILATOR_MIN_ON_TIME_AWAY: &str = "set_ventilator_min_on_time_away";
pub const SERVICE_SET_VENTILATOR_TIMER: &str = "set_ventilator_timer";

/// Capability value meaning "occupied"
const OCCUPIED: &str = "true";

/// Set up occupancy sensors and ventilator binary sensors
///
/// One occupancy entity per occupancy-capable remote sensor and one
/// ventilator entity per thermostat with a ventilator. Returns the ids of
/// the entities added.
pub async fn async_setup_entry(
    platform: &Arc<EntityPlatform>,
    data: Arc<EcobeeData>,
) -> PlatformResult<Vec<EntityId>> {
    let mut sensors: Vec<Arc<dyn Entity>> = Vec::new();
    let mut ventilators: Vec<Arc<dyn Entity>> = Vec::new();

    for index in 0..data.thermostat_count() {
        for sensor in data.get_remote_sensors(index)? {
            if sensor.has_occupancy() {
                sensors.push(Arc::new(EcobeeBinarySensor::new(
                    data.clone(),
                    &sensor.name,
                    index,
                )));
            }
        }

        let thermostat = data.get_thermostat(index)?;
        if thermostat.has_ventilator() {
            ventilators.push(Arc::new(EcobeeVentilator::new(
                data.clone(),
                &thermostat.name,
                index,
            )?));
        }
    }

    info!(
        sensors = sensors.len(),
        ventilators = ventilators.len(),
        "Setting up ecobee binary sensors"
    );

    let mut added = platform.add_entities(sensors, true).await;
    added.extend(platform.add_entities(ventilators, true).await);

    register_ventilator_services::<EcobeeVentilator>(platform)?;

    Ok(added)
}

/// Entities that forward ventilator settings to the thermostat
pub trait VentilatorControl: Entity {
    fn set_ventilator_min_on_time_home(&self, minutes: i64) -> EcobeeResult<()>;
    fn set_ventilator_min_on_time_away(&self, minutes: i64) -> EcobeeResult<()>;
    fn set_ventilator_timer(&self, on: bool) -> EcobeeResult<()>;
}

/// Register the three ventilator entity services for entities of type `T`
pub(crate) fn register_ventilator_services<T: VentilatorControl>(
    platform: &Arc<EntityPlatform>,
) -> PlatformResult<()> {
    platform.register_entity_service::<T, _>(
        SERVICE_SET_VENTILATOR_MIN_ON_TIME_HOME,
        ServiceSchema::new().required(ATTR_VENTILATOR_MIN_ON_TIME_HOME, FieldKind::Integer),
        |entity, data| {
            let minutes = int_field(data, ATTR_VENTILATOR_MIN_ON_TIME_HOME)?;
            Ok(entity.set_ventilator_min_on_time_home(minutes)?)
        },
    )?;

    platform.register_entity_service::<T, _>(
        SERVICE_SET_VENTILATOR_MIN_ON_TIME_AWAY,
        ServiceSchema::new().required(ATTR_VENTILATOR_MIN_ON_TIME_AWAY, FieldKind::Integer),
        |entity, data| {
            let minutes = int_field(data, ATTR_VENTILATOR_MIN_ON_TIME_AWAY)?;
            Ok(entity.set_ventilator_min_on_time_away(minutes)?)
        },
    )?;

    platform.register_entity_service::<T, _>(
        SERVICE_SET_VENTILATOR_TIMER,
        ServiceSchema::new().required(ATTR_IS_VENTILATOR_TIMER_ON, FieldKind::Boolean),
        |entity, data| {
            let on = data
                .get(ATTR_IS_VENTILATOR_TIMER_ON)
                .and_then(Value::as_bool)
                .ok_or_else(|| PlatformError::MissingField(ATTR_IS_VENTILATOR_TIMER_ON.into()))?;
            Ok(entity.set_ventilator_timer(on)?)
        },
    )?;

    Ok(())
}

fn int_field(data: &Map<String, Value>, field: &str) -> PlatformResult<i64> {
    data.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| PlatformError::MissingField(field.to_string()))
}

/// Ventilator state attributes shared by the binary sensor and the fan
pub(crate) fn ventilator_attributes(thermostat: &Thermostat) -> HashMap<String, Value> {
    let settings = &thermostat.settings;
    HashMap::from([
        (
            ATTR_VENTILATOR_MIN_ON_TIME_HOME.to_string(),
            json!(settings.ventilator_min_on_time_home),
        ),
        (
            ATTR_VENTILATOR_MIN_ON_TIME_AWAY.to_string(),
            json!(settings.ventilator_min_on_time_away),
        ),
        (
            ATTR_IS_VENTILATOR_TIMER_ON.to_string(),
            json!(settings.is_ventilator_timer_on),
        ),
    ])
}

/// Device entry of a thermostat
pub(crate) fn thermostat_device(thermostat: &Thermostat, name: &str) -> DeviceInfo {
    DeviceInfo::new(DeviceIdentifier::new(DOMAIN, &thermostat.identifier))
        .with_manufacturer(MANUFACTURER)
        .with_model(thermostat_model(&thermostat.model_number))
        .with_name(name)
}

/// Running state of a thermostat's ventilator
pub struct EcobeeVentilator {
    data: Arc<EcobeeData>,
    name: String,
    thermostat_index: usize,
    /// Thermostat record from the last refresh
    thermostat: RwLock<Thermostat>,
}

impl EcobeeVentilator {
    pub fn new(data: Arc<EcobeeData>, name: &str, thermostat_index: usize) -> EcobeeResult<Self> {
        let thermostat = data.get_thermostat(thermostat_index)?;
        Ok(Self {
            data,
            name: format!("{} Ventilator", name).trim_end().to_string(),
            thermostat_index,
            thermostat: RwLock::new(thermostat),
        })
    }

    fn cached<R>(&self, f: impl FnOnce(&Thermostat) -> R) -> R {
        let thermostat = self.thermostat.read().unwrap_or_else(PoisonError::into_inner);
        f(&thermostat)
    }
}

impl VentilatorControl for EcobeeVentilator {
    fn set_ventilator_min_on_time_home(&self, minutes: i64) -> EcobeeResult<()> {
        self.data
            .set_ventilator_min_on_time_home(self.thermostat_index, minutes)
    }

    fn set_ventilator_min_on_time_away(&self, minutes: i64) -> EcobeeResult<()> {
        self.data
            .set_ventilator_min_on_time_away(self.thermostat_index, minutes)
    }

    /// `true` starts the ventilator for 20 minutes, `false` stops it
    fn set_ventilator_timer(&self, on: bool) -> EcobeeResult<()> {
        self.data.set_ventilator_timer(self.thermostat_index, on)
    }
}

#[async_trait]
impl Entity for EcobeeVentilator {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn unique_id(&self) -> Option<String> {
        Some(self.cached(|t| t.identifier.clone()))
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        Some(self.cached(|t| thermostat_device(t, &self.name)))
    }

    /// Reads the live record, not the cached one
    fn available(&self) -> bool {
        self.data
            .get_thermostat(self.thermostat_index)
            .map(|t| t.runtime.connected)
            .unwrap_or(false)
    }

    fn state(&self) -> Option<String> {
        on_off(self.is_on())
    }

    fn device_class(&self) -> Option<String> {
        Some(BinarySensorDeviceClass::Running.to_string())
    }

    fn extra_state_attributes(&self) -> Option<HashMap<String, Value>> {
        Some(self.cached(|t| {
            let mut attributes = ventilator_attributes(t);
            attributes.insert("vent".to_string(), json!(t.settings.vent));
            attributes
        }))
    }

    async fn async_update(&self) -> PlatformResult<()> {
        self.data.update().await?;
        let fresh = self.data.get_thermostat(self.thermostat_index)?;
        *self.thermostat.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BinarySensorEntity for EcobeeVentilator {
    fn is_on(&self) -> Option<bool> {
        Some(self.cached(Thermostat::is_ventilator_running))
    }
}

/// Occupancy reported by an ecobee remote sensor
pub struct EcobeeBinarySensor {
    data: Arc<EcobeeData>,
    name: String,
    sensor_name: String,
    thermostat_index: usize,
    /// Raw occupancy capability value from the last refresh
    value: RwLock<Option<String>>,
}

impl EcobeeBinarySensor {
    pub fn new(data: Arc<EcobeeData>, sensor_name: &str, thermostat_index: usize) -> Self {
        Self {
            data,
            name: format!("{} Occupancy", sensor_name).trim_end().to_string(),
            sensor_name: sensor_name.to_string(),
            thermostat_index,
            value: RwLock::new(None),
        }
    }

    fn current_sensor(&self) -> Option<RemoteSensor> {
        self.data
            .get_remote_sensors(self.thermostat_index)
            .ok()?
            .into_iter()
            .find(|s| s.name == self.sensor_name)
    }
}

#[async_trait]
impl Entity for EcobeeBinarySensor {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    /// `<code>-occupancy` for room sensors, otherwise
    /// `<thermostat identifier>-<sensor id>-occupancy`
    fn unique_id(&self) -> Option<String> {
        let sensor = self.current_sensor()?;
        let class = BinarySensorDeviceClass::Occupancy;

        if let Some(code) = &sensor.code {
            return Some(format!("{}-{}", code, class));
        }
        let thermostat = self.data.get_thermostat(self.thermostat_index).ok()?;
        Some(format!("{}-{}-{}", thermostat.identifier, sensor.id, class))
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        let sensor = self.current_sensor()?;

        let (identifier, model) = match &sensor.code {
            Some(code) => (code.clone(), Some(ROOM_SENSOR_MODEL.to_string())),
            None => {
                let thermostat = self.data.get_thermostat(self.thermostat_index).ok()?;
                let model = thermostat_model(&thermostat.model_number);
                (thermostat.identifier, model)
            }
        };

        Some(
            DeviceInfo::new(DeviceIdentifier::new(DOMAIN, identifier))
                .with_manufacturer(MANUFACTURER)
                .with_model(model)
                .with_name(&self.sensor_name),
        )
    }

    fn available(&self) -> bool {
        self.data
            .get_thermostat(self.thermostat_index)
            .map(|t| t.runtime.connected)
            .unwrap_or(false)
    }

    fn state(&self) -> Option<String> {
        on_off(self.is_on())
    }

    fn device_class(&self) -> Option<String> {
        Some(BinarySensorDeviceClass::Occupancy.to_string())
    }

    async fn async_update(&self) -> PlatformResult<()> {
        self.data.update().await?;

        let sensors = self.data.get_remote_sensors(self.thermostat_index)?;
        let Some(sensor) = sensors.iter().find(|s| s.name == self.sensor_name) else {
            debug!(sensor = %self.sensor_name, "Remote sensor missing from update");
            return Ok(());
        };
        if let Some(capability) = sensor.capability(CAPABILITY_OCCUPANCY) {
            *self.value.write().unwrap_or_else(PoisonError::into_inner) =
                Some(capability.value.clone());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BinarySensorEntity for EcobeeBinarySensor {
    fn is_on(&self) -> Option<bool> {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        Some(value.as_deref() == Some(OCCUPIED))
    }
}
