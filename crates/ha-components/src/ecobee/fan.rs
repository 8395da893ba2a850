//! ecobee ventilator as a `fan` entity
//!
//! Turning the fan on starts the thermostat's 20 minute ventilator timer,
//! turning it off cancels the timer.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use ha_core::{DeviceInfo, EntityId};
use ha_entity_platform::{
    on_off, Entity, EntityPlatform, FanEntity, FieldKind, PlatformResult, ServiceSchema,
};
use serde_json::{json, Value};
use tracing::info;

use super::binary_sensor::{
    register_ventilator_services, thermostat_device, ventilator_attributes, VentilatorControl,
};
use super::{EcobeeData, EcobeeResult, Thermostat};

pub const ATTR_PERCENTAGE: &str = "percentage";
pub const ATTR_PRESET_MODE: &str = "preset_mode";

/// Set up one ventilator fan per thermostat with a ventilator
pub async fn async_setup_entry(
    platform: &Arc<EntityPlatform>,
    data: Arc<EcobeeData>,
) -> PlatformResult<Vec<EntityId>> {
    let mut entities: Vec<Arc<dyn Entity>> = Vec::new();

    for index in 0..data.thermostat_count() {
        if data.get_thermostat(index)?.has_ventilator() {
            entities.push(Arc::new(EcobeeVentilatorFan::new(data.clone(), index)?));
        }
    }

    info!(ventilators = entities.len(), "Setting up ecobee ventilator fans");
    let added = platform.add_entities(entities, true).await;

    register_ventilator_services::<EcobeeVentilatorFan>(platform)?;
    // Speed and preset are accepted but have no effect on the timer
    platform.register_domain_service::<EcobeeVentilatorFan, _>(
        "turn_on",
        ServiceSchema::new()
            .optional(ATTR_PERCENTAGE, FieldKind::Integer)
            .optional(ATTR_PRESET_MODE, FieldKind::String),
        |fan, _| fan.turn_on(),
    )?;
    platform.register_domain_service::<EcobeeVentilatorFan, _>(
        "turn_off",
        ServiceSchema::new(),
        |fan, _| fan.turn_off(),
    )?;

    Ok(added)
}

pub struct EcobeeVentilatorFan {
    data: Arc<EcobeeData>,
    name: String,
    thermostat_index: usize,
    thermostat: RwLock<Thermostat>,
    /// Set after a settings change so the next refresh skips the throttle
    update_without_throttle: AtomicBool,
}

impl EcobeeVentilatorFan {
    pub fn new(data: Arc<EcobeeData>, thermostat_index: usize) -> EcobeeResult<Self> {
        let thermostat = data.get_thermostat(thermostat_index)?;
        Ok(Self {
            data,
            name: format!("{} Ventilator", thermostat.name),
            thermostat_index,
            thermostat: RwLock::new(thermostat),
            update_without_throttle: AtomicBool::new(false),
        })
    }

    fn cached<R>(&self, f: impl FnOnce(&Thermostat) -> R) -> R {
        let thermostat = self.thermostat.read().unwrap_or_else(PoisonError::into_inner);
        f(&thermostat)
    }

    fn changed(&self, result: EcobeeResult<()>) -> EcobeeResult<()> {
        if result.is_ok() {
            self.update_without_throttle.store(true, Ordering::SeqCst);
        }
        result
    }
}

impl VentilatorControl for EcobeeVentilatorFan {
    fn set_ventilator_min_on_time_home(&self, minutes: i64) -> EcobeeResult<()> {
        self.changed(
            self.data
                .set_ventilator_min_on_time_home(self.thermostat_index, minutes),
        )
    }

    fn set_ventilator_min_on_time_away(&self, minutes: i64) -> EcobeeResult<()> {
        self.changed(
            self.data
                .set_ventilator_min_on_time_away(self.thermostat_index, minutes),
        )
    }

    fn set_ventilator_timer(&self, on: bool) -> EcobeeResult<()> {
        self.changed(self.data.set_ventilator_timer(self.thermostat_index, on))
    }
}

#[async_trait]
impl Entity for EcobeeVentilatorFan {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn unique_id(&self) -> Option<String> {
        Some(self.cached(|t| t.identifier.clone()))
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        Some(self.cached(|t| thermostat_device(t, &self.name)))
    }

    fn available(&self) -> bool {
        self.cached(|t| t.runtime.connected)
    }

    fn state(&self) -> Option<String> {
        on_off(FanEntity::is_on(self))
    }

    fn extra_state_attributes(&self) -> Option<HashMap<String, Value>> {
        Some(self.cached(|t| {
            let mut attributes = ventilator_attributes(t);
            attributes.insert(
                "ventilator type".to_string(),
                json!(t.settings.ventilator_type),
            );
            attributes
        }))
    }

    async fn async_update(&self) -> PlatformResult<()> {
        if self.update_without_throttle.swap(false, Ordering::SeqCst) {
            self.data.update_forced().await?;
        } else {
            self.data.update().await?;
        }
        let fresh = self.data.get_thermostat(self.thermostat_index)?;
        *self.thermostat.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FanEntity for EcobeeVentilatorFan {
    fn is_on(&self) -> Option<bool> {
        Some(self.cached(Thermostat::is_ventilator_running))
    }

    /// Start the 20 minute ventilator timer
    fn turn_on(&self) -> PlatformResult<()> {
        Ok(self.set_ventilator_timer(true)?)
    }

    /// Cancel the ventilator timer
    fn turn_off(&self) -> PlatformResult<()> {
        Ok(self.set_ventilator_timer(false)?)
    }
}
