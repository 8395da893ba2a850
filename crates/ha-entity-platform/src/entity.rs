//! Entity contracts
//!
//! Every entity added to a platform implements [`Entity`]. Property getters
//! are cheap reads over data the entity already holds; only
//! [`Entity::async_update`] may suspend.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use ha_core::{DeviceInfo, STATE_OFF, STATE_ON};

use crate::PlatformResult;

/// Base trait for all entities
#[async_trait]
pub trait Entity: Send + Sync + 'static {
    /// Display name, also the source of the generated entity id
    fn name(&self) -> Option<String>;

    /// Identifier that must stay stable across polls and restarts
    fn unique_id(&self) -> Option<String> {
        None
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        None
    }

    fn available(&self) -> bool {
        true
    }

    /// Current state value; `None` is written as `unknown`
    fn state(&self) -> Option<String>;

    fn device_class(&self) -> Option<String> {
        None
    }

    fn extra_state_attributes(&self) -> Option<HashMap<String, serde_json::Value>> {
        None
    }

    /// Fetch fresh data for this entity
    async fn async_update(&self) -> PlatformResult<()> {
        Ok(())
    }

    /// Used by entity services to reach the concrete entity type
    fn as_any(&self) -> &dyn Any;
}

/// Entities in the `binary_sensor` domain
pub trait BinarySensorEntity: Entity {
    fn is_on(&self) -> Option<bool>;
}

/// Entities in the `fan` domain
pub trait FanEntity: Entity {
    fn is_on(&self) -> Option<bool>;

    fn turn_on(&self) -> PlatformResult<()>;

    fn turn_off(&self) -> PlatformResult<()>;
}

/// `on`/`off` state string for a binary value
pub fn on_off(is_on: Option<bool>) -> Option<String> {
    is_on.map(|on| if on { STATE_ON } else { STATE_OFF }.to_string())
}

/// Device classes for binary sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinarySensorDeviceClass {
    Connectivity,
    Motion,
    Occupancy,
    Presence,
    Problem,
    Running,
}

impl BinarySensorDeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::Motion => "motion",
            Self::Occupancy => "occupancy",
            Self::Presence => "presence",
            Self::Problem => "problem",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for BinarySensorDeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_off() {
        assert_eq!(on_off(Some(true)).as_deref(), Some("on"));
        assert_eq!(on_off(Some(false)).as_deref(), Some("off"));
        assert_eq!(on_off(None), None);
    }

    #[test]
    fn test_device_class_strings() {
        assert_eq!(BinarySensorDeviceClass::Occupancy.to_string(), "occupancy");
        assert_eq!(BinarySensorDeviceClass::Running.as_str(), "running");
    }
}
