//! Entity platform for Home Assistant integrations
//!
//! Integrations hand their entities to an [`EntityPlatform`], which gives
//! each one an entity id, keeps its state current in the [`StateTable`] and
//! routes entity service calls to it.
//!
//! # Example
//!
//! ```ignore
//! let hass = Hass::new();
//! let platform = EntityPlatform::new(hass.clone(), "binary_sensor", "ecobee");
//! platform.add_entities(entities, true).await;
//! let poller = platform.start_polling(Duration::from_secs(180));
//! ```

mod entity;
mod error;
mod hass;
mod platform;
mod schema;
mod states;

pub use entity::{on_off, BinarySensorDeviceClass, BinarySensorEntity, Entity, FanEntity};
pub use error::{PlatformError, PlatformResult};
pub use hass::{EntityServiceFn, Hass};
pub use platform::EntityPlatform;
pub use schema::{FieldKind, ServiceSchema};
pub use states::StateTable;
