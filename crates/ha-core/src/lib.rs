//! Core types for Home Assistant
//!
//! This crate provides the fundamental types shared by the entity platform
//! and integrations: EntityId, State, Context, ServiceCall and DeviceInfo.

mod context;
mod device_info;
mod entity_id;
mod service_call;
mod state;

pub use context::Context;
pub use device_info::{DeviceIdentifier, DeviceInfo};
pub use entity_id::{slugify, EntityId, EntityIdError};
pub use service_call::{EntityTarget, ServiceCall, SupportsResponse};
pub use state::State;

/// State of a binary entity that is on
pub const STATE_ON: &str = "on";

/// State of a binary entity that is off
pub const STATE_OFF: &str = "off";

/// State written when an entity reports itself unavailable
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State written before an entity has produced a value
pub const STATE_UNKNOWN: &str = "unknown";

/// Service data key naming the targeted entities
pub const ATTR_ENTITY_ID: &str = "entity_id";

pub const ATTR_FRIENDLY_NAME: &str = "friendly_name";

pub const ATTR_DEVICE_CLASS: &str = "device_class";

/// `entity_id` value that targets every entity
pub const ENTITY_MATCH_ALL: &str = "all";
