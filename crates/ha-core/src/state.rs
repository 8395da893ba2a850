//! State snapshot written for an entity after each refresh

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Context, EntityId};

/// The state of an entity at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub entity_id: EntityId,

    /// The state value ("on", "off", "unavailable", ...)
    pub state: String,

    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Last time the state value changed
    pub last_changed: DateTime<Utc>,

    /// Last time the state or its attributes were written
    pub last_updated: DateTime<Utc>,

    pub context: Context,
}

impl State {
    pub fn new(
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            state: state.into(),
            attributes,
            last_changed: now,
            last_updated: now,
            context,
        }
    }

    /// The next state for this entity; `last_changed` only moves when the
    /// value differs
    pub fn with_update(
        &self,
        new_state: impl Into<String>,
        new_attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        let new_state = new_state.into();
        let last_changed = if self.state == new_state {
            self.last_changed
        } else {
            now
        };

        Self {
            entity_id: self.entity_id.clone(),
            state: new_state,
            attributes: new_attributes,
            last_changed,
            last_updated: now,
            context,
        }
    }

    /// Typed attribute lookup
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        // Timestamps and context are not part of equality
        self.entity_id == other.entity_id
            && self.state == other.state
            && self.attributes == other.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{STATE_OFF, STATE_ON};
    use serde_json::json;

    fn entity() -> EntityId {
        "binary_sensor.hallway_occupancy".parse().unwrap()
    }

    #[test]
    fn test_unchanged_value_keeps_last_changed() {
        let first = State::new(entity(), STATE_OFF, HashMap::new(), Context::new());
        let mut attrs = HashMap::new();
        attrs.insert("device_class".to_string(), json!("occupancy"));

        let second = first.with_update(STATE_OFF, attrs, Context::new());
        assert_eq!(second.last_changed, first.last_changed);
        assert!(second.last_updated >= first.last_updated);
        assert_eq!(
            second.attribute::<String>("device_class").as_deref(),
            Some("occupancy")
        );
    }

    #[test]
    fn test_changed_value_moves_last_changed() {
        let first = State::new(entity(), STATE_OFF, HashMap::new(), Context::new());
        let second = first.with_update(STATE_ON, HashMap::new(), Context::new());

        assert_eq!(second.state, STATE_ON);
        assert!(second.last_changed >= first.last_changed);
        assert_ne!(first, second);
    }
}
