//! In-memory table of entity states, indexed by domain

use std::collections::HashMap;

use dashmap::DashMap;
use ha_core::{Context, EntityId, State};
use tracing::{debug, instrument};

/// Current state of every entity written by a platform
#[derive(Default)]
pub struct StateTable {
    /// States keyed by entity_id string
    states: DashMap<String, State>,
    /// entity_id strings per domain, in insertion order
    domain_index: DashMap<String, Vec<String>>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the state of an entity
    ///
    /// An existing entry keeps its `last_changed` unless the value changed.
    #[instrument(skip(self, state, attributes, context), fields(entity_id = %entity_id))]
    pub fn set(
        &self,
        entity_id: &EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> State {
        let key = entity_id.to_string();
        let previous = self.states.get(&key).map(|s| s.clone());

        let new_state = match &previous {
            Some(existing) => existing.with_update(state, attributes, context),
            None => State::new(entity_id.clone(), state, attributes, context),
        };

        debug!(
            state = %new_state.state,
            changed = previous.as_ref().map_or(true, |s| s.state != new_state.state),
            "Writing entity state"
        );

        self.states.insert(key.clone(), new_state.clone());
        if previous.is_none() {
            self.domain_index
                .entry(entity_id.domain().to_string())
                .or_default()
                .push(key);
        }

        new_state
    }

    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Whether an entity_id already has a state
    pub fn contains(&self, entity_id: &str) -> bool {
        self.states.contains_key(entity_id)
    }

    pub fn is_state(&self, entity_id: &str, state: &str) -> bool {
        self.states
            .get(entity_id)
            .map_or(false, |s| s.state == state)
    }

    /// Entity ids of a domain in the order they were first written
    pub fn entity_ids(&self, domain: &str) -> Vec<String> {
        self.domain_index
            .get(domain)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
