//! Service call type for invoking services

use crate::{Context, ATTR_ENTITY_ID, ENTITY_MATCH_ALL};
use serde::{Deserialize, Serialize};

/// A call to a service such as `ecobee.set_ventilator_timer`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCall {
    /// Domain the service belongs to (e.g. "ecobee", "fan")
    pub domain: String,

    /// Service name (e.g. "set_ventilator_timer")
    pub service: String,

    /// Data passed to the service, including any `entity_id` target
    pub service_data: serde_json::Value,

    /// Who initiated this call
    pub context: Context,
}

/// Which entities a call is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityTarget {
    /// No `entity_id` given, or `entity_id: all`
    All,
    /// An explicit list of entity ids
    Ids(Vec<String>),
}

impl EntityTarget {
    /// Whether `entity_id` is selected by this target
    pub fn matches(&self, entity_id: &str) -> bool {
        match self {
            EntityTarget::All => true,
            EntityTarget::Ids(ids) => ids.iter().any(|id| id == entity_id),
        }
    }
}

impl ServiceCall {
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        service_data: serde_json::Value,
        context: Context,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            service_data,
            context,
        }
    }

    /// `domain.service`
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// Entities targeted by this call
    ///
    /// `entity_id` may be a single string, a comma separated string or a
    /// list. A missing `entity_id` or the literal `all` targets everything.
    pub fn entity_target(&self) -> EntityTarget {
        let ids: Vec<String> = match self.service_data.get(ATTR_ENTITY_ID) {
            None | Some(serde_json::Value::Null) => return EntityTarget::All,
            Some(serde_json::Value::String(s)) => s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            Some(serde_json::Value::Array(arr)) => arr
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            Some(_) => Vec::new(),
        };

        if ids.iter().any(|id| id == ENTITY_MATCH_ALL) {
            EntityTarget::All
        } else {
            EntityTarget::Ids(ids)
        }
    }
}

/// Whether a service supports returning a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportsResponse {
    #[default]
    None,
    Optional,
    Only,
}
