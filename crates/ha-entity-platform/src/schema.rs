//! Entity service schemas
//!
//! A [`ServiceSchema`] lists the fields an entity service accepts. It yields
//! a JSON schema for the service registry, which checks the shape of the
//! call, and coerces the accepted values into their final type before the
//! entity sees them.

use serde_json::{json, Map, Value};

use crate::{PlatformError, PlatformResult};
use ha_core::ATTR_ENTITY_ID;

/// Value type of a service field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Coerced to an integer: ints, floats (truncated), bools and numeric strings
    Integer,
    /// Coerced to a bool: bools, numbers and on/off style strings
    Boolean,
    /// Strings as given; numbers and bools are rendered as strings
    String,
}

#[derive(Debug, Clone)]
struct ServiceField {
    name: String,
    kind: FieldKind,
    required: bool,
}

/// Fields accepted by an entity service
#[derive(Debug, Clone, Default)]
pub struct ServiceSchema {
    fields: Vec<ServiceField>,
}

impl ServiceSchema {
    /// A schema accepting only an entity target
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(ServiceField {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(ServiceField {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// JSON schema describing the accepted service data
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert(ATTR_ENTITY_ID.to_string(), json!({"type": ["string", "array"]}));

        for field in &self.fields {
            let accepted = match field.kind {
                FieldKind::Integer => json!({"type": ["integer", "number", "string", "boolean"]}),
                FieldKind::Boolean => json!({"type": ["boolean", "number", "string"]}),
                FieldKind::String => json!({"type": ["string", "number", "boolean"]}),
            };
            properties.insert(field.name.clone(), accepted);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Coerce the declared fields of `data`
    ///
    /// The returned map holds only declared fields, each in its final type.
    pub fn coerce(&self, data: &Value) -> PlatformResult<Map<String, Value>> {
        let mut out = Map::new();

        for field in &self.fields {
            let raw = match data.get(&field.name) {
                Some(raw) => raw,
                None if field.required => {
                    return Err(PlatformError::MissingField(field.name.clone()))
                }
                None => continue,
            };

            let value = match field.kind {
                FieldKind::Integer => coerce_int(raw).map(Value::from),
                FieldKind::Boolean => coerce_bool(raw).map(Value::from),
                FieldKind::String => coerce_string(raw).map(Value::from),
            }
            .ok_or_else(|| PlatformError::InvalidField {
                field: field.name.clone(),
                reason: format!("cannot interpret {} as {:?}", raw, field.kind),
            })?;

            out.insert(field.name.clone(), value);
        }

        Ok(out)
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "enable" => Some(true),
            "0" | "false" | "no" | "off" | "disable" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
