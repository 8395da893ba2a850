//! Service registry with async handlers for Home Assistant
//!
//! This crate provides the ServiceRegistry, which maps `domain.service` keys
//! to async handlers. A service may carry a JSON schema; service data is
//! validated against it before the handler runs.

use dashmap::DashMap;
use ha_core::{Context, ServiceCall, SupportsResponse};
use jsonschema::JSONSchema;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Result type for service calls
pub type ServiceResult = Result<Option<serde_json::Value>, ServiceError>;

/// Future type for async service handlers
pub type ServiceFuture = Pin<Box<dyn Future<Output = ServiceResult> + Send>>;

/// Service handler function type
pub type ServiceHandler = Arc<dyn Fn(ServiceCall) -> ServiceFuture + Send + Sync>;

/// Errors that can occur when working with services
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("service not found: {domain}.{service}")]
    NotFound { domain: String, service: String },

    #[error("service call failed: {0}")]
    CallFailed(String),

    #[error("invalid service data: {0}")]
    InvalidData(String),

    #[error("invalid schema for {service}: {reason}")]
    InvalidSchema { service: String, reason: String },

    #[error("service does not support responses")]
    ResponseNotSupported,
}

/// Information about a registered service
#[derive(Debug, Clone, Default)]
pub struct ServiceDescription {
    pub domain: String,
    pub service: String,
    /// JSON schema the service data must satisfy
    pub schema: Option<serde_json::Value>,
    pub supports_response: SupportsResponse,
}

impl ServiceDescription {
    /// Bare description for `domain.service`
    pub fn new(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    fn key(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }
}

struct RegisteredService {
    handler: ServiceHandler,
    validator: Option<Arc<JSONSchema>>,
    description: ServiceDescription,
}

/// The service registry manages all registered services
pub struct ServiceRegistry {
    /// Services indexed by "domain.service" key
    services: DashMap<String, RegisteredService>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a service with a full description
    ///
    /// Fails if the description carries a schema that does not compile.
    /// Registering an existing key replaces the previous handler.
    #[instrument(skip(self, handler), fields(service = %description.key()))]
    pub fn register_with_description<F, Fut>(
        &self,
        description: ServiceDescription,
        handler: F,
    ) -> Result<(), ServiceError>
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        let key = description.key();

        let validator = match &description.schema {
            Some(schema) => {
                let compiled =
                    JSONSchema::compile(schema).map_err(|e| ServiceError::InvalidSchema {
                        service: key.clone(),
                        reason: e.to_string(),
                    })?;
                Some(Arc::new(compiled))
            }
            None => None,
        };

        debug!(has_schema = validator.is_some(), "Registering service with description");

        self.services.insert(
            key,
            RegisteredService {
                handler: Arc::new(move |call| Box::pin(handler(call)) as ServiceFuture),
                validator,
                description,
            },
        );
        Ok(())
    }

    /// Call a service
    ///
    /// Service data is validated against the registered schema first; a
    /// mismatch returns [`ServiceError::InvalidData`] without running the
    /// handler.
    #[instrument(skip(self, service_data, context))]
    pub async fn call(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
        context: Context,
        return_response: bool,
    ) -> ServiceResult {
        let key = format!("{}.{}", domain, service);

        let (handler, validator) = {
            let registered = self.services.get(&key).ok_or_else(|| {
                warn!(domain = %domain, service = %service, "Service not found");
                ServiceError::NotFound {
                    domain: domain.to_string(),
                    service: service.to_string(),
                }
            })?;

            if return_response && registered.description.supports_response == SupportsResponse::None
            {
                return Err(ServiceError::ResponseNotSupported);
            }

            (registered.handler.clone(), registered.validator.clone())
        };

        if let Some(validator) = validator {
            validate(&validator, &service_data)?;
        }

        debug!(domain = %domain, service = %service, "Calling service");

        let result = handler(ServiceCall::new(domain, service, service_data, context)).await?;

        if return_response {
            Ok(result)
        } else {
            Ok(None)
        }
    }

    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.contains_key(&format!("{}.{}", domain, service))
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(validator: &JSONSchema, data: &serde_json::Value) -> Result<(), ServiceError> {
    if let Err(errors) = validator.validate(data) {
        let reasons: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(ServiceError::InvalidData(reasons.join("; ")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn register_noop(registry: &ServiceRegistry, domain: &str, service: &str) {
        registry
            .register_with_description(
                ServiceDescription::new(domain, service),
                |_: ServiceCall| async { Ok(None) },
            )
            .unwrap();
    }

    fn timer_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {"is_ventilator_timer_on": {"type": "boolean"}},
            "required": ["is_ventilator_timer_on"]
        })
    }

    #[tokio::test]
    async fn test_register_and_call_with_response() {
        let registry = ServiceRegistry::new();
        let mut description = ServiceDescription::new("test", "echo");
        description.supports_response = SupportsResponse::Optional;

        registry
            .register_with_description(description, |call: ServiceCall| async move {
                Ok(Some(call.service_data))
            })
            .unwrap();

        let result = registry
            .call("test", "echo", json!({"msg": "hello"}), Context::new(), true)
            .await
            .unwrap();
        assert_eq!(result, Some(json!({"msg": "hello"})));
    }

    #[tokio::test]
    async fn test_service_not_found() {
        let registry = ServiceRegistry::new();
        let result = registry
            .call("ecobee", "missing", json!({}), Context::new(), false)
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_response_not_supported() {
        let registry = ServiceRegistry::new();
        register_noop(&registry, "fan", "turn_on");

        assert!(registry
            .call("fan", "turn_on", json!({}), Context::new(), false)
            .await
            .is_ok());
        assert!(matches!(
            registry
                .call("fan", "turn_on", json!({}), Context::new(), true)
                .await,
            Err(ServiceError::ResponseNotSupported)
        ));
    }

    #[tokio::test]
    async fn test_schema_rejects_before_handler() {
        let registry = ServiceRegistry::new();
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();

        registry
            .register_with_description(
                ServiceDescription::new("ecobee", "set_ventilator_timer")
                    .with_schema(timer_schema()),
                move |_call: ServiceCall| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        Ok(None)
                    }
                },
            )
            .unwrap();

        let bad = registry
            .call(
                "ecobee",
                "set_ventilator_timer",
                json!({"is_ventilator_timer_on": "sometimes"}),
                Context::new(),
                false,
            )
            .await;
        assert!(matches!(bad, Err(ServiceError::InvalidData(_))));

        let missing = registry
            .call("ecobee", "set_ventilator_timer", json!({}), Context::new(), false)
            .await;
        assert!(matches!(missing, Err(ServiceError::InvalidData(_))));

        registry
            .call(
                "ecobee",
                "set_ventilator_timer",
                json!({"is_ventilator_timer_on": true}),
                Context::new(),
                false,
            )
            .await
            .unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let registry = ServiceRegistry::new();
        let result = registry.register_with_description(
            ServiceDescription::new("ecobee", "broken").with_schema(json!({"type": 12})),
            |_call: ServiceCall| async move { Ok(None) },
        );
        assert!(matches!(result, Err(ServiceError::InvalidSchema { .. })));
        assert!(!registry.has_service("ecobee", "broken"));
    }

    #[test]
    fn test_reregister_replaces_service() {
        let registry = ServiceRegistry::new();
        register_noop(&registry, "ecobee", "set_ventilator_timer");
        assert!(registry.has_service("ecobee", "set_ventilator_timer"));
        assert!(!registry.has_service("fan", "set_ventilator_timer"));

        registry
            .register_with_description(
                ServiceDescription::new("ecobee", "set_ventilator_timer")
                    .with_schema(timer_schema()),
                |_: ServiceCall| async { Ok(None) },
            )
            .unwrap();
        assert_eq!(registry.services.len(), 1);
        assert!(registry
            .services
            .get("ecobee.set_ventilator_timer")
            .unwrap()
            .validator
            .is_some());
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let registry = ServiceRegistry::new();
        registry
            .register_with_description(
                ServiceDescription::new("test", "fail"),
                |_: ServiceCall| async move {
                    Err(ServiceError::CallFailed("intentional failure".to_string()))
                },
            )
            .unwrap();

        let result = registry
            .call("test", "fail", json!({}), Context::new(), false)
            .await;
        assert!(matches!(result, Err(ServiceError::CallFailed(_))));
    }
}
