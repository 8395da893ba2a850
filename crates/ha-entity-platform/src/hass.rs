//! Shared host state handed to every platform
//!
//! [`Hass`] bundles the service registry, the state table, the unique-id
//! to entity-id registry and the device list. Entity services registered by
//! several platforms under the same name share one registry entry and fan
//! out to every platform's dispatcher.

use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{join_all, BoxFuture};
use ha_core::{Context, DeviceInfo, EntityId, ServiceCall};
use ha_service_registry::{ServiceDescription, ServiceError, ServiceRegistry, ServiceResult};
use tracing::{debug, info};

use crate::{PlatformResult, ServiceSchema, StateTable};

/// Dispatcher a platform contributes to an entity service
pub type EntityServiceFn =
    Arc<dyn Fn(ServiceCall) -> BoxFuture<'static, Result<(), ServiceError>> + Send + Sync>;

/// Key of the entity registry: (domain, platform, unique_id)
type RegistryKey = (String, String, String);

pub struct Hass {
    pub services: Arc<ServiceRegistry>,
    pub states: StateTable,
    entity_registry: DashMap<RegistryKey, EntityId>,
    devices: RwLock<Vec<DeviceInfo>>,
    entity_services: Arc<DashMap<String, Vec<EntityServiceFn>>>,
}

impl Hass {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            services: Arc::new(ServiceRegistry::new()),
            states: StateTable::new(),
            entity_registry: DashMap::new(),
            devices: RwLock::new(Vec::new()),
            entity_services: Arc::new(DashMap::new()),
        })
    }

    /// Call a service without asking for a response
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
    ) -> ServiceResult {
        self.services
            .call(domain, service, service_data, Context::new(), false)
            .await
    }

    /// Add a platform dispatcher to the entity service `domain.service`
    ///
    /// The first dispatcher registers the service itself, using `schema`
    /// for validation; later ones join the fan-out.
    pub fn register_entity_service_fn(
        &self,
        domain: &str,
        service: &str,
        schema: &ServiceSchema,
        dispatch: EntityServiceFn,
    ) -> PlatformResult<()> {
        let key = format!("{}.{}", domain, service);

        match self.entity_services.entry(key.clone()) {
            Entry::Occupied(mut dispatchers) => dispatchers.get_mut().push(dispatch),
            Entry::Vacant(slot) => {
                let hub = self.entity_services.clone();
                let hub_key = key.clone();

                self.services.register_with_description(
                    ServiceDescription::new(domain, service).with_schema(schema.json_schema()),
                    move |call: ServiceCall| {
                        let dispatchers = hub
                            .get(&hub_key)
                            .map(|d| d.clone())
                            .unwrap_or_default();
                        async move {
                            // Every dispatcher runs; the first failure is reported
                            let results =
                                join_all(dispatchers.iter().map(|dispatch| dispatch(call.clone())))
                                    .await;
                            results.into_iter().collect::<Result<Vec<()>, _>>()?;
                            Ok(None)
                        }
                    },
                )?;
                slot.insert(vec![dispatch]);
                info!(service = %key, "Registered entity service");
            }
        }
        Ok(())
    }

    /// Entity id previously assigned to a unique id, if any
    pub fn registered_entity_id(
        &self,
        domain: &str,
        platform: &str,
        unique_id: &str,
    ) -> Option<EntityId> {
        self.entity_registry
            .get(&(domain.to_string(), platform.to_string(), unique_id.to_string()))
            .map(|id| id.clone())
    }

    pub fn register_entity(&self, platform: &str, unique_id: &str, entity_id: &EntityId) {
        debug!(%entity_id, unique_id, "Registering entity");
        self.entity_registry.insert(
            (
                entity_id.domain().to_string(),
                platform.to_string(),
                unique_id.to_string(),
            ),
            entity_id.clone(),
        );
    }

    /// Whether an entity id is taken by a registered entity or a state
    pub fn is_entity_id_taken(&self, entity_id: &EntityId) -> bool {
        self.states.contains(&entity_id.to_string())
            || self.entity_registry.iter().any(|e| e.value() == entity_id)
    }

    /// Record a device, merging with a known device that shares an identifier
    pub fn register_device(&self, info: DeviceInfo) {
        let Ok(mut devices) = self.devices.write() else {
            return;
        };

        match devices.iter_mut().find(|d| d.shares_identifier(&info)) {
            Some(existing) => {
                existing.identifiers.extend(info.identifiers);
                existing.manufacturer = existing.manufacturer.take().or(info.manufacturer);
                existing.model = existing.model.take().or(info.model);
                existing.name = existing.name.take().or(info.name);
            }
            None => {
                debug!(name = ?info.name, "Registering device");
                devices.push(info);
            }
        }
    }

    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.devices
            .read()
            .map(|devices| devices.clone())
            .unwrap_or_default()
    }
}
