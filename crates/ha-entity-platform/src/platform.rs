//! Entity platform
//!
//! An [`EntityPlatform`] owns the entities one integration provides for one
//! entity domain (e.g. the `ecobee` entities of `binary_sensor`). It assigns
//! entity ids, refreshes entities, writes their states and dispatches entity
//! services to them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use futures::future::join_all;
use ha_core::{
    Context, EntityId, ATTR_DEVICE_CLASS, ATTR_FRIENDLY_NAME, STATE_UNAVAILABLE, STATE_UNKNOWN,
};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::{Entity, EntityServiceFn, Hass, PlatformResult, ServiceSchema};

/// An entity together with the id it was added under
#[derive(Clone)]
struct PlatformEntity {
    entity_id: EntityId,
    entity: Arc<dyn Entity>,
}

pub struct EntityPlatform {
    hass: Arc<Hass>,
    /// Entity domain, e.g. "binary_sensor"
    domain: String,
    /// Integration providing the entities, e.g. "ecobee"
    platform_name: String,
    entities: RwLock<Vec<PlatformEntity>>,
}

impl EntityPlatform {
    pub fn new(
        hass: Arc<Hass>,
        domain: impl Into<String>,
        platform_name: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            hass,
            domain: domain.into(),
            platform_name: platform_name.into(),
            entities: RwLock::new(Vec::new()),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    pub fn hass(&self) -> &Arc<Hass> {
        &self.hass
    }

    /// Entity ids of every entity added so far
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.snapshot().into_iter().map(|e| e.entity_id).collect()
    }

    /// Look up an added entity by id
    pub fn entity(&self, entity_id: &str) -> Option<Arc<dyn Entity>> {
        self.snapshot()
            .into_iter()
            .find(|e| e.entity_id.to_string() == entity_id)
            .map(|e| e.entity)
    }

    fn snapshot(&self) -> Vec<PlatformEntity> {
        self.entities
            .read()
            .map(|entities| entities.clone())
            .unwrap_or_default()
    }

    /// Add entities to the platform
    ///
    /// With `update_before_add`, each entity is refreshed first and dropped if
    /// the refresh fails. Entities whose unique id is already on this
    /// platform are ignored. Returns the ids of the entities added.
    #[instrument(skip(self, entities), fields(domain = %self.domain, platform = %self.platform_name))]
    pub async fn add_entities(
        &self,
        entities: Vec<Arc<dyn Entity>>,
        update_before_add: bool,
    ) -> Vec<EntityId> {
        if update_before_add {
            let results = join_all(entities.iter().map(|e| e.async_update())).await;
            let mut refreshed = Vec::with_capacity(entities.len());
            for (entity, result) in entities.into_iter().zip(results) {
                match result {
                    Ok(()) => refreshed.push(entity),
                    Err(e) => warn!(name = ?entity.name(), error = %e, "Error on device update"),
                }
            }
            return self.add_refreshed(refreshed);
        }

        self.add_refreshed(entities)
    }

    fn add_refreshed(&self, entities: Vec<Arc<dyn Entity>>) -> Vec<EntityId> {
        let mut added = Vec::new();

        for entity in entities {
            match self.assign_entity_id(entity.as_ref()) {
                Ok(Some(entity_id)) => {
                    if let Some(device) = entity.device_info() {
                        self.hass.register_device(device);
                    }
                    if let Ok(mut list) = self.entities.write() {
                        list.push(PlatformEntity {
                            entity_id: entity_id.clone(),
                            entity: entity.clone(),
                        });
                    }
                    self.write_state(&entity_id, entity.as_ref(), Context::new());
                    added.push(entity_id);
                }
                Ok(None) => {}
                Err(e) => warn!(name = ?entity.name(), error = %e, "Not adding entity"),
            }
        }

        info!(count = added.len(), "Added entities");
        added
    }

    /// Pick the entity id for a new entity, `None` if it must be skipped
    fn assign_entity_id(&self, entity: &dyn Entity) -> PlatformResult<Option<EntityId>> {
        let unique_id = entity.unique_id();

        if let Some(uid) = &unique_id {
            let duplicate = self
                .snapshot()
                .iter()
                .any(|e| e.entity.unique_id().as_deref() == Some(uid.as_str()));
            if duplicate {
                warn!(
                    platform = %self.platform_name,
                    unique_id = %uid,
                    "Platform does not generate unique IDs, ID already exists - ignoring"
                );
                return Ok(None);
            }

            if let Some(existing) =
                self.hass
                    .registered_entity_id(&self.domain, &self.platform_name, uid)
            {
                return Ok(Some(existing));
            }
        }

        let name = entity.name().unwrap_or_default();
        let preferred = EntityId::from_name(self.domain.clone(), &name)?;
        let mut candidate = preferred.clone();
        let mut tries = 1;
        while self.hass.is_entity_id_taken(&candidate) {
            tries += 1;
            candidate = preferred.with_suffix(tries);
        }

        if let Some(uid) = &unique_id {
            self.hass.register_entity(&self.platform_name, uid, &candidate);
        }
        Ok(Some(candidate))
    }

    fn write_state(&self, entity_id: &EntityId, entity: &dyn Entity, context: Context) {
        let state = if entity.available() {
            entity.state().unwrap_or_else(|| STATE_UNKNOWN.to_string())
        } else {
            STATE_UNAVAILABLE.to_string()
        };

        let mut attributes: HashMap<String, Value> =
            entity.extra_state_attributes().unwrap_or_default();
        if let Some(class) = entity.device_class() {
            attributes.insert(ATTR_DEVICE_CLASS.to_string(), Value::String(class));
        }
        if let Some(name) = entity.name() {
            attributes.insert(ATTR_FRIENDLY_NAME.to_string(), Value::String(name));
        }

        self.hass.states.set(entity_id, state, attributes, context);
    }

    /// Refresh one entity and rewrite its state
    ///
    /// A failed refresh is logged and the previous state stays in place.
    async fn update_entity(&self, item: &PlatformEntity, context: Context) {
        match item.entity.async_update().await {
            Ok(()) => self.write_state(&item.entity_id, item.entity.as_ref(), context),
            Err(e) => warn!(entity_id = %item.entity_id, error = %e, "Update failed"),
        }
    }

    /// Refresh every entity of the platform
    #[instrument(skip(self), fields(domain = %self.domain, platform = %self.platform_name))]
    pub async fn async_update_all(&self) {
        let entities = self.snapshot();
        debug!(count = entities.len(), "Polling entities");
        join_all(entities.iter().map(|e| self.update_entity(e, Context::new()))).await;
    }

    /// Poll every `scan_interval` until the platform is dropped
    pub fn start_polling(self: &Arc<Self>, scan_interval: Duration) -> JoinHandle<()> {
        let platform = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scan_interval);
            // First tick completes immediately; entities were refreshed on add
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(platform) = platform.upgrade() else {
                    break;
                };
                platform.async_update_all().await;
            }
        })
    }

    /// Register `<platform_name>.<service>` for entities of type `T`
    pub fn register_entity_service<T, F>(
        self: &Arc<Self>,
        service: &str,
        schema: ServiceSchema,
        handler: F,
    ) -> PlatformResult<()>
    where
        T: Entity,
        F: Fn(&T, &Map<String, Value>) -> PlatformResult<()> + Send + Sync + 'static,
    {
        let domain = self.platform_name.clone();
        self.register_service_in::<T, F>(&domain, service, schema, handler)
    }

    /// Register `<domain>.<service>` (e.g. `fan.turn_on`) for entities of type `T`
    pub fn register_domain_service<T, F>(
        self: &Arc<Self>,
        service: &str,
        schema: ServiceSchema,
        handler: F,
    ) -> PlatformResult<()>
    where
        T: Entity,
        F: Fn(&T, &Map<String, Value>) -> PlatformResult<()> + Send + Sync + 'static,
    {
        let domain = self.domain.clone();
        self.register_service_in::<T, F>(&domain, service, schema, handler)
    }

    fn register_service_in<T, F>(
        self: &Arc<Self>,
        domain: &str,
        service: &str,
        schema: ServiceSchema,
        handler: F,
    ) -> PlatformResult<()>
    where
        T: Entity,
        F: Fn(&T, &Map<String, Value>) -> PlatformResult<()> + Send + Sync + 'static,
    {
        let platform: Weak<Self> = Arc::downgrade(self);
        let handler = Arc::new(handler);
        let coercer = schema.clone();

        let dispatch: EntityServiceFn = Arc::new(move |call| {
            let platform = platform.clone();
            let handler = handler.clone();
            let coercer = coercer.clone();
            Box::pin(async move {
                let Some(platform) = platform.upgrade() else {
                    return Ok(());
                };
                let data = coercer.coerce(&call.service_data)?;
                let target = call.entity_target();
                let mut first_error = None;

                for item in platform.snapshot() {
                    if !target.matches(&item.entity_id.to_string()) {
                        continue;
                    }
                    let Some(entity) = item.entity.as_any().downcast_ref::<T>() else {
                        continue;
                    };
                    debug!(entity_id = %item.entity_id, service = %call.service_id(), "Calling entity service");
                    if let Err(e) = handler(entity, &data) {
                        warn!(entity_id = %item.entity_id, error = %e, "Entity service failed");
                        first_error.get_or_insert(e);
                        continue;
                    }
                    platform.update_entity(&item, call.context.child()).await;
                }

                match first_error {
                    Some(e) => Err(e.into()),
                    None => Ok(()),
                }
            })
        });

        self.hass
            .register_entity_service_fn(domain, service, &schema, dispatch)
    }
}
