//! Host services behind [`CommandDispatch`].
//!
//! The core never writes a store itself; it asks for `switch.turn_on`,
//! `datetime.set_value` and so on. These handlers apply the write and then
//! republish the entity so the change feed sees it like any other state.

use std::sync::Arc;

use mower_core::{
    CommandDispatch, CycleKind, MowerConfig, ServicePayload, SourceId, ACTION_SET_VALUE,
    ACTION_TURN_OFF, ACTION_TURN_ON, DOMAIN_DATETIME, DOMAIN_HOMEASSISTANT, DOMAIN_SWITCH,
};
use mower_store::{stuck_state, StoreError};
use thiserror::Error;

use crate::registry::SourceRegistry;
use crate::state::SharedStores;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no service {domain}.{action}")]
    UnknownService { domain: String, action: String },
    #[error("{domain}.{action} does not handle {entity_id}")]
    UnknownEntity {
        domain: String,
        action: String,
        entity_id: SourceId,
    },
    #[error("{domain}.{action} needs a datetime")]
    BadPayload { domain: String, action: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct MowerServices {
    config: Arc<MowerConfig>,
    registry: Arc<SourceRegistry>,
    stores: SharedStores,
}

impl MowerServices {
    pub fn new(
        config: Arc<MowerConfig>,
        registry: Arc<SourceRegistry>,
        stores: SharedStores,
    ) -> Self {
        Self {
            config,
            registry,
            stores,
        }
    }

    /// Publishes the restored stuck flag and timestamps as entity states.
    pub fn publish_restored(&self) {
        let (stuck, timestamps) = {
            let stores = self.stores.lock();
            (stores.stuck.get(), stores.timestamps.all())
        };
        self.registry
            .set_state(self.config.stuck_source(), Some(stuck_state(stuck).to_string()));
        for kind in CycleKind::ALL {
            self.registry.set_state(
                self.config.timestamp_entity(kind),
                timestamps.get(kind).map(|at| at.to_rfc3339()),
            );
        }
    }

    fn set_stuck(&self, stuck: bool) -> Result<(), DispatchError> {
        let persisted = self.stores.lock().stuck.set(stuck);
        // The in-memory flag changed either way; publish before reporting.
        self.registry
            .set_state(self.config.stuck_source(), Some(stuck_state(stuck).to_string()));
        persisted.map_err(DispatchError::from)
    }

    fn record_cycle(
        &self,
        kind: CycleKind,
        entity_id: SourceId,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), DispatchError> {
        let persisted = self.stores.lock().timestamps.record(kind, at);
        self.registry.set_state(entity_id, Some(at.to_rfc3339()));
        persisted.map_err(DispatchError::from)
    }

    fn set_switch(&self, on: bool) {
        let value = if on { "on" } else { "off" };
        self.registry
            .set_state(self.config.switch_source.clone(), Some(value.to_string()));
    }
}

impl CommandDispatch for MowerServices {
    type Error = DispatchError;

    fn call(
        &self,
        domain: &str,
        action: &str,
        payload: ServicePayload,
    ) -> Result<(), DispatchError> {
        let unknown_entity = |entity_id: &SourceId| DispatchError::UnknownEntity {
            domain: domain.to_string(),
            action: action.to_string(),
            entity_id: entity_id.clone(),
        };
        let turn_on = match (domain, action) {
            (DOMAIN_SWITCH | DOMAIN_HOMEASSISTANT, ACTION_TURN_ON) => true,
            (DOMAIN_SWITCH | DOMAIN_HOMEASSISTANT, ACTION_TURN_OFF) => false,
            (DOMAIN_DATETIME, ACTION_SET_VALUE) => {
                let ServicePayload::Datetime { entity_id, datetime } = payload else {
                    return Err(DispatchError::BadPayload {
                        domain: domain.to_string(),
                        action: action.to_string(),
                    });
                };
                let kind = self
                    .config
                    .kind_for_entity(&entity_id)
                    .ok_or_else(|| unknown_entity(&entity_id))?;
                return self.record_cycle(kind, entity_id, datetime);
            }
            _ => {
                return Err(DispatchError::UnknownService {
                    domain: domain.to_string(),
                    action: action.to_string(),
                })
            }
        };

        let entity_id = payload.entity_id();
        if *entity_id == self.config.stuck_source() {
            self.set_stuck(turn_on)
        } else if *entity_id == self.config.switch_source {
            self.set_switch(turn_on);
            Ok(())
        } else {
            Err(unknown_entity(entity_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mower_core::test_fixtures::{at, base_config, SWITCH_SOURCE};
    use mower_core::{pause_call, SourceLookup};
    use mower_store::{MemoryBackend, MowerStores, StateBackend};
    use parking_lot::Mutex;

    fn services_with(backend: Arc<MemoryBackend>) -> (MowerServices, Arc<SourceRegistry>) {
        let config = Arc::new(base_config());
        let stores = MowerStores::restore(backend as Arc<dyn StateBackend>, &config).unwrap();
        let registry = Arc::new(SourceRegistry::new());
        let services =
            MowerServices::new(config, Arc::clone(&registry), Arc::new(Mutex::new(stores)));
        (services, registry)
    }

    fn services() -> (MowerServices, Arc<SourceRegistry>) {
        services_with(Arc::new(MemoryBackend::new()))
    }

    fn entity(raw: &str) -> ServicePayload {
        ServicePayload::Entity {
            entity_id: SourceId(raw.to_string()),
        }
    }

    #[test]
    fn stuck_switch_sets_store_and_republishes() {
        let (services, registry) = services();
        services
            .call(DOMAIN_SWITCH, ACTION_TURN_ON, entity("switch.robby_stuck"))
            .unwrap();
        assert!(services.stores.lock().stuck.get());
        assert_eq!(
            registry.get_value(&SourceId("switch.robby_stuck".into())).as_deref(),
            Some("on")
        );
    }

    #[test]
    fn set_value_records_timestamp() {
        let (services, registry) = services();
        let entity_id = SourceId("datetime.robby_end_charging_cycle".into());
        services
            .call(
                DOMAIN_DATETIME,
                ACTION_SET_VALUE,
                ServicePayload::Datetime {
                    entity_id: entity_id.clone(),
                    datetime: at(5),
                },
            )
            .unwrap();
        assert_eq!(
            services.stores.lock().timestamps.get(CycleKind::ChargingStop),
            Some(at(5))
        );
        assert_eq!(registry.get_value(&entity_id), Some(at(5).to_rfc3339()));
    }

    #[test]
    fn set_value_without_datetime_is_rejected() {
        let (services, _) = services();
        let err = services
            .call(DOMAIN_DATETIME, ACTION_SET_VALUE, entity("datetime.robby_end_charging_cycle"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::BadPayload { .. }));
    }

    #[test]
    fn pause_turns_the_switch_off() {
        let (services, registry) = services();
        let call = pause_call(&services.config);
        services.call(&call.domain, &call.action, call.payload).unwrap();
        assert_eq!(
            registry.get_value(&SourceId(SWITCH_SOURCE.into())).as_deref(),
            Some("off")
        );
    }

    #[test]
    fn unknown_services_and_entities_are_errors() {
        let (services, _) = services();
        assert!(matches!(
            services.call("light", ACTION_TURN_ON, entity("light.porch")),
            Err(DispatchError::UnknownService { .. })
        ));
        assert!(matches!(
            services.call(DOMAIN_SWITCH, ACTION_TURN_ON, entity("switch.garage")),
            Err(DispatchError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn failed_persist_still_publishes() {
        let backend = Arc::new(MemoryBackend::new());
        let (services, registry) = services_with(Arc::clone(&backend));
        backend.set_reject_writes(true);
        let err = services
            .call(DOMAIN_SWITCH, ACTION_TURN_ON, entity("switch.robby_stuck"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Store(_)));
        assert!(services.stores.lock().stuck.get());
        assert_eq!(
            registry.get_value(&SourceId("switch.robby_stuck".into())).as_deref(),
            Some("on")
        );
    }
}
