//! Service calls the core issues instead of writing stores directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{emit, Counters, Effect, Event, EventEnvelope, MowerConfig, SourceId};

pub const DOMAIN_SWITCH: &str = "switch";
pub const DOMAIN_DATETIME: &str = "datetime";
pub const DOMAIN_HOMEASSISTANT: &str = "homeassistant";

pub const ACTION_TURN_ON: &str = "turn_on";
pub const ACTION_TURN_OFF: &str = "turn_off";
pub const ACTION_SET_VALUE: &str = "set_value";

/// Host-side command dispatch. Implementations own the stores.
pub trait CommandDispatch {
    type Error: std::fmt::Display;

    fn call(&self, domain: &str, action: &str, payload: ServicePayload) -> Result<(), Self::Error>;
}

// `Datetime` first: untagged matching takes the first variant that fits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServicePayload {
    Datetime {
        entity_id: SourceId,
        datetime: DateTime<Utc>,
    },
    Entity {
        entity_id: SourceId,
    },
}

impl ServicePayload {
    pub fn entity_id(&self) -> &SourceId {
        match self {
            ServicePayload::Datetime { entity_id, .. } | ServicePayload::Entity { entity_id } => {
                entity_id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub domain: String,
    pub action: String,
    pub payload: ServicePayload,
}

impl ServiceCall {
    fn new(domain: &str, action: &str, payload: ServicePayload) -> Self {
        Self {
            domain: domain.to_string(),
            action: action.to_string(),
            payload,
        }
    }
}

pub fn effect_call(effect: Effect, at: DateTime<Utc>, config: &MowerConfig) -> ServiceCall {
    match effect {
        Effect::RecordCycle(kind) => ServiceCall::new(
            DOMAIN_DATETIME,
            ACTION_SET_VALUE,
            ServicePayload::Datetime {
                entity_id: config.timestamp_entity(kind),
                datetime: at,
            },
        ),
        Effect::SetStuck(on) => ServiceCall::new(
            DOMAIN_SWITCH,
            if on { ACTION_TURN_ON } else { ACTION_TURN_OFF },
            ServicePayload::Entity {
                entity_id: config.stuck_source(),
            },
        ),
    }
}

/// Pausing turns the active switch off.
pub fn pause_call(config: &MowerConfig) -> ServiceCall {
    ServiceCall::new(
        DOMAIN_HOMEASSISTANT,
        ACTION_TURN_OFF,
        ServicePayload::Entity {
            entity_id: config.switch_source.clone(),
        },
    )
}

/// Dispatches effects in order. A failed call does not stop the rest; each
/// failure comes back as a `DispatchFailed` event.
pub fn dispatch_effects<D: CommandDispatch>(
    dispatcher: &D,
    config: &MowerConfig,
    effects: &[Effect],
    at: DateTime<Utc>,
    counters: &mut Counters,
) -> Vec<EventEnvelope> {
    let mut failures = Vec::new();
    for effect in effects {
        let call = effect_call(*effect, at, config);
        if let Err(err) = dispatcher.call(&call.domain, &call.action, call.payload) {
            failures.push(emit(
                counters,
                at,
                Event::DispatchFailed {
                    domain: call.domain,
                    action: call.action,
                    reason: err.to_string(),
                },
            ));
        }
    }
    failures
}
