use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use mower_core::{
    dispatch_effects, evaluate, read_signals, CommandDispatch, Counters, EventEnvelope,
    MowerConfig, MowerStatus, ServicePayload, SourceStates, TransitionTracker, ACTION_SET_VALUE,
    ACTION_TURN_OFF, ACTION_TURN_ON, DOMAIN_DATETIME, DOMAIN_SWITCH,
};
use mower_store::{JsonFileBackend, MemoryBackend, MowerStores, StateBackend};
use serde::Deserialize;

/// Evaluations per step before giving up on the stuck flag settling.
const MAX_ROUNDS: usize = 3;

/// One recorded reading. A missing or `null` value means the source was unavailable.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayStep {
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub switch: Option<String>,
}

pub fn load_steps(path: &Path) -> Result<Vec<ReplayStep>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading replay input: {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("parsing replay input: {}", path.display()))
}

/// Applies effects straight to the stores.
pub struct ReplayServices {
    config: MowerConfig,
    stores: RefCell<MowerStores>,
}

impl ReplayServices {
    pub fn stuck(&self) -> bool {
        self.stores.borrow().stuck.get()
    }

    pub fn stores(&self) -> std::cell::Ref<'_, MowerStores> {
        self.stores.borrow()
    }
}

impl CommandDispatch for ReplayServices {
    type Error = anyhow::Error;

    fn call(&self, domain: &str, action: &str, payload: ServicePayload) -> Result<()> {
        match (domain, action, payload) {
            (DOMAIN_SWITCH, ACTION_TURN_ON | ACTION_TURN_OFF, ServicePayload::Entity { entity_id })
                if entity_id == self.config.stuck_source() =>
            {
                self.stores
                    .borrow_mut()
                    .stuck
                    .set(action == ACTION_TURN_ON)?;
            }
            (
                DOMAIN_DATETIME,
                ACTION_SET_VALUE,
                ServicePayload::Datetime {
                    entity_id,
                    datetime,
                },
            ) => {
                let kind = self
                    .config
                    .kind_for_entity(&entity_id)
                    .ok_or_else(|| anyhow!("no cycle timestamp named {entity_id}"))?;
                self.stores.borrow_mut().timestamps.record(kind, datetime)?;
            }
            (domain, action, payload) => {
                return Err(anyhow!(
                    "replay has no {domain}.{action} for {}",
                    payload.entity_id()
                ));
            }
        }
        Ok(())
    }
}

/// Drives recorded readings through the same pipeline the daemon runs.
pub struct Replay {
    config: MowerConfig,
    sources: SourceStates,
    tracker: TransitionTracker,
    counters: Counters,
    services: ReplayServices,
    status: Option<MowerStatus>,
}

impl Replay {
    pub fn new(config: MowerConfig, state_file: Option<&Path>) -> Result<Self> {
        let backend: Arc<dyn StateBackend> = match state_file {
            Some(path) => Arc::new(
                JsonFileBackend::open(path)
                    .with_context(|| format!("opening state file: {}", path.display()))?,
            ),
            None => Arc::new(MemoryBackend::new()),
        };
        let stores = MowerStores::restore(backend, &config).context("restoring mower state")?;
        Ok(Self {
            services: ReplayServices {
                config: config.clone(),
                stores: RefCell::new(stores),
            },
            config,
            sources: SourceStates::default(),
            tracker: TransitionTracker::new(),
            counters: Counters::default(),
            status: None,
        })
    }

    pub fn status(&self) -> Option<MowerStatus> {
        self.status
    }

    pub fn services(&self) -> &ReplayServices {
        &self.services
    }

    pub fn step(&mut self, step: &ReplayStep) -> Vec<EventEnvelope> {
        self.sources
            .set(self.config.power_source.clone(), step.power.clone());
        self.sources
            .set(self.config.switch_source.clone(), step.switch.clone());
        self.settle(step.at)
    }

    // A stuck write is a source change of its own, so evaluate again until
    // the flag stops moving.
    fn settle(&mut self, at: DateTime<Utc>) -> Vec<EventEnvelope> {
        let mut events = Vec::new();
        for _ in 0..MAX_ROUNDS {
            let stuck = self.services.stuck();
            let snapshot = read_signals(&self.sources, &self.config);
            let evaluation = evaluate(&mut self.tracker, &snapshot, stuck, at, &mut self.counters);
            let failures = dispatch_effects(
                &self.services,
                &self.config,
                &evaluation.step.effects,
                at,
                &mut self.counters,
            );
            self.status = Some(evaluation.status);
            events.extend(evaluation.events);
            events.extend(failures);
            if self.services.stuck() == stuck {
                break;
            }
        }
        events
    }
}
