use std::collections::VecDeque;
use std::sync::Arc;

use mower_core::{Counters, EventEnvelope, Evaluation, MowerConfig, TransitionTracker};
use mower_store::MowerStores;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::registry::SourceRegistry;
use crate::services::MowerServices;

/// Recent events kept for `GET /api/v1/events`.
pub const RECENT_EVENTS_CAP: usize = 256;

#[derive(Default)]
pub struct MowerState {
    pub tracker: TransitionTracker,
    pub counters: Counters,
    pub last_evaluation: Option<Evaluation>,
    pub recent_events: VecDeque<EventEnvelope>,
}

impl MowerState {
    pub fn push_events(&mut self, events: &[EventEnvelope]) {
        self.recent_events.extend(events.iter().cloned());
        while self.recent_events.len() > RECENT_EVENTS_CAP {
            self.recent_events.pop_front();
        }
    }
}

pub type SharedMower = Arc<Mutex<MowerState>>;
pub type SharedStores = Arc<Mutex<MowerStores>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;

/// Lock order: `mower`, then `stores`, then the registry's own lock.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MowerConfig>,
    pub mower: SharedMower,
    pub stores: SharedStores,
    pub registry: Arc<SourceRegistry>,
    pub services: Arc<MowerServices>,
    pub event_tx: EventTx,
}

impl AppState {
    pub fn new(config: MowerConfig, stores: MowerStores) -> Self {
        let config = Arc::new(config);
        let stores = Arc::new(Mutex::new(stores));
        let registry = Arc::new(SourceRegistry::new());
        let services = Arc::new(MowerServices::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            Arc::clone(&stores),
        ));
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            mower: Arc::new(Mutex::new(MowerState::default())),
            stores,
            registry,
            services,
            event_tx,
        }
    }
}
