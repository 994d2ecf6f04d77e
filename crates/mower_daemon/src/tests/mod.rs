//! Daemon tests. The evaluation loop is pumped by hand so every change is
//! evaluated at a fixed fixture time.


use std::sync::Arc;

use mower_core::test_fixtures::{at, base_config};
use mower_core::{EventEnvelope, SourceId, SourceStates};
use mower_store::{MemoryBackend, MowerStores, StateBackend};
use tokio::sync::mpsc;

use crate::evaluation_loop::evaluate_once;
use crate::registry::StateChange;
use crate::state::AppState;

pub(crate) struct TestDaemon {
    pub app: AppState,
    pub sources: SourceStates,
    pub changes: mpsc::UnboundedReceiver<StateChange>,
}

impl TestDaemon {
    pub fn new() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()))
    }

    pub fn with_backend(backend: Arc<MemoryBackend>) -> Self {
        let config = base_config();
        let stores = MowerStores::restore(backend as Arc<dyn StateBackend>, &config).unwrap();
        let app = AppState::new(config, stores);
        app.services.publish_restored();
        let (sources, changes) = app.registry.subscribe(app.config.watched_sources());
        Self {
            app,
            sources,
            changes,
        }
    }

    /// Startup evaluation, as the loop does before reading the feed.
    pub fn start(&mut self, minute: i64) -> Vec<EventEnvelope> {
        evaluate_once(&self.app, &self.sources, at(minute))
    }

    /// Evaluates once per queued change, including changes made while
    /// dispatching, until the feed is empty.
    pub fn pump(&mut self, minute: i64) -> Vec<EventEnvelope> {
        let mut events = Vec::new();
        while let Ok(change) = self.changes.try_recv() {
            self.sources.set(change.entity_id, change.new_value);
            events.extend(evaluate_once(&self.app, &self.sources, at(minute)));
        }
        events
    }

    pub fn set(
        &mut self,
        source: &SourceId,
        value: Option<&str>,
        minute: i64,
    ) -> Vec<EventEnvelope> {
        self.app
            .registry
            .set_state(source.clone(), value.map(str::to_string));
        self.pump(minute)
    }

    pub fn power(&mut self, watts: &str, minute: i64) -> Vec<EventEnvelope> {
        let source = self.app.config.power_source.clone();
        self.set(&source, Some(watts), minute)
    }

    pub fn switch(&mut self, state: Option<&str>, minute: i64) -> Vec<EventEnvelope> {
        let source = self.app.config.switch_source.clone();
        self.set(&source, state, minute)
    }

    /// Switch on, docked at 2.5 W, evaluated at minute 0.
    pub fn docked() -> Self {
        let mut daemon = Self::new();
        daemon.start(0);
        daemon.switch(Some("on"), 0);
        daemon.power("2.5", 0);
        daemon
    }

    pub fn stuck(&self) -> bool {
        self.app.stores.lock().stuck.get()
    }
}
