//! Shared test fixtures for `mower_core` and downstream crates.
//!
//! `Harness` plays the host: it owns the source states, the stuck flag and the
//! cycle slots, applies effects through [`CommandDispatch`], and re-evaluates
//! when the stuck flag changes the way a subscribed host would.

use std::cell::{Cell, RefCell};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    dispatch_effects, evaluate, read_signals, CommandDispatch, Counters, CycleTimestamps,
    EventEnvelope, MowerConfig, MowerStatus, ServiceCall, ServicePayload, Signal, SignalSnapshot,
    SourceId, SourceStates, TransitionTracker, ACTION_SET_VALUE, ACTION_TURN_OFF, ACTION_TURN_ON,
    DOMAIN_DATETIME, DOMAIN_SWITCH,
};

pub const POWER_SOURCE: &str = "sensor.robby_plug_power";
pub const SWITCH_SOURCE: &str = "switch.robby_plug";

pub fn base_config() -> MowerConfig {
    MowerConfig::new("robby", POWER_SOURCE, SWITCH_SOURCE).unwrap()
}

/// Fixed epoch plus `minutes`.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn sources(power: Option<&str>, switch: Option<&str>) -> SourceStates {
    let mut states = SourceStates::default();
    states.set(SourceId(POWER_SOURCE.to_string()), power.map(str::to_string));
    states.set(SourceId(SWITCH_SOURCE.to_string()), switch.map(str::to_string));
    states
}

/// Available snapshot with the switch on.
pub fn snapshot(power: f64) -> SignalSnapshot {
    SignalSnapshot::new(Signal::Available(power), Signal::Available(true))
}

/// Power source missing, switch on.
pub fn unavailable_snapshot() -> SignalSnapshot {
    read_signals(&sources(None, Some("on")), &base_config())
}

/// Dispatcher that records every call and fails for one domain.
#[derive(Default)]
pub struct RecordingDispatch {
    calls: RefCell<Vec<ServiceCall>>,
    failing_domain: Option<String>,
}

impl RecordingDispatch {
    pub fn failing_on(domain: &str) -> Self {
        Self {
            calls: RefCell::default(),
            failing_domain: Some(domain.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.borrow().clone()
    }
}

impl CommandDispatch for RecordingDispatch {
    type Error = String;

    fn call(&self, domain: &str, action: &str, payload: ServicePayload) -> Result<(), String> {
        self.calls.borrow_mut().push(ServiceCall {
            domain: domain.to_string(),
            action: action.to_string(),
            payload,
        });
        if self.failing_domain.as_deref() == Some(domain) {
            return Err(format!("{domain} unavailable"));
        }
        Ok(())
    }
}

/// In-memory host holding the durable values.
pub struct FixtureHost {
    config: MowerConfig,
    stuck: Cell<bool>,
    timestamps: Cell<CycleTimestamps>,
}

impl CommandDispatch for FixtureHost {
    type Error = String;

    fn call(&self, domain: &str, action: &str, payload: ServicePayload) -> Result<(), String> {
        match (domain, action, payload) {
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
                    .ok_or_else(|| format!("unknown entity {entity_id}"))?;
                let mut timestamps = self.timestamps.get();
                timestamps.set(kind, Some(datetime));
                self.timestamps.set(timestamps);
                Ok(())
            }
            (DOMAIN_SWITCH, ACTION_TURN_ON | ACTION_TURN_OFF, ServicePayload::Entity { entity_id })
                if entity_id == self.config.stuck_source() =>
            {
                self.stuck.set(action == ACTION_TURN_ON);
                Ok(())
            }
            (domain, action, _) => Err(format!("no service {domain}.{action}")),
        }
    }
}

pub struct Harness {
    pub config: MowerConfig,
    pub sources: SourceStates,
    pub host: FixtureHost,
    pub tracker: TransitionTracker,
    pub counters: Counters,
    pub last_status: Option<MowerStatus>,
}

impl Harness {
    pub fn new() -> Self {
        let config = base_config();
        Self {
            host: FixtureHost {
                config: config.clone(),
                stuck: Cell::new(false),
                timestamps: Cell::new(CycleTimestamps::default()),
            },
            config,
            sources: SourceStates::default(),
            tracker: TransitionTracker::new(),
            counters: Counters::default(),
            last_status: None,
        }
    }

    pub fn stuck(&self) -> bool {
        self.host.stuck.get()
    }

    pub fn set_stuck(&mut self, stuck: bool, minute: i64) -> Vec<EventEnvelope> {
        self.host.stuck.set(stuck);
        self.settle(at(minute))
    }

    pub fn timestamps(&self) -> CycleTimestamps {
        self.host.timestamps.get()
    }

    /// Feeds raw source values at `minute` and evaluates until the stuck flag settles.
    pub fn feed(
        &mut self,
        power: Option<&str>,
        switch: Option<&str>,
        minute: i64,
    ) -> Vec<EventEnvelope> {
        self.sources
            .set(self.config.power_source.clone(), power.map(str::to_string));
        self.sources
            .set(self.config.switch_source.clone(), switch.map(str::to_string));
        self.settle(at(minute))
    }

    /// Shorthand for an available reading with the switch on.
    pub fn power(&mut self, watts: f64, minute: i64) -> Vec<EventEnvelope> {
        self.feed(Some(&watts.to_string()), Some("on"), minute)
    }

    fn settle(&mut self, now: DateTime<Utc>) -> Vec<EventEnvelope> {
        let mut events = Vec::new();
        // A stuck write re-triggers evaluation; two rounds always settle.
        for _ in 0..3 {
            let stuck_before = self.stuck();
            let snapshot = read_signals(&self.sources, &self.config);
            let evaluation = evaluate(
                &mut self.tracker,
                &snapshot,
                stuck_before,
                now,
                &mut self.counters,
            );
            events.extend(evaluation.events);
            events.extend(dispatch_effects(
                &self.host,
                &self.config,
                &evaluation.step.effects,
                now,
                &mut self.counters,
            ));
            self.last_status = Some(evaluation.status);
            if self.stuck() == stuck_before {
                break;
            }
        }
        events
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
