//! `mower_core`: deterministic mower activity inference.
//!
//! No IO, no clock. Callers pass in source lookups, the stuck flag and the
//! evaluation time; everything returned is a plain value.

mod classify;
mod commands;
mod config;
mod engine;
mod signal;
mod status;
mod tracker;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use classify::{
    classify, is_charging, power_band, CHARGING_FLOOR_WATTS, DOCKED_FLOOR_WATTS,
    ERROR_CEILING_WATTS,
};
pub use commands::{
    dispatch_effects, effect_call, pause_call, CommandDispatch, ServiceCall, ServicePayload,
    ACTION_SET_VALUE, ACTION_TURN_OFF, ACTION_TURN_ON, DOMAIN_DATETIME, DOMAIN_HOMEASSISTANT,
    DOMAIN_SWITCH,
};
pub use config::{ConfigError, MowerConfig, DEFAULT_MOWER_NAME};
pub use engine::{evaluate, Evaluation};
pub use signal::{
    parse_power, parse_switch, read_power, read_signals, read_stuck, read_switch, Signal,
    SignalFault, SignalSnapshot, SourceLookup, SourceStates, UNPARSEABLE_POWER_WATTS,
};
pub use status::{MowerStatus, ACTIVITY_OPTIONS};
pub use tracker::{edge_effects, Effect, Effects, Step, Transition, TrackerState, TransitionTracker};
pub use types::*;

pub fn emit(
    counters: &mut Counters,
    at: chrono::DateTime<chrono::Utc>,
    event: Event,
) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, at, event }
}

#[cfg(test)]
mod tests;
