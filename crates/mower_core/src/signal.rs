//! Signal reader: raw source values into typed, availability-flagged readings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{MowerConfig, SourceId};

/// Power value substituted for a reading that is present but not a finite number.
/// Out of range on purpose so the classifier reports an error instead of failing.
pub const UNPARSEABLE_POWER_WATTS: f64 = -1.0;

/// Host-side state lookup. `None` means the source could not be resolved.
pub trait SourceLookup {
    fn get_value(&self, id: &SourceId) -> Option<String>;
}

/// Plain map of source states. Used for replays and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceStates(pub HashMap<SourceId, String>);

impl SourceStates {
    /// Sets or clears a source. Returns the previous value.
    pub fn set(&mut self, id: SourceId, value: Option<String>) -> Option<String> {
        match value {
            Some(value) => self.0.insert(id, value),
            None => self.0.remove(&id),
        }
    }
}

impl SourceLookup for SourceStates {
    fn get_value(&self, id: &SourceId) -> Option<String> {
        self.0.get(id).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal<T> {
    Unavailable,
    Available(T),
}

impl<T: Copy> Signal<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Signal::Available(value) => Some(value),
            Signal::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Signal::Available(_))
    }
}

/// Why a reading is degraded. Diagnostic only; never fails a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum SignalFault {
    SourceUnavailable { source: SourceId },
    UnparseableValue { source: SourceId, raw: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub power_watts: Signal<f64>,
    pub switch_on: Signal<bool>,
    pub faults: SmallVec<[SignalFault; 2]>,
}

impl SignalSnapshot {
    pub fn new(power_watts: Signal<f64>, switch_on: Signal<bool>) -> Self {
        Self {
            power_watts,
            switch_on,
            faults: SmallVec::new(),
        }
    }

    /// Both sources resolved and the active switch is on.
    pub fn is_available(&self) -> bool {
        self.power_watts.is_available() && self.switch_on == Signal::Available(true)
    }

    /// Power value to classify, or `None` when classification must be suspended.
    pub fn classifiable_power(&self) -> Option<f64> {
        if self.is_available() {
            self.power_watts.value()
        } else {
            None
        }
    }
}

/// Parses a power reading. Non-numeric and non-finite values map to
/// [`UNPARSEABLE_POWER_WATTS`]; the flag is `false` in that case.
pub fn parse_power(raw: &str) -> (f64, bool) {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => (value, true),
        _ => (UNPARSEABLE_POWER_WATTS, false),
    }
}

pub fn parse_switch(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("on")
}

pub fn read_power(
    lookup: &impl SourceLookup,
    id: &SourceId,
) -> (Signal<f64>, Option<SignalFault>) {
    let Some(raw) = lookup.get_value(id) else {
        return (
            Signal::Unavailable,
            Some(SignalFault::SourceUnavailable { source: id.clone() }),
        );
    };
    let (watts, parsed) = parse_power(&raw);
    let fault = (!parsed).then(|| SignalFault::UnparseableValue {
        source: id.clone(),
        raw,
    });
    (Signal::Available(watts), fault)
}

pub fn read_switch(
    lookup: &impl SourceLookup,
    id: &SourceId,
) -> (Signal<bool>, Option<SignalFault>) {
    match lookup.get_value(id) {
        Some(raw) => (Signal::Available(parse_switch(&raw)), None),
        None => (
            Signal::Unavailable,
            Some(SignalFault::SourceUnavailable { source: id.clone() }),
        ),
    }
}

/// Reads both configured sources into a fresh snapshot.
pub fn read_signals(lookup: &impl SourceLookup, config: &MowerConfig) -> SignalSnapshot {
    let (power_watts, power_fault) = read_power(lookup, &config.power_source);
    let (switch_on, switch_fault) = read_switch(lookup, &config.switch_source);
    let mut snapshot = SignalSnapshot::new(power_watts, switch_on);
    snapshot.faults.extend(power_fault);
    snapshot.faults.extend(switch_fault);
    snapshot
}

/// The stuck flag as published on its switch entity. Missing reads as off.
pub fn read_stuck(lookup: &impl SourceLookup, config: &MowerConfig) -> bool {
    lookup
        .get_value(&config.stuck_source())
        .is_some_and(|raw| parse_switch(&raw))
}
