//! Type definitions for `mower_core`.
//!
//! Activities, cycle kinds, durable timestamp slots, events and ID newtypes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SignalFault;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(SourceId);
string_id!(EventId);

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Docked,
    Mowing,
    Charging,
    Error,
}

impl Activity {
    pub fn as_str(self) -> &'static str {
        match self {
            Activity::Docked => "docked",
            Activity::Mowing => "mowing",
            Activity::Charging => "charging",
            Activity::Error => "error",
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cycle timestamps
// ---------------------------------------------------------------------------

/// One of the four cycle-boundary markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    MowingStart,
    MowingStop,
    ChargingStart,
    ChargingStop,
}

impl CycleKind {
    pub const ALL: [CycleKind; 4] = [
        CycleKind::MowingStart,
        CycleKind::MowingStop,
        CycleKind::ChargingStart,
        CycleKind::ChargingStop,
    ];

    /// Stable suffix shared by entity ids and durable keys.
    pub fn key_suffix(self) -> &'static str {
        match self {
            CycleKind::MowingStart => "start_mowing_cycle",
            CycleKind::MowingStop => "end_mowing_cycle",
            CycleKind::ChargingStart => "start_charging_cycle",
            CycleKind::ChargingStop => "end_charging_cycle",
        }
    }

    pub fn from_key_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key_suffix() == suffix)
    }

    /// Accepts either the serde name (`mowing_start`) or the key suffix.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw || kind.key_suffix() == raw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CycleKind::MowingStart => "mowing_start",
            CycleKind::MowingStop => "mowing_stop",
            CycleKind::ChargingStart => "charging_start",
            CycleKind::ChargingStop => "charging_stop",
        }
    }
}

impl std::fmt::Display for CycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four most recent cycle boundaries. `None` until first recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTimestamps {
    pub mowing_start: Option<DateTime<Utc>>,
    pub mowing_stop: Option<DateTime<Utc>>,
    pub charging_start: Option<DateTime<Utc>>,
    pub charging_stop: Option<DateTime<Utc>>,
}

impl CycleTimestamps {
    pub fn get(&self, kind: CycleKind) -> Option<DateTime<Utc>> {
        match kind {
            CycleKind::MowingStart => self.mowing_start,
            CycleKind::MowingStop => self.mowing_stop,
            CycleKind::ChargingStart => self.charging_start,
            CycleKind::ChargingStop => self.charging_stop,
        }
    }

    /// Overwrites the slot. No history is kept.
    pub fn set(&mut self, kind: CycleKind, at: Option<DateTime<Utc>>) {
        let slot = match kind {
            CycleKind::MowingStart => &mut self.mowing_start,
            CycleKind::MowingStop => &mut self.mowing_stop,
            CycleKind::ChargingStart => &mut self.charging_start,
            CycleKind::ChargingStop => &mut self.charging_stop,
        };
        *slot = at;
    }
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub at: DateTime<Utc>,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ActivityChanged {
        from: Activity,
        to: Activity,
    },
    /// The cycle slot was written with the envelope's `at`.
    CycleRecorded {
        kind: CycleKind,
    },
    StuckRaised,
    StuckReleased,
    EvaluationSuspended {
        last_known: Option<Activity>,
        faults: Vec<SignalFault>,
    },
    /// An edge with no row in the transition table. Stuck writes may still follow.
    EdgeIgnored {
        from: Activity,
        to: Activity,
    },
    DispatchFailed {
        domain: String,
        action: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
}
