//! Transition tracker, the edge-detecting state machine.
//!
//! Holds only the previous activity and its power band. Every call to
//! [`TransitionTracker::observe`] compares a fresh classification against them
//! and returns the side effects the edge calls for; applying them is the
//! caller's job.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{classify, power_band, Activity, CycleKind, SignalSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    RecordCycle(CycleKind),
    SetStuck(bool),
}

pub type Effects = SmallVec<[Effect; 4]>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackerState {
    /// Nothing classified yet.
    #[default]
    Unknown,
    /// Last reading was unavailable. Keeps the last classified activity for diagnostics.
    Suspended { last_known: Option<Activity> },
    /// `band` is the power band of the same reading, ignoring the stuck flag.
    Known { activity: Activity, band: Activity },
}

impl TrackerState {
    pub fn last_known(self) -> Option<Activity> {
        match self {
            TrackerState::Unknown => None,
            TrackerState::Suspended { last_known } => last_known,
            TrackerState::Known { activity, .. } => Some(activity),
        }
    }

    /// Power band of the previous reading. `None` unless the previous reading
    /// was classified.
    pub fn band(self) -> Option<Activity> {
        match self {
            TrackerState::Known { band, .. } => Some(band),
            TrackerState::Unknown | TrackerState::Suspended { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Signals unavailable; nothing evaluated.
    Suspended { last_known: Option<Activity> },
    /// First classified reading after `Unknown` or `Suspended`. Never an edge.
    Resumed { activity: Activity },
    Steady { activity: Activity },
    /// `handled` is false when the table has no row for this edge.
    Edge {
        from: Activity,
        to: Activity,
        handled: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub activity: Option<Activity>,
    pub transition: Transition,
    pub effects: Effects,
}

/// Side effects for an edge. Empty for edges with no row.
pub fn edge_effects(from: Activity, to: Activity) -> Effects {
    use Activity::{Charging, Docked, Error, Mowing};

    let mut effects = Effects::new();
    if from == to {
        return effects;
    }
    if from == Charging {
        effects.push(Effect::RecordCycle(CycleKind::ChargingStop));
    }
    match (from, to) {
        (Docked | Charging, Mowing) => {
            effects.push(Effect::RecordCycle(CycleKind::MowingStart));
        }
        (Docked, Charging) => {
            effects.push(Effect::RecordCycle(CycleKind::ChargingStart));
        }
        (Mowing | Error, Docked) => {
            effects.push(Effect::RecordCycle(CycleKind::MowingStop));
            effects.push(Effect::SetStuck(false));
        }
        (Mowing | Error, Charging) => {
            effects.push(Effect::RecordCycle(CycleKind::MowingStop));
            effects.push(Effect::SetStuck(false));
            effects.push(Effect::RecordCycle(CycleKind::ChargingStart));
        }
        _ => {}
    }
    effects
}

/// One tracker per mower. Not shared; the owner serializes calls.
#[derive(Debug, Clone, Default)]
pub struct TransitionTracker {
    state: TrackerState,
}

impl TransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Classifies `snapshot` under `stuck` and advances the previous activity.
    ///
    /// Unavailable snapshots suspend the tracker without effects. Beyond the
    /// edge table, a `Mowing -> Error` edge raises the stuck flag, and a set
    /// stuck flag is released when the power band alone moves from mowing or
    /// error to docked or charging. Stuck writes that would not change the
    /// flag are dropped.
    pub fn observe(&mut self, snapshot: &SignalSnapshot, stuck: bool) -> Step {
        let Some(power) = snapshot.classifiable_power() else {
            let last_known = self.state.last_known();
            self.state = TrackerState::Suspended { last_known };
            return Step {
                activity: None,
                transition: Transition::Suspended { last_known },
                effects: Effects::new(),
            };
        };

        let band = power_band(power);
        let activity = classify(power, stuck);
        let mut effects = Effects::new();
        let transition = match self.state {
            TrackerState::Known {
                activity: previous, ..
            } if previous == activity => Transition::Steady { activity },
            TrackerState::Known {
                activity: previous, ..
            } => {
                effects = edge_effects(previous, activity);
                let handled = !effects.is_empty();
                if previous == Activity::Mowing && activity == Activity::Error {
                    effects.push(Effect::SetStuck(true));
                }
                Transition::Edge {
                    from: previous,
                    to: activity,
                    handled,
                }
            }
            TrackerState::Unknown | TrackerState::Suspended { .. } => {
                Transition::Resumed { activity }
            }
        };

        if stuck && returned_to_base(self.state.band(), band) {
            effects.push(Effect::SetStuck(false));
        }
        effects.retain(|effect| !matches!(effect, Effect::SetStuck(value) if *value == stuck));

        self.state = TrackerState::Known { activity, band };
        Step {
            activity: Some(activity),
            transition,
            effects,
        }
    }
}

/// Power band moved from out on the lawn to the dock or charger.
fn returned_to_base(previous: Option<Activity>, current: Activity) -> bool {
    matches!(previous, Some(Activity::Mowing | Activity::Error))
        && matches!(current, Activity::Docked | Activity::Charging)
}
