use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    emit, Counters, Effect, Event, EventEnvelope, MowerStatus, SignalSnapshot, Step, Transition,
    TransitionTracker,
};

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub at: DateTime<Utc>,
    pub status: MowerStatus,
    pub step: Step,
    pub events: Vec<EventEnvelope>,
}

/// Run one evaluation of the pipeline.
///
/// Order of operations:
/// 1. Derive the display status from the snapshot and stuck flag.
/// 2. Let the tracker classify and compare against the previous activity.
/// 3. Describe the outcome as events; effects are returned, not applied.
pub fn evaluate(
    tracker: &mut TransitionTracker,
    snapshot: &SignalSnapshot,
    stuck: bool,
    at: DateTime<Utc>,
    counters: &mut Counters,
) -> Evaluation {
    let status = MowerStatus::derive(snapshot, stuck);
    let step = tracker.observe(snapshot, stuck);

    let mut events = Vec::new();
    match step.transition {
        Transition::Suspended { last_known } => {
            events.push(emit(
                counters,
                at,
                Event::EvaluationSuspended {
                    last_known,
                    faults: snapshot.faults.to_vec(),
                },
            ));
        }
        Transition::Edge { from, to, handled } => {
            events.push(emit(counters, at, Event::ActivityChanged { from, to }));
            if !handled {
                events.push(emit(counters, at, Event::EdgeIgnored { from, to }));
            }
        }
        Transition::Resumed { .. } | Transition::Steady { .. } => {}
    }

    for effect in &step.effects {
        let event = match *effect {
            Effect::RecordCycle(kind) => Event::CycleRecorded { kind },
            Effect::SetStuck(true) => Event::StuckRaised,
            Effect::SetStuck(false) => Event::StuckReleased,
        };
        events.push(emit(counters, at, event));
    }

    Evaluation {
        at,
        status,
        step,
        events,
    }
}
