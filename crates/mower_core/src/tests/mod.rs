use super::*;
use crate::test_fixtures::{at, Harness};

mod dropout;
mod scenarios;

// --- Shared test helpers ------------------------------------------------

fn cycles(events: &[EventEnvelope]) -> Vec<CycleKind> {
    events
        .iter()
        .filter_map(|e| match e.event {
            Event::CycleRecorded { kind } => Some(kind),
            _ => None,
        })
        .collect()
}

fn count(events: &[EventEnvelope], wanted: &Event) -> usize {
    events.iter().filter(|e| &e.event == wanted).count()
}

/// Harness already settled on the dock.
fn docked_harness() -> Harness {
    let mut harness = Harness::new();
    harness.power(2.5, 0);
    harness
}
