use chrono::{DateTime, Utc};
use mower_core::{
    dispatch_effects, evaluate, read_signals, read_stuck, Event, EventEnvelope, SourceStates,
};
use tokio::sync::mpsc;

use crate::registry::StateChange;
use crate::state::{AppState, MowerState};

/// Evaluates once at startup, then once per change on the feed.
///
/// `sources` is the view seeded at subscribe time. Each change is applied to
/// it before evaluating, so every queued reading is classified in turn even
/// when several arrive between polls. The feed is drained by this task alone,
/// so evaluations never overlap. Stuck writes made while dispatching land on
/// the same feed and re-trigger an evaluation.
pub async fn run_evaluation_loop(
    app: AppState,
    mut sources: SourceStates,
    mut changes: mpsc::UnboundedReceiver<StateChange>,
) {
    evaluate_once(&app, &sources, Utc::now());
    while let Some(change) = changes.recv().await {
        tracing::debug!(
            entity_id = %change.entity_id,
            old = ?change.old_value,
            new = ?change.new_value,
            "source changed"
        );
        sources.set(change.entity_id, change.new_value);
        evaluate_once(&app, &sources, Utc::now());
    }
    tracing::info!("change feed closed, evaluation loop stopping");
}

/// Runs one evaluation against `sources`, applies its effects, and publishes
/// the events.
pub fn evaluate_once(
    app: &AppState,
    sources: &SourceStates,
    at: DateTime<Utc>,
) -> Vec<EventEnvelope> {
    let snapshot = read_signals(sources, &app.config);
    let stuck = read_stuck(sources, &app.config);

    let events = {
        let mut guard = app.mower.lock();
        let MowerState {
            ref mut tracker,
            ref mut counters,
            ..
        } = *guard;
        let evaluation = evaluate(tracker, &snapshot, stuck, at, counters);
        let failures = dispatch_effects(
            app.services.as_ref(),
            &app.config,
            &evaluation.step.effects,
            at,
            counters,
        );

        let mut events = evaluation.events.clone();
        events.extend(failures);
        if events.is_empty() {
            tracing::debug!(transition = ?evaluation.step.transition, "no change");
        }
        guard.push_events(&events);
        guard.last_evaluation = Some(evaluation);
        events
    };

    for envelope in &events {
        log_event(envelope);
    }
    if !events.is_empty() {
        let _ = app.event_tx.send(events.clone());
    }
    events
}

fn log_event(envelope: &EventEnvelope) {
    let id = envelope.id.as_str();
    match &envelope.event {
        Event::ActivityChanged { from, to } => {
            tracing::info!(id, %from, %to, "activity changed");
        }
        Event::CycleRecorded { kind } => {
            tracing::info!(id, %kind, at = %envelope.at, "cycle recorded");
        }
        Event::StuckRaised => tracing::info!(id, "stuck raised"),
        Event::StuckReleased => tracing::info!(id, "stuck released"),
        Event::EvaluationSuspended { last_known, faults } => {
            tracing::warn!(
                id,
                ?last_known,
                ?faults,
                "signals unavailable, evaluation suspended"
            );
        }
        Event::EdgeIgnored { from, to } => {
            tracing::debug!(id, %from, %to, "edge has no side effects");
        }
        Event::DispatchFailed {
            domain,
            action,
            reason,
        } => {
            tracing::error!(id, domain, action, reason, "service call failed");
        }
    }
}
