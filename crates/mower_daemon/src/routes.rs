use std::convert::Infallible;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use mower_core::{
    effect_call, pause_call, read_signals, CommandDispatch, CycleKind, Effect, EventEnvelope,
    MowerStatus, ServiceCall, ServicePayload, SourceId, ACTIVITY_OPTIONS,
};
use serde::Deserialize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::DispatchError;
use crate::state::AppState;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    api_routes().with_state(state)
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<axum::http::HeaderValue>()
        .with_context(|| format!("invalid cors origin {cors_origin:?}"))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    Ok(api_routes()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/status", get(status_handler))
        .route("/api/v1/timestamps", get(timestamps_handler))
        .route("/api/v1/timestamps/:kind", post(set_timestamp_handler))
        .route("/api/v1/sources", get(sources_handler))
        .route("/api/v1/sources/:entity_id", put(put_source_handler))
        .route("/api/v1/stuck", post(stuck_handler))
        .route("/api/v1/pause", post(pause_handler))
        .route("/api/v1/services/:domain/:action", post(service_handler))
        .route("/api/v1/events", get(events_handler))
        .route("/api/v1/stream", get(stream_handler))
}

/// Current status, recomputed from the live sources rather than cached.
pub async fn status_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let tracker = app_state.mower.lock().tracker.state();
    let (stuck, timestamps) = {
        let stores = app_state.stores.lock();
        (stores.stuck.get(), stores.timestamps.all())
    };
    let snapshot = read_signals(app_state.registry.as_ref(), &app_state.config);
    let status = MowerStatus::derive(&snapshot, stuck);
    Json(serde_json::json!({
        "name": app_state.config.name,
        "status": status,
        "tracker": tracker,
        "faults": snapshot.faults,
        "timestamps": timestamps,
        "activity_options": ACTIVITY_OPTIONS,
    }))
}

pub async fn timestamps_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let timestamps = app_state.stores.lock().timestamps.all();
    Json(serde_json::json!(timestamps))
}

pub async fn sources_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(app_state.registry.states()))
}

#[derive(Deserialize)]
pub struct SourceUpdate {
    pub state: Option<String>,
}

/// Feeds a raw source value. `null` makes the source unavailable.
pub async fn put_source_handler(
    State(app_state): State<AppState>,
    Path(entity_id): Path<String>,
    Json(update): Json<SourceUpdate>,
) -> (StatusCode, Json<serde_json::Value>) {
    let entity_id = SourceId(entity_id);
    let config = &app_state.config;
    if entity_id == config.stuck_source() || config.kind_for_entity(&entity_id).is_some() {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": format!("{entity_id} is managed by the mower; use its service instead"),
            })),
        );
    }
    let changed = app_state
        .registry
        .set_state(entity_id.clone(), update.state)
        .is_some();
    (
        StatusCode::OK,
        Json(serde_json::json!({"entity_id": entity_id, "changed": changed})),
    )
}

#[derive(Deserialize)]
pub struct StuckRequest {
    pub stuck: bool,
}

pub async fn stuck_handler(
    State(app_state): State<AppState>,
    Json(request): Json<StuckRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let call = effect_call(Effect::SetStuck(request.stuck), Utc::now(), &app_state.config);
    dispatch(&app_state, call)
}

#[derive(Deserialize)]
pub struct TimestampRequest {
    pub datetime: DateTime<Utc>,
}

pub async fn set_timestamp_handler(
    State(app_state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<TimestampRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(kind) = CycleKind::parse(&kind) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("unknown cycle kind {kind:?}")})),
        );
    };
    let call = effect_call(Effect::RecordCycle(kind), request.datetime, &app_state.config);
    dispatch(&app_state, call)
}

pub async fn pause_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let call = pause_call(&app_state.config);
    dispatch(&app_state, call)
}

pub async fn service_handler(
    State(app_state): State<AppState>,
    Path((domain, action)): Path<(String, String)>,
    Json(payload): Json<ServicePayload>,
) -> (StatusCode, Json<serde_json::Value>) {
    dispatch(
        &app_state,
        ServiceCall {
            domain,
            action,
            payload,
        },
    )
}

fn dispatch(app_state: &AppState, call: ServiceCall) -> (StatusCode, Json<serde_json::Value>) {
    let entity_id = call.payload.entity_id().clone();
    match app_state
        .services
        .call(&call.domain, &call.action, call.payload)
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "domain": call.domain,
                "action": call.action,
                "entity_id": entity_id,
            })),
        ),
        Err(err) => {
            let status = match &err {
                DispatchError::UnknownService { .. } => StatusCode::NOT_FOUND,
                DispatchError::UnknownEntity { .. } | DispatchError::BadPayload { .. } => {
                    StatusCode::BAD_REQUEST
                }
                DispatchError::Store(_) => {
                    tracing::error!("{}.{} failed to persist: {err}", call.domain, call.action);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, Json(serde_json::json!({"error": err.to_string()})))
        }
    }
}

pub async fn events_handler(State(app_state): State<AppState>) -> Json<Vec<EventEnvelope>> {
    let mower = app_state.mower.lock();
    Json(mower.recent_events.iter().cloned().collect())
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let mower = app_state.mower.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(5));
        heartbeat.tick().await; // discard the immediate first tick
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => {
                            let data = serde_json::to_string(&events).unwrap_or_default();
                            yield Ok(Event::default().data(data));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event stream subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    let tracker = mower.lock().tracker.state();
                    let hb = serde_json::json!({"heartbeat": true, "tracker": tracker});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
