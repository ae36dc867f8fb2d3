//! Axum router and HTTP handlers for msync-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! the trace layer. Tests drive the bare router with `oneshot`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use msync_schemas::{sample_match, EventEnvelope};
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::{
    api_types::{ErrorResponse, EventAcceptedResponse, HealthResponse, WebhookResponse},
    state::AppState,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/internal/health", get(health))
        .route("/api/internal/metrics", get(metrics))
        .route("/api/internal/events", post(enqueue_event))
        .route("/api/v1/webhook/:id", post(webhook))
        .route("/api/v1/test_template", post(test_template))
        .with_state(state)
}

fn bad_request(error: impl ToString) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error))).into_response()
}

// ---------------------------------------------------------------------------
// GET /api/internal/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /api/internal/metrics
// ---------------------------------------------------------------------------

pub(crate) async fn metrics(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let body = st.metrics.as_ref().map(|h| h.render()).unwrap_or_default();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

// ---------------------------------------------------------------------------
// POST /api/internal/events
// ---------------------------------------------------------------------------

/// Hand one envelope to the channel event source. Returns once queued, not
/// once processed.
pub(crate) async fn enqueue_event(State(st): State<Arc<AppState>>, body: Bytes) -> Response {
    let env: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(env) => env,
        Err(e) => {
            warn!(error = %e, "rejected event envelope");
            return bad_request(format!("invalid event envelope: {e}"));
        }
    };
    let kind = env.notification().as_label().to_string();

    match st.events.try_send(env) {
        Ok(()) => {
            debug!(kind = %kind, "event queued");
            (
                StatusCode::ACCEPTED,
                Json(EventAcceptedResponse {
                    accepted: true,
                    kind,
                }),
            )
                .into_response()
        }
        Err(TrySendError::Full(_)) => {
            warn!("event queue full, rejecting");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("event queue full")),
            )
                .into_response()
        }
        Err(TrySendError::Closed(_)) => {
            error!("event loop is gone, rejecting");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("event loop stopped")),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/v1/webhook/:id
// ---------------------------------------------------------------------------

pub(crate) async fn webhook(Path(id): Path<String>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            error!(webhook_id = %id, error = %e, "error decoding webhook payload");
            return bad_request(e);
        }
    };
    info!(webhook_id = %id, payload = %payload, "received webhook payload");
    (
        StatusCode::OK,
        Json(WebhookResponse {
            status: "ok".to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /api/v1/test_template
// ---------------------------------------------------------------------------

/// Render the fixed sample match through the posted template text and return
/// the body a create-match call would send.
pub(crate) async fn test_template(body: Bytes) -> Response {
    let text = match std::str::from_utf8(&body) {
        Ok(t) => t,
        Err(e) => return bad_request(format!("template is not utf-8: {e}")),
    };

    let rendered = match msync_tmt2::render(text, &sample_match()) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "error parsing template");
            return bad_request(e);
        }
    };
    debug!(rendered = %rendered, "parsed template");

    match serde_json::from_str::<Value>(&rendered) {
        Ok(v) => (StatusCode::OK, Json(v)).into_response(),
        Err(e) => bad_request(e),
    }
}
