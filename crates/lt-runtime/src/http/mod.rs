//! HTTP surface of the service.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/` | GET | Welcome message |
//! | `/health` | GET | Liveness and viewer count |
//! | `/metrics` | GET | Prometheus metrics |
//! | `/logs` | POST | Publish one log event to the in-process bus (absent when consuming from Kafka) |
//! | `/ws` | GET | WebSocket live tail |

pub mod cors;
pub mod ws;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use lt_01_ingestion::InMemoryLogBus;
use lt_02_live_hub::{ConnectionPump, HubHandle};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::CorsConfig;

pub use cors::create_cors_layer;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub pump: ConnectionPump,
    /// In-process bus fed by `POST /logs`; `None` when another source feeds the pipeline
    pub bus: Option<Arc<InMemoryLogBus>>,
    pub topic: Arc<str>,
}

/// Build the service router.
pub fn build_router(state: AppState, cors: &CorsConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_upgrade));
    if state.bus.is_some() {
        router = router.route("/logs", post(ingest));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors)),
        )
        .with_state(state)
}

async fn welcome() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to log service!",
    }))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "clients": state.hub.connection_count(),
    }))
}

async fn metrics() -> impl IntoResponse {
    match lt_telemetry::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Publish the raw request body as one event.
async fn ingest(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let Some(bus) = &state.bus else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "ingest route disabled" })),
        );
    };
    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "empty log event" })),
        );
    }

    let consumers = bus.publish(&state.topic, body);
    (
        StatusCode::ACCEPTED,
        Json(json!({ "accepted": true, "consumers": consumers })),
    )
}
