use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compound_db_sha256: Option<String>,
    pub stored_media: usize,
    pub stored_models: usize,
}

/// GET /health - Liveness probe
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /ready - Readiness probe (registry initialized)
pub async fn ready_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadyResponse>) {
    match state.registry.store() {
        Ok(store) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ready",
                version: env!("CARGO_PKG_VERSION"),
                compound_db_sha256: state.registry.compound_fingerprint().map(str::to_string),
                stored_media: store.media().len(),
                stored_models: store.models().len(),
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                status: "not_ready",
                version: env!("CARGO_PKG_VERSION"),
                compound_db_sha256: None,
                stored_media: 0,
                stored_models: 0,
            }),
        ),
    }
}
