pub mod analysis;
pub mod health;
pub mod media;
pub mod models;

pub use analysis::run_fba_handler;
pub use health::{health_handler, ready_handler};
pub use media::{create_media_handler, delete_media_handler, get_media_handler, list_media_handler};
pub use models::{
    build_model_handler, delete_model_handler, gapfill_model_handler, get_model_handler,
    list_models_handler, model_lineage_handler,
};

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Request body for tools that address a single record.
#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

/// Tool routes plus health probes. Metrics and tracing layers are added by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tools/create_media", post(create_media_handler))
        .route("/tools/get_media", post(get_media_handler))
        .route("/tools/list_media", post(list_media_handler))
        .route("/tools/delete_media", post(delete_media_handler))
        .route("/tools/build_model", post(build_model_handler))
        .route("/tools/gapfill_model", post(gapfill_model_handler))
        .route("/tools/get_model", post(get_model_handler))
        .route("/tools/list_models", post(list_models_handler))
        .route("/tools/delete_model", post(delete_model_handler))
        .route("/tools/model_lineage", post(model_lineage_handler))
        .route("/tools/run_fba", post(run_fba_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

fn record_call(tool: &'static str) {
    metrics::counter!("tool_calls_total", "tool" => tool).increment(1);
}

/// Wrap a tool's outcome, counting failures as rejections.
fn finish<T>(tool: &'static str, result: crate::Result<T>) -> crate::Result<Json<T>> {
    if let Err(err) = &result {
        record_rejection(tool, err);
    }
    result.map(Json)
}

fn record_rejection(tool: &'static str, err: &crate::AppError) {
    metrics::counter!(
        "tool_rejections_total",
        "tool" => tool,
        "kind" => format!("{:?}", err.kind())
    )
    .increment(1);
}

fn record_store_size(kind: crate::store::RecordKind, len: usize) {
    metrics::gauge!("stored_records", "kind" => kind.as_str()).set(len as f64);
}
