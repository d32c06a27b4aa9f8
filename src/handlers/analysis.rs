use super::{finish, record_call};
use crate::error::Result;
use crate::external::{FbaOutcome, FbaRequest};
use crate::identifiers::LineageState;
use crate::state::AppState;
use crate::validation::{validate_analysis, AnalysisInput};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Objective values at or below this are treated as no growth.
const GROWTH_EPSILON: f64 = 1e-6;

#[derive(Debug, Serialize)]
pub struct FbaResponse {
    pub model_id: String,
    pub media_id: String,
    pub lineage_state: LineageState,
    pub objective: Option<String>,
    #[serde(flatten)]
    pub outcome: FbaOutcome,
    pub grows: bool,
}

/// POST /tools/run_fba - Flux balance analysis of a stored model on a stored medium.
///
/// Nothing is written to the store.
pub async fn run_fba_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisInput>,
) -> Result<Json<FbaResponse>> {
    const TOOL: &str = "run_fba";
    record_call(TOOL);

    finish(TOOL, run_fba(&state, request).await)
}

async fn run_fba(state: &AppState, request: AnalysisInput) -> Result<FbaResponse> {
    let store = state.registry.store()?;
    validate_analysis("run_fba", &request, store)?;

    let model = store.models().get(&request.model_id)?;
    let media = store.media().get(&request.media_id)?;
    let lineage_state = model.lineage();

    let job = FbaRequest {
        model,
        media,
        objective: request.objective.clone(),
    };
    let outcome = state
        .run_compute("flux balance analysis", move |backend| backend.run_fba(&job))
        .await?;

    let grows = outcome.objective_value > GROWTH_EPSILON;
    tracing::info!(
        model_id = %request.model_id,
        media_id = %request.media_id,
        objective_value = outcome.objective_value,
        status = %outcome.status,
        "FBA completed"
    );

    Ok(FbaResponse {
        model_id: request.model_id,
        media_id: request.media_id,
        lineage_state,
        objective: request.objective,
        outcome,
        grows,
    })
}
