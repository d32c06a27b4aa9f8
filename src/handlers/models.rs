use super::{finish, record_call, record_store_size, IdRequest};
use crate::error::{AppError, Result};
use crate::external::{BuildRequest, GapfillRequest};
use crate::identifiers::{IdentifierFactory, LineageState, LineageTag};
use crate::lineage;
use crate::state::AppState;
use crate::store::{ModelRecord, ModelSummary, NewRecord, RecordKind};
use crate::validation::{validate_analysis, validate_build, AnalysisInput, BuildModelInput};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ModelView {
    pub model_id: String,
    pub model_name: Option<String>,
    pub lineage_state: LineageState,
    pub derived_from: Option<String>,
    pub created_at: u64,
    #[serde(flatten)]
    pub summary: ModelSummary,
}

impl From<&ModelRecord> for ModelView {
    fn from(record: &ModelRecord) -> Self {
        Self {
            model_id: record.id().to_string(),
            model_name: record.meta().display_name.clone(),
            lineage_state: record.lineage(),
            derived_from: record.meta().derived_from.clone(),
            created_at: record.meta().created_at.unix_ms,
            summary: record.body().clone(),
        }
    }
}

/// POST /tools/build_model - Reconstruct a draft model from a genome.
///
/// # Flow
/// 1. Validate genome source, template and name
/// 2. Run the reconstruction backend (no locks held)
/// 3. Store under `model_<time>_<rand>.draft`
pub async fn build_model_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BuildModelInput>,
) -> Result<Json<ModelView>> {
    const TOOL: &str = "build_model";
    record_call(TOOL);

    finish(TOOL, build_model(&state, request).await)
}

async fn build_model(state: &AppState, request: BuildModelInput) -> Result<ModelView> {
    let plan = validate_build(&request, state.registry.templates()?.as_ref())?;
    let template_name = plan.template.name.clone();
    tracing::info!(
        template = %template_name,
        genome = %plan.genome.describe(),
        "Building model"
    );

    let build = BuildRequest {
        genome: plan.genome,
        template: plan.template,
    };
    let mut summary = state
        .run_compute("reconstruction", move |backend| backend.build_model(&build))
        .await?;
    summary.template = template_name;

    let store = state.registry.store()?;
    let id = IdentifierFactory::derive_suffixed(&store.mint(RecordKind::Model), LineageTag::Draft);
    let record = store
        .models()
        .insert(NewRecord::origin(id, summary).named(plan.display_name))?;
    record_store_size(RecordKind::Model, store.models().len());

    tracing::info!(
        model_id = %record.id(),
        reactions = record.body().reaction_count,
        "Model built"
    );

    Ok(ModelView::from(record.as_ref()))
}

#[derive(Debug, Serialize)]
pub struct GapfillResponse {
    #[serde(flatten)]
    pub model: ModelView,
    pub media_id: String,
    pub reactions_added: Vec<String>,
}

/// POST /tools/gapfill_model - Gapfill a stored model on a stored medium.
///
/// The result is stored as `<model_id>.gf` with `derived_from = model_id`.
pub async fn gapfill_model_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisInput>,
) -> Result<Json<GapfillResponse>> {
    const TOOL: &str = "gapfill_model";
    record_call(TOOL);

    finish(TOOL, gapfill_model(&state, request).await)
}

async fn gapfill_model(state: &AppState, request: AnalysisInput) -> Result<GapfillResponse> {
    let store = state.registry.store()?;
    validate_analysis("gapfill_model", &request, store)?;

    let target_id = IdentifierFactory::derive_suffixed(&request.model_id, LineageTag::Gapfilled);
    if store.models().is_taken(&target_id) {
        return Err(AppError::Conflict {
            kind: RecordKind::Model.as_str(),
            id: target_id,
        });
    }

    let model = store.models().get(&request.model_id)?;
    let media = store.media().get(&request.media_id)?;
    let template = model.body().template.clone();

    let job = GapfillRequest { model, media };
    let outcome = state
        .run_compute("gapfilling", move |backend| backend.gapfill(&job))
        .await?;

    let mut summary = outcome.summary;
    summary.template = template;
    let record = store.models().insert(NewRecord::derived(
        target_id,
        request.model_id.clone(),
        summary,
    ))?;
    record_store_size(RecordKind::Model, store.models().len());

    tracing::info!(
        model_id = %record.id(),
        parent = %request.model_id,
        media_id = %request.media_id,
        reactions_added = outcome.reactions_added.len(),
        "Model gapfilled"
    );

    Ok(GapfillResponse {
        model: ModelView::from(record.as_ref()),
        media_id: request.media_id,
        reactions_added: outcome.reactions_added,
    })
}

/// POST /tools/get_model
pub async fn get_model_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IdRequest>,
) -> Result<Json<ModelView>> {
    const TOOL: &str = "get_model";
    record_call(TOOL);
    let result = state
        .registry
        .store()
        .and_then(|store| store.models().get(&request.id));
    finish(TOOL, result.map(|record| ModelView::from(record.as_ref())))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListModelsRequest {
    #[serde(default)]
    pub lineage_state: Option<LineageState>,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListModelsResponse {
    pub total: usize,
    pub models: Vec<ModelView>,
}

/// POST /tools/list_models - Stored models, oldest first.
pub async fn list_models_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ListModelsRequest>,
) -> Result<Json<ListModelsResponse>> {
    const TOOL: &str = "list_models";
    record_call(TOOL);
    finish(TOOL, list_models(&state, &request))
}

fn list_models(state: &AppState, request: &ListModelsRequest) -> Result<ListModelsResponse> {
    let records = state.registry.store()?.models().list(|r| {
        request.lineage_state.map_or(true, |s| r.lineage() == s)
            && request
                .template
                .as_deref()
                .map_or(true, |t| r.body().template == t)
    });

    let models: Vec<ModelView> = records.iter().map(|r| ModelView::from(r.as_ref())).collect();
    Ok(ListModelsResponse {
        total: models.len(),
        models,
    })
}

#[derive(Debug, Serialize)]
pub struct DeleteModelResponse {
    pub deleted: String,
    pub remaining: usize,
    /// Models derived from the deleted one; their lineage is now broken.
    pub orphaned: Vec<String>,
}

/// POST /tools/delete_model - Remove one model. Derived models are kept.
pub async fn delete_model_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IdRequest>,
) -> Result<Json<DeleteModelResponse>> {
    const TOOL: &str = "delete_model";
    record_call(TOOL);
    finish(TOOL, delete_model(&state, &request))
}

fn delete_model(state: &AppState, request: &IdRequest) -> Result<DeleteModelResponse> {
    let store = state.registry.store()?;
    let removed = store.models().delete(&request.id)?;
    let orphaned: Vec<String> = lineage::dependents(store.models(), removed.id())
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    let remaining = store.models().len();
    record_store_size(RecordKind::Model, remaining);

    if !orphaned.is_empty() {
        tracing::warn!(
            model_id = %removed.id(),
            orphaned = orphaned.len(),
            "Deleted model still has derived models"
        );
    }

    Ok(DeleteModelResponse {
        deleted: removed.id().to_string(),
        remaining,
        orphaned,
    })
}

#[derive(Debug, Deserialize)]
pub struct LineageRequest {
    pub model_id: String,
}

#[derive(Debug, Serialize)]
pub struct LineageResponse {
    pub model_id: String,
    pub lineage_state: LineageState,
    pub chain: Vec<ModelView>,
}

/// POST /tools/model_lineage - Derivation chain from origin to `model_id`.
pub async fn model_lineage_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LineageRequest>,
) -> Result<Json<LineageResponse>> {
    const TOOL: &str = "model_lineage";
    record_call(TOOL);
    finish(TOOL, model_lineage(&state, request))
}

fn model_lineage(state: &AppState, request: LineageRequest) -> Result<LineageResponse> {
    let chain = lineage::chain(state.registry.store()?.models(), &request.model_id)?;

    Ok(LineageResponse {
        lineage_state: lineage::classify(&request.model_id),
        model_id: request.model_id,
        chain: chain.iter().map(|r| ModelView::from(r.as_ref())).collect(),
    })
}
