use super::{finish, record_call, record_store_size, IdRequest};
use crate::classify::{self, MediaType};
use crate::error::{AppError, Result};
use crate::external::CompoundLookup;
use crate::state::AppState;
use crate::store::{Media, MediaEntry, MediaRecord, NewRecord, RecordKind};
use crate::validation::{validate_media, MediaInput};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct CompoundView {
    pub id: String,
    pub name: String,
    pub formula: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl CompoundView {
    fn new(entry: &MediaEntry, lookup: &dyn CompoundLookup) -> Self {
        let info = lookup.describe(&entry.compound_id).unwrap_or_default();
        Self {
            id: entry.compound_id.clone(),
            name: info.name,
            formula: info.formula,
            lower_bound: entry.lower,
            upper_bound: entry.upper,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MediaSummary {
    pub media_id: String,
    pub media_name: Option<String>,
    pub num_compounds: usize,
    pub media_type: MediaType,
    pub compounds_preview: Vec<CompoundView>,
    pub created_at: u64,
}

impl MediaSummary {
    fn new(record: &MediaRecord, lookup: &dyn CompoundLookup) -> Self {
        let media = record.body();
        Self {
            media_id: record.id().to_string(),
            media_name: record.meta().display_name.clone(),
            num_compounds: media.len(),
            media_type: MediaType::of(media),
            compounds_preview: classify::preview(media)
                .iter()
                .map(|entry| CompoundView::new(entry, lookup))
                .collect(),
            created_at: record.meta().created_at.unix_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MediaDetail {
    #[serde(flatten)]
    pub summary: MediaSummary,
    pub compounds: Vec<CompoundView>,
}

/// POST /tools/create_media - Define a growth medium.
///
/// # Flow
/// 1. Run every media rule against the input
/// 2. Resolve default and custom bounds
/// 3. Mint a `media_*` id and insert
pub async fn create_media_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MediaInput>,
) -> Result<Json<MediaSummary>> {
    const TOOL: &str = "create_media";
    record_call(TOOL);

    finish(TOOL, create_media(&state, &request))
}

fn create_media(state: &AppState, request: &MediaInput) -> Result<MediaSummary> {
    let lookup = state.registry.compounds()?;
    let store = state.registry.store()?;

    let entries = validate_media(request, lookup.as_ref())?;
    let media = Media::new(entries).map_err(AppError::Validation)?;

    let record = store.media().insert(
        NewRecord::origin(store.mint(RecordKind::Media), media).named(request.media_name.clone()),
    )?;
    record_store_size(RecordKind::Media, store.media().len());

    tracing::info!(
        media_id = %record.id(),
        compounds = record.body().len(),
        media_type = %MediaType::of(record.body()),
        "Media created"
    );

    Ok(MediaSummary::new(&record, lookup.as_ref()))
}

/// POST /tools/get_media - Full composition of one medium.
pub async fn get_media_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IdRequest>,
) -> Result<Json<MediaDetail>> {
    const TOOL: &str = "get_media";
    record_call(TOOL);
    finish(TOOL, get_media(&state, &request))
}

fn get_media(state: &AppState, request: &IdRequest) -> Result<MediaDetail> {
    let lookup = state.registry.compounds()?;
    let record = state.registry.store()?.media().get(&request.id)?;

    Ok(MediaDetail {
        summary: MediaSummary::new(&record, lookup.as_ref()),
        compounds: record
            .body()
            .compounds()
            .iter()
            .map(|entry| CompoundView::new(entry, lookup.as_ref()))
            .collect(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMediaRequest {
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

#[derive(Debug, Serialize)]
pub struct ListMediaResponse {
    pub total: usize,
    pub media: Vec<MediaSummary>,
}

/// POST /tools/list_media - Stored media, oldest first.
pub async fn list_media_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ListMediaRequest>,
) -> Result<Json<ListMediaResponse>> {
    const TOOL: &str = "list_media";
    record_call(TOOL);
    finish(TOOL, list_media(&state, &request))
}

fn list_media(state: &AppState, request: &ListMediaRequest) -> Result<ListMediaResponse> {
    let lookup = state.registry.compounds()?;
    let records = state
        .registry
        .store()?
        .media()
        .list(|r| request.media_type.map_or(true, |t| MediaType::of(r.body()) == t));

    let media: Vec<MediaSummary> = records
        .iter()
        .map(|r| MediaSummary::new(r, lookup.as_ref()))
        .collect();

    Ok(ListMediaResponse {
        total: media.len(),
        media,
    })
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: String,
    pub remaining: usize,
}

/// POST /tools/delete_media - Remove one medium.
pub async fn delete_media_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IdRequest>,
) -> Result<Json<DeleteResponse>> {
    const TOOL: &str = "delete_media";
    record_call(TOOL);
    finish(TOOL, delete_media(&state, &request))
}

fn delete_media(state: &AppState, request: &IdRequest) -> Result<DeleteResponse> {
    let store = state.registry.store()?;
    let removed = store.media().delete(&request.id)?;
    let remaining = store.media().len();
    record_store_size(RecordKind::Media, remaining);

    tracing::info!(media_id = %removed.id(), "Media deleted");

    Ok(DeleteResponse {
        deleted: removed.id().to_string(),
        remaining,
    })
}
