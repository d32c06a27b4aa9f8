//! Integration tests for the tool endpoints.
//!
//! The router runs against an in-memory compound table, a two-template cache
//! and a deterministic stub backend, so no data files or solver are needed.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use metabolic_session::{
    external::{
        BuildRequest, FbaOutcome, FbaRequest, GapfillOutcome, GapfillRequest, Template,
    },
    store::ModelSummary,
    AppError, AppState, CompoundDatabase, ComputeBackend, Config, LineageState, OfflineBackend,
    Registry, Result, TemplateCache,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

/// Produces summaries derived from the request so assertions stay simple.
struct StubBackend;

impl ComputeBackend for StubBackend {
    fn build_model(&self, request: &BuildRequest) -> Result<ModelSummary> {
        Ok(ModelSummary {
            reaction_count: request.template.reaction_count,
            metabolite_count: request.template.reaction_count + 5,
            gene_count: 42,
            template: String::new(),
            compartments: request.template.compartments.clone(),
            has_growth_capability: false,
        })
    }

    fn gapfill(&self, request: &GapfillRequest) -> Result<GapfillOutcome> {
        let mut summary = request.model.body().clone();
        summary.reaction_count += 2;
        summary.has_growth_capability = true;
        Ok(GapfillOutcome {
            summary,
            reactions_added: vec!["rxn05459_c0".into(), "rxn05481_c0".into()],
        })
    }

    fn run_fba(&self, request: &FbaRequest) -> Result<FbaOutcome> {
        let grows = request.model.body().has_growth_capability;
        Ok(FbaOutcome {
            status: "optimal".into(),
            objective_value: if grows { 0.87 } else { 0.0 },
        })
    }
}

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        shutdown_timeout_secs: 0,
        compounds_path: PathBuf::new(),
        templates_dir: PathBuf::new(),
        compute_timeout_secs: 5,
    }
}

fn ready_state(backend: Arc<dyn ComputeBackend>) -> Arc<AppState> {
    let compounds = CompoundDatabase::from_entries([
        ("cpd00001", "H2O", "H2O"),
        ("cpd00007", "O2", "O2"),
        ("cpd00009", "Phosphate", "HO4P"),
        ("cpd00013", "NH3", "H4N"),
        ("cpd00027", "D-Glucose", "C6H12O6"),
    ]);
    let templates = TemplateCache::from_templates([
        Template::new("GramNegative", ["c0", "e0", "p0"], 120),
        Template::new("Core", ["c0", "e0"], 40),
    ]);

    let registry = Registry::new();
    registry
        .initialize_with(Arc::new(compounds), templates)
        .expect("registry initializes once");
    Arc::new(AppState::with_registry(
        Arc::new(registry),
        backend,
        test_config(),
    ))
}

fn create_test_app() -> (Router, Arc<AppState>) {
    let state = ready_state(Arc::new(StubBackend));
    (metabolic_session::router(Arc::clone(&state)), state)
}

/// Helper to make a JSON request to the router.
async fn json_request(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = match method {
        "GET" => Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
        "POST" => Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.unwrap_or(json!({})).to_string()))
            .unwrap(),
        _ => panic!("Unsupported method"),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

async fn tool(app: &Router, name: &str, body: Value) -> (StatusCode, Value) {
    json_request(app, "POST", &format!("/tools/{}", name), Some(body)).await
}

async fn create_glucose_media(app: &Router) -> String {
    let (status, body) = tool(
        app,
        "create_media",
        json!({
            "compounds": ["cpd00027", "cpd00007", "cpd00001", "cpd00009", "cpd00013"],
            "default_uptake": 10,
            "custom_bounds": { "cpd00007": [-20, 0] },
            "media_name": "glucose minimal"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["media_id"].as_str().unwrap().to_string()
}

async fn build_draft(app: &Router) -> String {
    let (status, body) = tool(
        app,
        "build_model",
        json!({
            "protein_sequences": { "prot1": "MKTAYIAKQR", "prot2": "MSLNVAAL*" },
            "template": "GramNegative",
            "model_name": "E. coli draft"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["model_id"].as_str().unwrap().to_string()
}

// ============================================================================
// Health Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_200() {
    let (app, _) = create_test_app();
    let (status, body) = json_request(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reflects_registry_state() {
    let (app, _) = create_test_app();
    let (status, body) = json_request(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let uninitialized = Arc::new(AppState::with_registry(
        Arc::new(Registry::new()),
        Arc::new(OfflineBackend),
        test_config(),
    ));
    let app = metabolic_session::router(uninitialized);
    let (status, body) = json_request(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not_ready");
}

#[tokio::test]
async fn test_tools_before_initialization_report_not_initialized() {
    let state = Arc::new(AppState::with_registry(
        Arc::new(Registry::new()),
        Arc::new(OfflineBackend),
        test_config(),
    ));
    let app = metabolic_session::router(state);

    let (status, body) = tool(&app, "list_media", json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "not_initialized");
}

// ============================================================================
// Media Tests
// ============================================================================

#[tokio::test]
async fn test_create_media_returns_summary() {
    let (app, state) = create_test_app();
    let (status, body) = tool(
        &app,
        "create_media",
        json!({
            "compounds": ["cpd00027", "cpd00007", "cpd00001", "cpd00009"],
            "custom_bounds": { "cpd00007": [-20, 0] },
            "media_name": "glucose minimal"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["media_id"].as_str().unwrap().starts_with("media_"));
    assert_eq!(body["media_name"], "glucose minimal");
    assert_eq!(body["num_compounds"], 4);
    assert_eq!(body["media_type"], "minimal");

    let preview = body["compounds_preview"].as_array().unwrap();
    assert_eq!(preview.len(), 3);
    assert_eq!(preview[0]["id"], "cpd00027");
    assert_eq!(preview[0]["name"], "D-Glucose");
    assert_eq!(preview[0]["lower_bound"], -100.0);
    assert_eq!(preview[1]["lower_bound"], -20.0);
    assert_eq!(preview[1]["upper_bound"], 0.0);

    assert_eq!(state.registry.store().unwrap().media().len(), 1);
}

#[tokio::test]
async fn test_reversed_bounds_rejected_and_nothing_stored() {
    let (app, state) = create_test_app();
    let (status, body) = tool(
        &app,
        "create_media",
        json!({
            "compounds": ["cpd00027"],
            "custom_bounds": { "cpd00027": [100, -5] }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    let violations = body["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0]["rule"], "custom_bounds.order");
    let message = violations[0]["message"].as_str().unwrap();
    assert!(message.contains("cpd00027"));
    assert!(message.contains("must be less than upper bound"));

    assert!(state.registry.store().unwrap().media().is_empty());
}

#[tokio::test]
async fn test_create_media_reports_all_violations() {
    let (app, state) = create_test_app();
    let (status, body) = tool(
        &app,
        "create_media",
        json!({
            "compounds": [],
            "custom_bounds": { "glucose": [-10, 10] }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let rules: Vec<&str> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["rule"].as_str().unwrap())
        .collect();
    assert_eq!(rules, vec!["compounds.non_empty", "custom_bounds.keys"]);
    assert!(state.registry.store().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_list_and_delete_media() {
    let (app, _) = create_test_app();
    let first = create_glucose_media(&app).await;
    let second = create_glucose_media(&app).await;

    let (status, body) = tool(&app, "get_media", json!({ "id": first })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["compounds"].as_array().unwrap().len(), 5);

    let (_, body) = tool(&app, "list_media", json!({})).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["media"][0]["media_id"], first.as_str());
    assert_eq!(body["media"][1]["media_id"], second.as_str());

    let (_, body) = tool(&app, "list_media", json!({ "media_type": "rich" })).await;
    assert_eq!(body["total"], 0);

    let (status, body) = tool(&app, "delete_media", json!({ "id": first })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], 1);

    let (status, body) = tool(&app, "get_media", json!({ "id": first })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
    assert_eq!(body["available"], json!([second]));
}

// ============================================================================
// Model Tests
// ============================================================================

#[tokio::test]
async fn test_build_model_stores_draft() {
    let (app, _) = create_test_app();
    let model_id = build_draft(&app).await;

    assert!(model_id.starts_with("model_"));
    assert!(model_id.ends_with(".draft"));

    let (status, body) = tool(&app, "get_model", json!({ "id": model_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lineage_state"], "draft");
    assert_eq!(body["template"], "GramNegative");
    assert_eq!(body["reaction_count"], 120);
    assert_eq!(body["model_name"], "E. coli draft");
    assert_eq!(body["derived_from"], Value::Null);
}

#[tokio::test]
async fn test_build_model_rejects_both_genome_sources() {
    let (app, _) = create_test_app();
    let (status, body) = tool(
        &app,
        "build_model",
        json!({
            "protein_sequences": { "p1": "MK" },
            "fasta_path": "genome.faa",
            "template": "GramPositive"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let rules: Vec<&str> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["rule"].as_str().unwrap())
        .collect();
    assert_eq!(rules, vec!["genome.exactly_one", "template.known"]);
}

#[tokio::test]
async fn test_gapfill_derives_from_parent() {
    let (app, _) = create_test_app();
    let media_id = create_glucose_media(&app).await;
    let model_id = build_draft(&app).await;

    let (status, body) = tool(
        &app,
        "gapfill_model",
        json!({ "model_id": model_id, "media_id": media_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let gapfilled = format!("{}.gf", model_id);
    assert_eq!(body["model_id"], gapfilled.as_str());
    assert_eq!(body["derived_from"], model_id.as_str());
    assert_eq!(body["lineage_state"], "gapfilled");
    assert_eq!(body["reaction_count"], 122);
    assert_eq!(body["reactions_added"].as_array().unwrap().len(), 2);

    // Gapfilling the same parent again would reuse the same id.
    let (status, body) = tool(
        &app,
        "gapfill_model",
        json!({ "model_id": model_id, "media_id": media_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    // Gapfilling the gapfilled model stays `gapfilled`.
    let (status, body) = tool(
        &app,
        "gapfill_model",
        json!({ "model_id": gapfilled, "media_id": media_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lineage_state"], "gapfilled");

    let (_, body) = tool(&app, "list_models", json!({ "lineage_state": "gapfilled" })).await;
    assert_eq!(body["total"], 2);
    let (_, body) = tool(&app, "list_models", json!({ "lineage_state": "draft" })).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_gapfill_with_missing_inputs_reports_both() {
    let (app, _) = create_test_app();
    let (status, body) = tool(
        &app,
        "gapfill_model",
        json!({ "model_id": "model_nope.draft", "media_id": "media_nope" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let rules: Vec<&str> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["rule"].as_str().unwrap())
        .collect();
    assert_eq!(rules, vec!["model_id.exists", "media_id.exists"]);
}

#[tokio::test]
async fn test_lineage_breaks_after_parent_deletion() {
    let (app, _) = create_test_app();
    let media_id = create_glucose_media(&app).await;
    let model_id = build_draft(&app).await;
    let (_, body) = tool(
        &app,
        "gapfill_model",
        json!({ "model_id": model_id, "media_id": media_id }),
    )
    .await;
    let child = body["model_id"].as_str().unwrap().to_string();

    let (status, body) = tool(&app, "model_lineage", json!({ "model_id": child })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chain"].as_array().unwrap().len(), 2);
    assert_eq!(body["chain"][0]["model_id"], model_id.as_str());

    let (status, body) = tool(&app, "delete_model", json!({ "id": model_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orphaned"], json!([child]));

    let (status, body) = tool(&app, "model_lineage", json!({ "model_id": child })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&model_id));

    let (status, _) = tool(&app, "get_model", json!({ "id": child })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deleted_gapfill_id_is_never_reissued() {
    let (app, _) = create_test_app();
    let media_id = create_glucose_media(&app).await;
    let model_id = build_draft(&app).await;
    let analysis = |model: &str| json!({ "model_id": model, "media_id": media_id });

    let (_, first) = tool(&app, "gapfill_model", analysis(&model_id)).await;
    let first = first["model_id"].as_str().unwrap().to_string();
    let (_, second) = tool(&app, "gapfill_model", analysis(&first)).await;
    let second = second["model_id"].as_str().unwrap().to_string();

    let (status, _) = tool(&app, "delete_model", json!({ "id": first })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = tool(&app, "gapfill_model", analysis(&model_id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    // The grandchild stays orphaned instead of linking to a new record.
    let (status, body) = tool(&app, "model_lineage", json!({ "model_id": second })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&first));
}

// ============================================================================
// Analysis Tests
// ============================================================================

#[tokio::test]
async fn test_run_fba_reports_growth() {
    let (app, state) = create_test_app();
    let media_id = create_glucose_media(&app).await;
    let model_id = build_draft(&app).await;

    let (status, body) = tool(
        &app,
        "run_fba",
        json!({ "model_id": model_id, "media_id": media_id, "objective": "bio1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["grows"], false);
    assert_eq!(body["status"], "optimal");

    let (_, gapfilled) = tool(
        &app,
        "gapfill_model",
        json!({ "model_id": model_id, "media_id": media_id }),
    )
    .await;
    let (_, body) = tool(
        &app,
        "run_fba",
        json!({ "model_id": gapfilled["model_id"], "media_id": media_id }),
    )
    .await;
    assert_eq!(body["grows"], true);
    assert_eq!(body["objective_value"], 0.87);

    // FBA never adds records.
    assert_eq!(state.registry.store().unwrap().models().len(), 2);
}

#[tokio::test]
async fn test_offline_backend_surfaces_external_error() {
    let state = ready_state(Arc::new(OfflineBackend));
    let app = metabolic_session::router(Arc::clone(&state));

    let (status, body) = tool(
        &app,
        "build_model",
        json!({ "fasta_path": "/data/genome.faa", "template": "Core" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "external_service");
    assert_eq!(body["retryable"], false);
    assert!(state.registry.store().unwrap().models().is_empty());
}

#[tokio::test]
async fn test_error_kinds_are_structured() {
    let err = AppError::NotFound {
        kind: "model",
        id: "model_x".into(),
        available: vec![],
    };
    assert_eq!(err.kind(), metabolic_session::ErrorKind::NotFound);
    assert_eq!(LineageState::Gapfilled.to_string(), "gapfilled");
}
