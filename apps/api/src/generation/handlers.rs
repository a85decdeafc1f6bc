//! Axum route handlers for the worksheet API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::generation::modules::ModuleInfo;
use crate::generation::pipeline::{run_generation, GenerateOutcome, GenerateRequest};
use crate::layout::capacity::estimate_capacity;
use crate::models::problem::{ProblemRecord, WorksheetPage};
use crate::models::settings::{LayoutMode, ModuleSettings, PrintLayoutConfig};
use crate::presets::Preset;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    #[serde(default)]
    pub print: Option<PrintLayoutConfig>,
    /// Module whose output sizes the probe; placeholder sample when absent.
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub settings: ModuleSettings,
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub problems_per_page: u32,
}

#[derive(Debug, Serialize)]
pub struct WorksheetResponse {
    /// True while a generation batch is in flight (the loading indicator).
    pub busy: bool,
    pub module: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    pub problem_count: usize,
    pub per_page: u32,
    pub page_count: u32,
    pub pages: Vec<WorksheetPage>,
}

#[derive(Debug, Deserialize)]
pub struct PutPresetRequest {
    pub settings: Value,
}

// ────────────────────────────────────────────────────────────────────────────
// Worksheet handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/worksheets/generate
///
/// Runs the full pipeline: plan → generate → commit. Returns 409 while
/// another batch is in flight.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateOutcome>, AppError> {
    if request.module.trim().is_empty() {
        return Err(AppError::Validation("module cannot be empty".to_string()));
    }

    let outcome = run_generation(
        &state.registry,
        &state.worksheet,
        state.word_problems.as_ref(),
        state.surface.as_ref(),
        &state.default_print,
        request,
    )
    .await?;

    Ok(Json(outcome))
}

/// POST /api/v1/worksheets/preview
///
/// Debounced regeneration for live-preview settings changes. Always 202:
/// the run happens (or is superseded) after the debounce window.
pub async fn handle_preview(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<StatusCode, AppError> {
    if state.registry.get(&request.module).is_none() {
        return Err(AppError::NotFound(format!(
            "Unknown module '{}'",
            request.module
        )));
    }

    let scheduler = state.preview.clone();
    let run_state = state.clone();
    let _task = scheduler.submit(request, move |request| async move {
        run_generation(
            &run_state.registry,
            &run_state.worksheet,
            run_state.word_problems.as_ref(),
            run_state.surface.as_ref(),
            &run_state.default_print,
            request,
        )
        .await
    });

    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/worksheets/current
///
/// The committed worksheet. Pages come straight from the store, where each
/// batch was partitioned at commit time, so appended batches never reflow
/// earlier ones.
pub async fn handle_current(
    State(state): State<AppState>,
) -> Result<Json<WorksheetResponse>, AppError> {
    let snapshot = state.worksheet.snapshot().await;

    Ok(Json(WorksheetResponse {
        busy: state.worksheet.is_busy(),
        module: snapshot.module,
        title: snapshot.title,
        preamble: snapshot.preamble,
        problem_count: snapshot.problems.len(),
        per_page: snapshot.per_page,
        page_count: snapshot.page_count,
        pages: snapshot.pages,
    }))
}

/// POST /api/v1/worksheets/reset
pub async fn handle_reset(State(state): State<AppState>) -> StatusCode {
    state.worksheet.reset().await;
    StatusCode::NO_CONTENT
}

// ────────────────────────────────────────────────────────────────────────────
// Layout / module handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/layout/estimate
///
/// Capacity preview for a print config, without generating anything.
pub async fn handle_estimate(
    State(state): State<AppState>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, AppError> {
    let print = request.print.unwrap_or_else(|| state.default_print.clone());
    print.validate().map_err(AppError::Validation)?;
    request.settings.validate().map_err(AppError::Validation)?;

    let problems_per_page = match print.layout_mode {
        LayoutMode::Table => print.rows.saturating_mul(print.columns).max(1),
        LayoutMode::Flow => {
            let sample: Option<ProblemRecord> = request
                .module
                .as_deref()
                .and_then(|key| state.registry.get(key))
                .and_then(|module| module.generate(&request.settings).ok());
            estimate_capacity(state.surface.as_ref(), sample.as_ref(), &print)
        }
    };

    Ok(Json(EstimateResponse { problems_per_page }))
}

/// GET /api/v1/modules
pub async fn handle_list_modules(State(state): State<AppState>) -> Json<Vec<ModuleInfo>> {
    Json(state.registry.list())
}

// ────────────────────────────────────────────────────────────────────────────
// Preset handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/presets
pub async fn handle_list_presets(State(state): State<AppState>) -> Json<Vec<Preset>> {
    Json(state.presets.list().await)
}

/// GET /api/v1/presets/:name
pub async fn handle_get_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Preset>, AppError> {
    state
        .presets
        .get(&name)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Preset '{name}' not found")))
}

/// PUT /api/v1/presets/:name
pub async fn handle_put_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<PutPresetRequest>,
) -> Result<Json<Preset>, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("preset name cannot be empty".to_string()));
    }
    let preset = state.presets.put(name, request.settings).await?;
    Ok(Json(preset))
}

/// DELETE /api/v1/presets/:name
pub async fn handle_delete_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.presets.delete(&name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Preset '{name}' not found")))
    }
}
