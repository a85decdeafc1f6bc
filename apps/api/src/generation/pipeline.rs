//! Generation pipeline — orchestrates one worksheet batch.
//!
//! Flow: acquire busy flag → resolve module → validate settings/config →
//!       sample problem (auto-fit only) → plan → generate loop → commit.
//!
//! Fail-fast: the first generator error aborts the remaining iterations and
//! nothing is committed — the previous worksheet survives. Word-problem
//! batches are awaited from the AI source in a single call and share the same
//! all-or-nothing semantics. The busy flag is a reject-while-busy interlock
//! and is released on every exit path by the guard's drop.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::modules::ModuleRegistry;
use crate::layout::measure::MeasureSurface;
use crate::layout::paginator::{plan_generation, GenerationPlan, PlanMode};
use crate::llm_client::WordProblemSource;
use crate::models::problem::{CommittedBatch, ProblemRecord, WorksheetStore};
use crate::models::settings::{LayoutMode, ModuleSettings, PrintLayoutConfig};

// ────────────────────────────────────────────────────────────────────────────
// Request / outcome
// ────────────────────────────────────────────────────────────────────────────

/// One generation request as received over the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub module: String,
    #[serde(default)]
    pub settings: ModuleSettings,
    /// Overrides the service-wide default print config when present.
    #[serde(default)]
    pub print: Option<PrintLayoutConfig>,
    /// Replace the current worksheet (true) or append to it (false).
    #[serde(default = "default_clear_previous")]
    pub clear_previous: bool,
}

fn default_clear_previous() -> bool {
    true
}

/// Summary of a committed batch.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOutcome {
    pub batch_id: Uuid,
    pub module: String,
    pub title: String,
    pub plan: GenerationPlan,
    pub problem_count: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs one generation batch end to end.
///
/// Takes the collaborators individually rather than `AppState` so tests can
/// wire stubs without environment configuration.
pub async fn run_generation(
    registry: &ModuleRegistry,
    worksheet: &WorksheetStore,
    word_problems: &dyn WordProblemSource,
    surface: &dyn MeasureSurface,
    default_print: &PrintLayoutConfig,
    request: GenerateRequest,
) -> Result<GenerateOutcome, AppError> {
    // Reject-while-busy: released on drop, success and failure alike.
    let _busy = worksheet.try_begin().ok_or(AppError::Busy)?;

    let module = registry
        .get(&request.module)
        .ok_or_else(|| AppError::NotFound(format!("Unknown module '{}'", request.module)))?;

    let settings = request.settings;
    let print = request.print.unwrap_or_else(|| default_print.clone());
    print.validate().map_err(AppError::Validation)?;
    settings.validate().map_err(AppError::Validation)?;

    // A representative problem for the estimator. Only the auto-fit flow path
    // measures; a failed sample degrades to the placeholder, not an error.
    let sample = if settings.auto_fit
        && !module.practice_sheet()
        && print.layout_mode == LayoutMode::Flow
    {
        info!("estimating capacity for module '{}'", module.key());
        module.generate(&settings).ok()
    } else {
        None
    };

    let plan = plan_generation(module.practice_sheet(), &settings, &print, surface, sample.as_ref());
    info!(
        "plan for '{}': mode={:?}, per_page={}, pages={}, total={}",
        module.key(),
        plan.mode,
        plan.per_page,
        plan.page_count,
        plan.total
    );

    let problems = if settings.word_problems && plan.mode != PlanMode::PracticeSheet {
        // One awaited call per batch, never one per problem.
        word_problems
            .generate_batch(module.key(), &settings, plan.total)
            .await
            .map_err(|e| AppError::Llm(format!("{}: {e}", module.key())))?
    } else {
        generate_batch_sync(module.as_ref(), &settings, plan.total)
            .map_err(AppError::Generator)?
    };

    let batch_id = Uuid::new_v4();
    let outcome = GenerateOutcome {
        batch_id,
        module: module.key().to_string(),
        title: module.title().to_string(),
        plan,
        problem_count: problems.len(),
    };

    worksheet
        .commit(CommittedBatch {
            batch_id,
            module: module.key().to_string(),
            title: module.title().to_string(),
            preamble: module.preamble(&settings),
            problems,
            per_page: plan.per_page,
            layout_mode: print.layout_mode,
            clear_previous: request.clear_previous,
        })
        .await;

    info!(
        "committed batch {} for '{}': {} problems on {} pages",
        batch_id, outcome.module, outcome.problem_count, plan.page_count
    );

    Ok(outcome)
}

/// Calls the module once per unit, in order. The first error discards the
/// partial batch and names the failing module.
fn generate_batch_sync(
    module: &dyn crate::generation::modules::GeneratorModule,
    settings: &ModuleSettings,
    total: u32,
) -> Result<Vec<ProblemRecord>, String> {
    let mut problems = Vec::with_capacity(total as usize);
    for _ in 0..total {
        let record = module
            .generate(settings)
            .map_err(|e| format!("{}: {e}", module.key()))?;
        problems.push(record);
    }
    Ok(problems)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
