use std::sync::Arc;

use crate::config::Config;
use crate::generation::debounce::PreviewScheduler;
use crate::generation::modules::ModuleRegistry;
use crate::layout::measure::MeasureSurface;
use crate::llm_client::WordProblemSource;
use crate::models::problem::WorksheetStore;
use crate::models::settings::PrintLayoutConfig;
use crate::presets::PresetStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Startup config, kept for handlers that grow env-driven behavior.
    #[allow(dead_code)]
    pub config: Config,
    /// All registered subject modules, built once at startup.
    pub registry: Arc<ModuleRegistry>,
    /// The committed worksheet plus the generation busy flag.
    pub worksheet: Arc<WorksheetStore>,
    pub presets: Arc<PresetStore>,
    /// Pluggable AI word-problem source. Default: the Anthropic-backed
    /// `LlmClient`; tests swap in a stub.
    pub word_problems: Arc<dyn WordProblemSource>,
    /// Height oracle for the capacity estimator. Default: the text heuristic.
    pub surface: Arc<dyn MeasureSurface>,
    /// Print config applied when a request does not carry its own.
    pub default_print: PrintLayoutConfig,
    /// Debounced preview regeneration (trailing edge, last settings win).
    pub preview: Arc<PreviewScheduler>,
}
