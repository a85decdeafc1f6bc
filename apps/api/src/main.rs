mod config;
mod errors;
mod generation;
mod layout;
mod llm_client;
mod models;
mod presets;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::debounce::{PreviewScheduler, PREVIEW_DEBOUNCE};
use crate::generation::modules::ModuleRegistry;
use crate::layout::measure::TextHeuristicSurface;
use crate::llm_client::LlmClient;
use crate::models::problem::WorksheetStore;
use crate::models::settings::PrintLayoutConfig;
use crate::presets::PresetStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting worksheet API v{}", env!("CARGO_PKG_VERSION"));

    // Module registry
    let registry = Arc::new(ModuleRegistry::with_builtins());
    info!("Module registry initialized ({} modules)", registry.list().len());

    // Preset store
    let presets = Arc::new(PresetStore::open(&config.presets_path).await);
    info!("Preset store loaded from {}", config.presets_path);

    // AI word-problem source
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Default print layout and measurement surface
    let default_print = PrintLayoutConfig::default();
    info!(
        "Default print layout: {:?}, {} columns",
        default_print.layout_mode, default_print.columns
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        registry,
        worksheet: Arc::new(WorksheetStore::default()),
        presets,
        word_problems: Arc::new(llm),
        surface: Arc::new(TextHeuristicSurface),
        default_print,
        preview: Arc::new(PreviewScheduler::new(PREVIEW_DEBOUNCE)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
