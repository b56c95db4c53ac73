// GPU Analyst HTTP service
// OpenAI-compatible chat completions endpoint over the tool orchestrator

pub mod api;
pub mod config;

use std::sync::Arc;

use gpu_analyst_core::{AnalystError, LlmClient, ToolOrchestrator, ToolRegistry};

pub use api::{router, serve, ApiError, AppState, ChatCompletionsRequest};
pub use config::{AppConfig, LlmProvider};

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Core(#[from] AnalystError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Wire the HTTP LLM client, the SQLite store and the GPU tools into a router state
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let llm = LlmClient::new(config.llm_client_config())?;
    let store = config.gpu_store();
    tracing::info!(target: "api", database = %store.path().display(), "Using GPU dataset");

    let registry = ToolRegistry::gpu_tools(Arc::new(store));
    let orchestrator = ToolOrchestrator::new(
        Arc::new(llm),
        Arc::new(registry),
        config.orchestrator_options(),
    );
    Ok(AppState::new(
        Arc::new(orchestrator),
        config.server.model_id.clone(),
    ))
}
