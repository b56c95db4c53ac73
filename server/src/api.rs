// Chat completions HTTP API
//
// Exposes the orchestrator behind the OpenAI wire format so any
// OpenAI-compatible chat client can talk to it.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use gpu_analyst_core::llm::{ChatCompletion, ChatMessage};
use gpu_analyst_core::{AnalystError, ToolOrchestrator};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;

/// Shared router state
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<ToolOrchestrator>,
    model_id: String,
}

impl AppState {
    pub fn new(orchestrator: Arc<ToolOrchestrator>, model_id: impl Into<String>) -> Self {
        Self {
            orchestrator,
            model_id: model_id.into(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Inbound body of `POST /v1/chat/completions`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionsRequest {
    /// Accepted for compatibility; the configured backend model is always used
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletionsRequest {
    /// Whether the client asked for an SSE stream; responses are never streamed
    pub fn wants_stream(&self) -> bool {
        self.extra
            .get("stream")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Orchestrator failure rendered in the OpenAI error shape
#[derive(Debug)]
pub struct ApiError(pub AnalystError);

impl From<AnalystError> for ApiError {
    fn from(err: AnalystError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AnalystError::InvalidConversation(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            AnalystError::DataProviderError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "data_provider_error")
            }
            AnalystError::LlmError(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            AnalystError::ConfigError(_) | AnalystError::SerializationError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            error!(target: "api", status = %status, error = %self.0, "Chat completion failed");
        } else {
            warn!(target: "api", status = %status, error = %self.0, "Rejected chat completion");
        }
        let body = json!({
            "error": {
                "message": self.0.to_string(),
                "type": kind,
                "code": Value::Null,
            }
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions_handler))
        .route("/v1/models", get(models_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &AppConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_addr();
    info!(target: "api", addr = %addr, "Starting GPU analyst API");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        target: "api",
        url = %format!("http://{}", addr),
        model = %config.llm.model,
        "GPU analyst API ready"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(target: "api", "GPU analyst API stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(target: "api", "Shutdown signal received"),
        Err(e) => {
            warn!(target: "api", error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

async fn chat_completions_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatCompletionsRequest>,
) -> Result<Json<ChatCompletion>, ApiError> {
    info!(
        target: "api",
        requested_model = ?request.model,
        messages = request.messages.len(),
        "Chat completion request"
    );
    if request.wants_stream() {
        warn!(target: "api", "Client requested stream=true; replying with a single non-streamed completion");
    }
    if !request.extra.is_empty() {
        let ignored: Vec<&String> = request.extra.keys().collect();
        debug!(target: "api", ignored = ?ignored, "Ignoring extra request fields");
    }

    let answer = state.orchestrator.run(request.messages).await?;
    debug!(target: "api", tool_calls = answer.tool_calls, "Chat completion done");
    Ok(Json(answer.completion))
}

async fn models_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{
            "id": state.model_id,
            "object": "model",
            "created": chrono::Utc::now().timestamp(),
            "owned_by": "gpu-analyst",
        }]
    }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        let cases = [
            (AnalystError::InvalidConversation("x".into()), 400, "invalid_request_error"),
            (AnalystError::DataProviderError("x".into()), 500, "data_provider_error"),
            (AnalystError::LlmError("x".into()), 502, "upstream_error"),
            (AnalystError::ConfigError("x".into()), 500, "internal_error"),
        ];
        for (err, status, kind) in cases {
            let (s, k) = ApiError(err).status_and_kind();
            assert_eq!(s.as_u16(), status);
            assert_eq!(k, kind);
        }
    }

    #[test]
    fn request_keeps_unknown_fields() {
        let req: ChatCompletionsRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false,
            "temperature": 0.3
        }))
        .unwrap();
        assert_eq!(req.model, None);
        assert_eq!(req.messages.len(), 1);
        assert!(req.extra.contains_key("stream"));
        assert!(!req.wants_stream());
    }

    #[test]
    fn stream_flag_is_detected() {
        let req: ChatCompletionsRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true
        }))
        .unwrap();
        assert!(req.wants_stream());
    }
}
