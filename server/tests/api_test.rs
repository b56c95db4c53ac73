use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use gpu_analyst_core::data::{GpuDataProvider, Record, ValueMetric};
use gpu_analyst_core::llm::{
    ChatCompletion, ChatMessage, ChatRequest, LlmBackend, OrchestratorOptions, ToolCall,
    ToolOrchestrator,
};
use gpu_analyst_core::{AnalystError, Result, ToolRegistry};
use gpu_analyst_server::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

struct ScriptedLlm {
    replies: Mutex<VecDeque<std::result::Result<ChatMessage, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<std::result::Result<ChatMessage, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("script exhausted".to_string()));
        reply
            .map(|m| ChatCompletion::from_message(format!("chatcmpl-{n}"), "backend-model", m))
            .map_err(AnalystError::LlmError)
    }
}

struct FixedGpuData {
    fail: bool,
}

#[async_trait]
impl GpuDataProvider for FixedGpuData {
    async fn technical_specs(&self, model_name: &str) -> Result<Vec<Record>> {
        if self.fail {
            return Err(AnalystError::DataProviderError("no such table".into()));
        }
        let mut row = Record::new();
        row.insert("full_model_name".into(), json!(model_name));
        row.insert("vram_gb".into(), json!(24));
        Ok(vec![row])
    }

    async fn best_value(&self, _metric: ValueMetric, _limit: u32) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn market_prices(&self, _model_keyword: Option<&str>) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }
}

fn app(llm: Arc<ScriptedLlm>, fail: bool) -> axum::Router {
    let registry = ToolRegistry::gpu_tools(Arc::new(FixedGpuData { fail }));
    let orchestrator = ToolOrchestrator::new(
        llm,
        Arc::new(registry),
        OrchestratorOptions::new("backend-model"),
    );
    router(AppState::new(Arc::new(orchestrator), "gpu-analyst-v1"))
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn specs_call() -> ChatMessage {
    ChatMessage::assistant_tool_calls(vec![ToolCall::new(
        "call_1",
        "get_gpu_technical_specs",
        r#"{"model_name":"RTX 4090"}"#,
    )])
}

#[tokio::test]
async fn direct_answer_is_returned_as_completion() {
    let llm = ScriptedLlm::new(vec![Ok(ChatMessage::assistant("Hello! Ask me about GPUs."))]);
    let response = app(llm.clone(), false)
        .oneshot(chat_request(json!({
            "model": "gpu-analyst-v1",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], "chatcmpl-1");
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["choices"][0]["message"]["content"], "Hello! Ask me about GPUs.");
    assert_eq!(llm.request_count(), 1);
}

#[tokio::test]
async fn tool_round_returns_synthesis_completion() {
    let llm = ScriptedLlm::new(vec![
        Ok(specs_call()),
        Ok(ChatMessage::assistant("The RTX 4090 has 24 GB of VRAM.")),
    ]);
    let response = app(llm.clone(), false)
        .oneshot(chat_request(json!({
            "messages": [{"role": "user", "content": "specs of the 4090?"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], "chatcmpl-2");
    assert_eq!(
        body["choices"][0]["message"]["content"],
        "The RTX 4090 has 24 GB of VRAM."
    );
    assert_eq!(llm.request_count(), 2);
}

#[tokio::test]
async fn empty_messages_is_bad_request() {
    let llm = ScriptedLlm::new(vec![]);
    let response = app(llm.clone(), false)
        .oneshot(chat_request(json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(llm.request_count(), 0);
}

#[tokio::test]
async fn malformed_body_is_rejected_by_transport() {
    let llm = ScriptedLlm::new(vec![]);
    let response = app(llm, false)
        .oneshot(chat_request(json!({"model": "gpu-analyst-v1"})))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let llm = ScriptedLlm::new(vec![Err("connection refused".to_string())]);
    let response = app(llm, false)
        .oneshot(chat_request(json!({
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "upstream_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn dataset_failure_is_internal_error() {
    let llm = ScriptedLlm::new(vec![Ok(specs_call())]);
    let response = app(llm.clone(), true)
        .oneshot(chat_request(json!({
            "messages": [{"role": "user", "content": "specs of the 4090?"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "data_provider_error");
    assert_eq!(llm.request_count(), 1);
}

#[tokio::test]
async fn models_lists_served_model() {
    let response = app(ScriptedLlm::new(vec![]), false)
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["object"], "list");
    assert_eq!(body["data"][0]["id"], "gpu-analyst-v1");
    assert_eq!(body["data"][0]["object"], "model");
    assert_eq!(body["data"][0]["owned_by"], "gpu-analyst");
    assert!(body["data"][0]["created"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn health_is_ok() {
    let response = app(ScriptedLlm::new(vec![]), false)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}
