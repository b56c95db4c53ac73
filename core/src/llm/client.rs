use crate::{AnalystError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

use super::types::{ChatCompletion, ChatRequest};

/// Anything that can answer a Chat Completions request.
///
/// The orchestrator only talks to the model through this trait, so tests can
/// substitute a scripted backend for the HTTP client.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion>;
}

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct LlmClientConfig {
    pub base_url: String, // e.g., https://api.openai.com/v1
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            request_timeout_ms: 60_000,
        }
    }
}

/// HTTP client for the Chat Completions API
#[derive(Clone)]
pub struct LlmClient {
    pub(crate) http: Client,
    pub(crate) cfg: LlmClientConfig,
}

impl LlmClient {
    pub fn new(cfg: LlmClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| AnalystError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.cfg
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl LlmBackend for LlmClient {
    /// Contract:
    /// - Input: fully built request (model, messages, optional tools)
    /// - Output: parsed completion
    /// - Error: transport, non-2xx status, or unparsable body; never retried
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        let url = self.chat_url();
        debug!(
            target: "llm_client",
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "POST chat.completions"
        );

        let mut req = self
            .http
            .post(&url)
            .header("content-type", "application/json");
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .json(request)
            .send()
            .await
            .map_err(|e| AnalystError::LlmError(format!("Chat Completions HTTP error: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target: "llm_client", %status, body = %text, "Chat Completions error");
            return Err(AnalystError::LlmError(format!(
                "Chat Completions error: status={} body={}",
                status, text
            )));
        }

        resp.json::<ChatCompletion>().await.map_err(|e| {
            AnalystError::LlmError(format!("Failed to parse Chat Completions JSON: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_url_tolerates_trailing_slash() {
        let client = LlmClient::new(LlmClientConfig {
            base_url: "http://localhost:11435/v1/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.chat_url(), "http://localhost:11435/v1/chat/completions");
    }
}
