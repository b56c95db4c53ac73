use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn, Span};

use crate::conversation::Conversation;
use crate::prompt::ANALYST_SYSTEM_PROMPT;
use crate::tools::{ToolError, ToolRegistry};
use crate::{AnalystError, Result};

use super::client::LlmBackend;
use super::types::{ChatCompletion, ChatMessage, ChatRequest, ToolCall, ToolChoice};

/// Orchestrator options controlling the model call
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorOptions {
    pub model: String,
    pub system_prompt: String,
    pub temperature: Option<f32>,
}

impl OrchestratorOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: ANALYST_SYSTEM_PROMPT.to_string(),
            temperature: None,
        }
    }
}

/// What the model decided in the intent-detection call
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// No tools requested; the message is the answer
    Answer(ChatMessage),
    /// One or more tools requested, in issuance order
    Invoke {
        message: ChatMessage,
        calls: Vec<ToolCall>,
    },
}

impl Intent {
    pub fn classify(message: ChatMessage) -> Self {
        match message.tool_calls.as_ref() {
            Some(calls) if !calls.is_empty() => {
                let calls = calls.clone();
                Intent::Invoke { message, calls }
            }
            _ => Intent::Answer(message),
        }
    }
}

/// Final answer surfaced to the caller
#[derive(Debug, Clone)]
pub struct FinalAnswer {
    /// Final assistant message
    pub message: ChatMessage,
    /// Completion that produced `message`, as returned by the model
    pub completion: ChatCompletion,
    /// Full transcript, ending with `message`
    pub conversation: Conversation,
    /// Number of tools dispatched during the run
    pub tool_calls: usize,
}

/// Drives the two-phase tool-calling protocol: intent detection with tools
/// exposed, at most one round of dispatch, then synthesis with tools hidden.
pub struct ToolOrchestrator {
    llm: Arc<dyn LlmBackend>,
    registry: Arc<ToolRegistry>,
    options: OrchestratorOptions,
}

impl ToolOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        registry: Arc<ToolRegistry>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            llm,
            registry,
            options,
        }
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Contract:
    /// - Input: caller messages (validated, system prompt injected if absent)
    /// - Output: FinalAnswer from phase 1 (no tools requested) or phase 2
    /// - Error: LLM failures and data provider failures; bad tool names or
    ///   arguments are reported to the model instead
    #[tracing::instrument(name = "tool_orchestrator.run", skip(self, messages), fields(model = %self.options.model, messages = messages.len(), tool_calls))]
    pub async fn run(&self, messages: Vec<ChatMessage>) -> Result<FinalAnswer> {
        let started = Instant::now();
        let mut conversation =
            Conversation::with_system_prompt(&self.options.system_prompt, messages)?;

        // Phase 1: intent detection
        let tools = self.registry.describe();
        debug!(target: "tool_orch", count = tools.len(), "Exposing tools");
        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (Some(tools), Some(ToolChoice::Auto))
        };
        let request = ChatRequest {
            model: self.options.model.clone(),
            messages: request_messages(&conversation),
            tools,
            tool_choice,
            temperature: self.options.temperature,
        };
        let llm_started = Instant::now();
        let completion = self.llm.chat(&request).await?;
        let message = first_message(&completion)?;
        debug!(target: "tool_orch", latency_ms = %(llm_started.elapsed().as_secs_f64() * 1000.0), "Intent call finished");

        let (message, calls) = match Intent::classify(message) {
            Intent::Answer(message) => {
                conversation.push(message.clone());
                info!(target: "tool_orch", elapsed_s = %format!("{:.2}", started.elapsed().as_secs_f64()), "Answered without tools");
                return Ok(FinalAnswer {
                    message,
                    completion,
                    conversation,
                    tool_calls: 0,
                });
            }
            Intent::Invoke { message, calls } => (message, calls),
        };

        Span::current().record("tool_calls", calls.len());
        conversation.push(message);

        // Dispatch sequentially, in issuance order
        for call in &calls {
            let content = self.dispatch(call).await?;
            conversation.push(ChatMessage::tool(
                call.id.clone(),
                call.name().to_string(),
                content,
            ));
        }

        // Phase 2: synthesis, tools hidden
        let request = ChatRequest {
            model: self.options.model.clone(),
            messages: request_messages(&conversation),
            tools: None,
            tool_choice: None,
            temperature: self.options.temperature,
        };
        let llm_started = Instant::now();
        let completion = self.llm.chat(&request).await?;
        let message = first_message(&completion)?;
        debug!(target: "tool_orch", latency_ms = %(llm_started.elapsed().as_secs_f64() * 1000.0), "Synthesis call finished");

        if !message.tool_calls().is_empty() {
            warn!(target: "tool_orch", count = message.tool_calls().len(), "Synthesis requested more tools; returning it as final");
        }

        conversation.push(message.clone());
        info!(target: "tool_orch", tool_calls = calls.len(), elapsed_s = %format!("{:.2}", started.elapsed().as_secs_f64()), "Insight delivered");
        Ok(FinalAnswer {
            message,
            completion,
            conversation,
            tool_calls: calls.len(),
        })
    }

    /// Run one invocation and render its result as tool message content.
    /// Only data provider failures escape as errors.
    async fn dispatch(&self, call: &ToolCall) -> Result<String> {
        let name = call.name();
        if !self.registry.contains(name) {
            warn!(target: "tool_orch", tool = %name, "Model requested unknown tool");
            return Ok(tool_not_found().to_string());
        }

        let arguments = match parse_arguments(&call.function.arguments) {
            Ok(args) => args,
            Err(message) => {
                warn!(target: "tool_orch", tool = %name, error = %message, "Malformed tool arguments");
                return Ok(invalid_arguments(&message).to_string());
            }
        };

        info!(target: "tool_orch", tool = %name, arguments = %arguments, "Tool invocation triggered");
        let started = Instant::now();
        let result = match self.registry.dispatch(name, arguments).await {
            Ok(value) => value,
            Err(ToolError::NotFound(_)) => tool_not_found(),
            Err(ToolError::InvalidArguments(message)) => invalid_arguments(&message),
            Err(ToolError::ExecutionFailed(message)) => {
                return Err(AnalystError::DataProviderError(message));
            }
        };
        debug!(target: "tool_orch", tool = %name, latency_ms = %(started.elapsed().as_secs_f64() * 1000.0), "Tool invocation finished");

        Ok(serde_json::to_string(&result)?)
    }
}

fn request_messages(conversation: &Conversation) -> Vec<ChatMessage> {
    conversation
        .messages()
        .iter()
        .map(ChatMessage::to_request_form)
        .collect()
}

fn first_message(completion: &ChatCompletion) -> Result<ChatMessage> {
    completion
        .first_message()
        .cloned()
        .ok_or_else(|| AnalystError::LlmError("Missing choices[0].message in completion".into()))
}

/// Parse model-produced argument text into a JSON object; blank text means no arguments
pub fn parse_arguments(raw: &str) -> std::result::Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(v @ Value::Object(_)) => Ok(v),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    }
}

fn tool_not_found() -> Value {
    json!({"error": "tool_not_found"})
}

fn invalid_arguments(message: &str) -> Value {
    json!({"error": "invalid_arguments", "message": message})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_arguments_are_an_empty_object() {
        assert_eq!(parse_arguments("  ").unwrap(), json!({}));
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        assert!(parse_arguments("[1, 2]").is_err());
        assert!(parse_arguments("{\"model_name\": ").is_err());
    }

    #[test]
    fn classify_splits_on_tool_calls() {
        let answer = ChatMessage::assistant("hello");
        assert_eq!(Intent::classify(answer.clone()), Intent::Answer(answer));

        let empty_calls = ChatMessage {
            tool_calls: Some(vec![]),
            ..ChatMessage::assistant("still an answer")
        };
        assert!(matches!(Intent::classify(empty_calls), Intent::Answer(_)));

        let call = ToolCall::new("c1", "check_market_prices", "{}");
        let invoke = ChatMessage::assistant_tool_calls(vec![call.clone()]);
        match Intent::classify(invoke) {
            Intent::Invoke { calls, .. } => assert_eq!(calls, vec![call]),
            other => panic!("expected Invoke, got {other:?}"),
        }
    }
}
