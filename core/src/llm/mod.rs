//! LLM module: wire types, HTTP client, and the tool orchestrator
//!
//! This module provides:
//! - Chat Completions types shared by the HTTP surface and the client
//! - `LlmBackend` and its reqwest implementation `LlmClient`
//! - `ToolOrchestrator`, the two-phase tool-calling loop

mod client;
mod tool_orchestrator;
mod types;

pub use client::{LlmBackend, LlmClient, LlmClientConfig};
pub use tool_orchestrator::{
    parse_arguments, FinalAnswer, Intent, OrchestratorOptions, ToolOrchestrator,
};
pub use types::{
    ChatCompletion, ChatMessage, ChatRequest, Choice, FunctionCall, FunctionDefinition, Role,
    ToolCall, ToolChoice, ToolDefinition,
};
