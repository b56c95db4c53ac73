// GPU Analyst Core Library
// Tool-calling orchestration over a GPU hardware and pricing dataset

pub mod conversation;
pub mod data;
pub mod llm;
pub mod prompt;
pub mod tools;

// Export core types
pub use conversation::Conversation;
pub use data::{GpuDataProvider, Record, SqliteGpuStore, ValueMetric};
pub use llm::{
    ChatMessage, FinalAnswer, Intent, LlmBackend, LlmClient, LlmClientConfig, OrchestratorOptions,
    Role, ToolCall, ToolOrchestrator,
};
pub use tools::{ToolError, ToolRegistry, ToolResult};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Data provider error: {0}")]
    DataProviderError(String),

    #[error("Invalid conversation: {0}")]
    InvalidConversation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalystError>;
