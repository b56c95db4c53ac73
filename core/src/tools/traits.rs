use super::error::ToolResult;
use async_trait::async_trait;
use serde_json::Value;

/// A named capability the model may invoke
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name the model calls the tool by (e.g., "get_gpu_technical_specs")
    fn name(&self) -> String;

    /// A human-readable description of what the tool does
    fn description(&self) -> String;

    /// The JSON Schema for the tool's arguments
    fn parameters(&self) -> Value;

    /// Execute the tool with already-parsed arguments
    async fn call(&self, arguments: Value) -> ToolResult<Value>;
}
