use super::error::{ToolError, ToolResult};
use super::native::{BestValueTool, MarketPricesTool, TechnicalSpecsTool};
use super::traits::Tool;
use crate::data::GpuDataProvider;
use crate::llm::ToolDefinition;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Immutable set of tools, in presentation order.
///
/// Built once at startup and shared behind an `Arc`; lookups never lock.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

/// Collects tools before freezing them into a `ToolRegistry`
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    /// Add a tool; a later tool with the same name replaces the earlier one in place
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        let name = tool.name();
        match self.tools.iter().position(|t| t.name() == name) {
            Some(pos) => {
                warn!(target: "tool_registry", tool = %name, "Replacing tool with duplicate name");
                self.tools[pos] = tool;
            }
            None => {
                info!(target: "tool_registry", tool = %name, "Registering tool");
                self.tools.push(tool);
            }
        }
        self
    }

    pub fn build(self) -> ToolRegistry {
        let index = self
            .tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name(), i))
            .collect();
        ToolRegistry {
            tools: self.tools,
            index,
        }
    }
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// The three dataset tools backed by `provider`
    pub fn gpu_tools(provider: Arc<dyn GpuDataProvider>) -> Self {
        Self::builder()
            .register(Arc::new(TechnicalSpecsTool::new(provider.clone())))
            .register(Arc::new(BestValueTool::new(provider.clone())))
            .register(Arc::new(MarketPricesTool::new(provider)))
            .build()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function descriptors for the model, in registration order
    pub fn describe(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition::function(t.name(), t.description(), t.parameters()))
            .collect()
    }

    /// Call a tool by name
    #[tracing::instrument(skip(self, arguments), fields(tool.name = %name))]
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> ToolResult<serde_json::Value> {
        let start_time = std::time::Instant::now();

        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!(target: "tool_registry", tool = %name, "Invoking tool");
        let result = tool.call(arguments).await;

        let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(_) => {
                debug!(target: "tool_registry", tool = %name, latency_ms = %elapsed_ms, "Tool finished");
            }
            Err(e) => {
                warn!(target: "tool_registry", tool = %name, error = %e, latency_ms = %elapsed_ms, "Tool execution failed");
            }
        }

        result
    }
}
