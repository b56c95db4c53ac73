pub mod error;
pub mod native;
pub mod registry;
pub mod traits;

// Re-export common types
pub use error::{ToolError, ToolResult};
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use traits::Tool;
