//! Tool system for model-requested function calls
//!
//! Tools are registered by name in a [`ToolManager`]; the [`ToolBridge`]
//! turns a model [`ToolCall`](crate::llm::ToolCall) into tool-message text.

pub mod bridge;
pub mod definition;
pub mod manager;
pub mod traits;

pub use bridge::ToolBridge;
pub use definition::{FunctionSpec, FunctionSpecBody, ToolDefinition, adapt};
pub use manager::ToolManager;
pub use traits::{Tool, ToolResult};
