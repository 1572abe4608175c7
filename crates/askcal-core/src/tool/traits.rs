//! Tool trait definition
//!
//! Defines the core trait for tools the model can call.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::Result;
use crate::tool::ToolDefinition;

/// Tool execution result
///
/// Results are made of text fragments; the bridge joins them with newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Text fragments returned by the tool
    pub parts: Vec<String>,
    /// Whether the tool reported a failure
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            parts: vec![output.into()],
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(output: impl Into<String>) -> Self {
        Self {
            parts: vec![output.into()],
            is_error: true,
        }
    }

    /// Create a successful result from several text fragments
    pub fn from_parts(parts: Vec<String>) -> Self {
        Self {
            parts,
            is_error: false,
        }
    }

    /// All fragments, newline-joined
    pub fn text(&self) -> String {
        self.parts.join("\n")
    }
}

/// A callable tool
///
/// Business failures (bad arguments, store rejections) are reported as
/// [`ToolResult::error`]. An `Err` is reserved for failures to reach the
/// tool host itself, which abort the conversation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name (used in function-calling definitions)
    fn name(&self) -> &str;

    /// Get the tool description (shown to the model when selecting tools)
    fn description(&self) -> &str;

    /// Get the JSON schema for the tool's input parameters
    fn input_schema(&self) -> JsonValue;

    /// Execute the tool with the given input object
    async fn execute(&self, input: JsonValue) -> Result<ToolResult>;

    /// Describe this tool for the catalog
    fn definition(&self) -> ToolDefinition {
        let description = self.description();
        ToolDefinition {
            name: self.name().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            parameter_schema: self.input_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_text_joins_parts() {
        let result = ToolResult::from_parts(vec!["first".into(), "second".into()]);
        assert_eq!(result.text(), "first\nsecond");
        assert!(!result.is_error);
    }

    #[test]
    fn test_tool_result_error() {
        let result = ToolResult::error("boom");
        assert_eq!(result.text(), "boom");
        assert!(result.is_error);
    }
}
