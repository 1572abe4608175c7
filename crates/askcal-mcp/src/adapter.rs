//! MCP Tool Adapter
//!
//! Exposes one tool of a tool host through the core `Tool` trait.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

use askcal_core::{Result, Tool, ToolResult};

use crate::client::{McpTool, ToolHost};

/// Adapter to make MCP tools compatible with the core Tool trait
pub struct McpToolAdapter {
    host: Arc<dyn ToolHost>,
    tool: McpTool,
}

impl McpToolAdapter {
    pub fn new(host: Arc<dyn ToolHost>, tool: McpTool) -> Self {
        Self { host, tool }
    }

    /// Name of the server the tool lives on
    pub fn server_name(&self) -> &str {
        self.host.server_name()
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn description(&self) -> &str {
        self.tool.description.as_deref().unwrap_or("")
    }

    fn input_schema(&self) -> JsonValue {
        self.tool.input_schema.clone()
    }

    /// Host transport failures propagate as `Err` and end the conversation
    async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
        debug!(
            server_name = self.server_name(),
            tool_name = %self.tool.name,
            "Calling MCP tool"
        );

        let output = self.host.call_tool(&self.tool.name, input).await?;
        let mut result = ToolResult::from_parts(output.parts);
        result.is_error = output.is_error;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ToolOutput;
    use askcal_core::llm::ToolCall;
    use askcal_core::{Error, ToolBridge, ToolManager};
    use serde_json::json;
    use std::sync::Mutex;

    /// Host that replays a fixed reply and records calls
    struct StubHost {
        reply: fn() -> Result<ToolOutput>,
        calls: Mutex<Vec<(String, JsonValue)>>,
    }

    impl StubHost {
        fn new(reply: fn() -> Result<ToolOutput>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ToolHost for StubHost {
        fn server_name(&self) -> &str {
            "stub"
        }

        async fn call_tool(&self, name: &str, args: JsonValue) -> Result<ToolOutput> {
            self.calls.lock().unwrap().push((name.to_string(), args));
            (self.reply)()
        }
    }

    fn list_events_tool() -> McpTool {
        McpTool {
            name: "listEvents".to_string(),
            description: Some("List events".to_string()),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    #[tokio::test]
    async fn test_multi_part_result() {
        let host = StubHost::new(|| {
            Ok(ToolOutput {
                parts: vec!["first".to_string(), "second".to_string()],
                is_error: false,
            })
        });
        let adapter = McpToolAdapter::new(host.clone(), list_events_tool());

        let result = adapter.execute(json!({"limit": 3})).await.unwrap();

        assert!(!result.is_error);
        assert_eq!(result.text(), "first\nsecond");
        assert_eq!(
            *host.calls.lock().unwrap(),
            vec![("listEvents".to_string(), json!({"limit": 3}))]
        );
    }

    #[tokio::test]
    async fn test_tool_reported_error() {
        let host = StubHost::new(|| {
            Ok(ToolOutput {
                parts: vec!["Failed to list events: No calendars found".to_string()],
                is_error: true,
            })
        });
        let adapter = McpToolAdapter::new(host, list_events_tool());

        let result = adapter.execute(json!({})).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.text(), "Failed to list events: No calendars found");
    }

    #[tokio::test]
    async fn test_host_failure_reaches_bridge_as_error() {
        let host = StubHost::new(|| Err(Error::ToolHost("broken pipe".to_string())));
        let mut manager = ToolManager::new();
        manager.register(Arc::new(McpToolAdapter::new(host, list_events_tool())));
        let bridge = ToolBridge::new(Arc::new(manager));

        let result = bridge
            .execute(&ToolCall::new("call_1", "listEvents", "{}"))
            .await;
        assert!(matches!(result, Err(Error::ToolHost(_))));
    }

    #[test]
    fn test_definition_passthrough() {
        let host = StubHost::new(|| Ok(ToolOutput::default()));
        let adapter = McpToolAdapter::new(host, list_events_tool());
        let definition = adapter.definition();
        assert_eq!(definition.name, "listEvents");
        assert_eq!(definition.description.as_deref(), Some("List events"));
        assert_eq!(adapter.server_name(), "stub");
    }
}
