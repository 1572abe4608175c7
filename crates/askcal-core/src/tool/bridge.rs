//! Tool execution bridge
//!
//! Turns a model tool call into the text of the answering `tool` message.

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::llm::ToolCall;
use crate::tool::{ToolDefinition, ToolManager};
use crate::{Error, Result};

/// Executes model tool calls against a [`ToolManager`]
///
/// Only tool-host transport failures are returned as `Err`; everything else
/// (malformed arguments, unknown tools, handler failures) becomes text the
/// model can react to.
#[derive(Clone)]
pub struct ToolBridge {
    tools: Arc<ToolManager>,
}

impl ToolBridge {
    pub fn new(tools: Arc<ToolManager>) -> Self {
        Self { tools }
    }

    /// Catalog of the tools this bridge can dispatch to
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// Execute one tool call and return the tool-message text
    pub async fn execute(&self, call: &ToolCall) -> Result<String> {
        let input = parse_arguments(&call.name, &call.arguments_raw);

        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool_name = %call.name, "Model requested an unknown tool");
            return Ok(format!("Unknown tool: {}", call.name));
        };

        debug!(tool_name = %call.name, input = %input, "Executing tool");

        match tool.execute(input).await {
            Ok(result) => {
                if result.is_error {
                    warn!(tool_name = %call.name, "Tool reported a failure");
                }
                Ok(result.text())
            }
            Err(e @ Error::ToolHost(_)) => Err(e),
            Err(e) => {
                warn!(tool_name = %call.name, error = %e, "Tool execution failed");
                Ok(format!("Tool {} failed: {}", call.name, e))
            }
        }
    }
}

/// Parse raw tool arguments into a JSON object
///
/// Anything that is not a JSON object becomes an empty object; the tool
/// decides whether that is enough.
pub fn parse_arguments(tool_name: &str, raw: &str) -> JsonValue {
    if raw.trim().is_empty() {
        return JsonValue::Object(Map::new());
    }

    match serde_json::from_str::<JsonValue>(raw) {
        Ok(value @ JsonValue::Object(_)) => value,
        Ok(other) => {
            warn!(tool_name, arguments = %other, "Tool arguments are not an object, using {{}}");
            JsonValue::Object(Map::new())
        }
        Err(e) => {
            warn!(tool_name, error = %e, "Malformed tool arguments, using {{}}");
            JsonValue::Object(Map::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Tool, ToolResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every input it receives
    #[derive(Default)]
    struct RecordingTool {
        inputs: Mutex<Vec<JsonValue>>,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            "record"
        }

        fn description(&self) -> &str {
            "Records input"
        }

        fn input_schema(&self) -> JsonValue {
            json!({"type": "object"})
        }

        async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
            self.inputs.lock().unwrap().push(input);
            Ok(ToolResult::from_parts(vec!["line one".into(), "line two".into()]))
        }
    }

    struct FailingTool(fn() -> Error);

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "fail"
        }

        fn description(&self) -> &str {
            ""
        }

        fn input_schema(&self) -> JsonValue {
            json!({"type": "object"})
        }

        async fn execute(&self, _input: JsonValue) -> Result<ToolResult> {
            Err((self.0)())
        }
    }

    fn bridge_with(tool: Arc<dyn Tool>) -> ToolBridge {
        let mut manager = ToolManager::new();
        manager.register(tool);
        ToolBridge::new(Arc::new(manager))
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments("t", r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_arguments("t", ""), json!({}));
        assert_eq!(parse_arguments("t", "{invalid"), json!({}));
        assert_eq!(parse_arguments("t", "[1,2]"), json!({}));
        assert_eq!(parse_arguments("t", "null"), json!({}));
    }

    #[tokio::test]
    async fn test_malformed_arguments_still_execute() {
        let tool = Arc::new(RecordingTool::default());
        let bridge = bridge_with(tool.clone());

        let text = bridge
            .execute(&ToolCall::new("call_1", "record", "{invalid"))
            .await
            .unwrap();

        assert_eq!(text, "line one\nline two");
        assert_eq!(*tool.inputs.lock().unwrap(), vec![json!({})]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_text() {
        let bridge = ToolBridge::new(Arc::new(ToolManager::new()));
        let text = bridge
            .execute(&ToolCall::new("call_1", "nope", "{}"))
            .await
            .unwrap();
        assert_eq!(text, "Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_tool_error_is_text() {
        let bridge = bridge_with(Arc::new(FailingTool(|| {
            Error::ToolExecution("missing title".into())
        })));
        let text = bridge
            .execute(&ToolCall::new("call_1", "fail", "{}"))
            .await
            .unwrap();
        assert_eq!(text, "Tool fail failed: Tool execution error: missing title");
    }

    #[tokio::test]
    async fn test_tool_host_failure_propagates() {
        let bridge = bridge_with(Arc::new(FailingTool(|| {
            Error::ToolHost("connection refused".into())
        })));
        let result = bridge.execute(&ToolCall::new("call_1", "fail", "{}")).await;
        assert!(matches!(result, Err(Error::ToolHost(_))));
    }
}
