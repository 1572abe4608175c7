//! Tool catalog types and the function-calling adapter

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

/// Description used when a tool host declares none
pub const MISSING_DESCRIPTION: &str = "No description provided";

/// A tool as declared by a tool host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub parameter_schema: JsonValue,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        parameter_schema: JsonValue,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            parameter_schema,
        }
    }
}

/// Function-calling tool entry understood by the model backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionSpecBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpecBody {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

impl FunctionSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: JsonValue,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionSpecBody {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

impl From<&ToolDefinition> for FunctionSpec {
    fn from(tool: &ToolDefinition) -> Self {
        let description = tool
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(MISSING_DESCRIPTION);

        // Backends reject a missing schema; an empty object schema is equivalent.
        let parameters = if tool.parameter_schema.is_object() {
            tool.parameter_schema.clone()
        } else {
            json!({"type": "object", "properties": {}})
        };

        Self::new(tool.name.clone(), description, parameters)
    }
}

/// Translate tool host declarations into function-calling specs, preserving order
pub fn adapt(tools: &[ToolDefinition]) -> Vec<FunctionSpec> {
    tools.iter().map(FunctionSpec::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_preserves_fields_and_order() {
        let schema = json!({
            "type": "object",
            "properties": {"title": {"type": "string"}},
            "required": ["title"]
        });
        let tools = vec![
            ToolDefinition::new("createEvent", Some("Creates an event".into()), schema.clone()),
            ToolDefinition::new(
                "listEvents",
                Some("Lists events".into()),
                json!({"type": "object"}),
            ),
        ];

        let specs = adapt(&tools);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].tool_type, "function");
        assert_eq!(specs[0].function.name, "createEvent");
        assert_eq!(specs[0].function.description, "Creates an event");
        assert_eq!(specs[0].function.parameters, schema);
        assert_eq!(specs[1].function.name, "listEvents");
    }

    #[test]
    fn test_adapt_missing_description_uses_placeholder() {
        let tools = vec![
            ToolDefinition::new("a", None, json!({"type": "object"})),
            ToolDefinition::new("b", Some("   ".into()), json!({"type": "object"})),
        ];
        let specs = adapt(&tools);
        assert_eq!(specs[0].function.description, MISSING_DESCRIPTION);
        assert_eq!(specs[1].function.description, MISSING_DESCRIPTION);
    }

    #[test]
    fn test_adapt_non_object_schema() {
        let specs = adapt(&[ToolDefinition::new("a", None, JsonValue::Null)]);
        assert_eq!(specs[0].function.parameters["type"], "object");
    }

    #[test]
    fn test_function_spec_wire_shape() {
        let spec = FunctionSpec::new("listEvents", "List", json!({"type": "object"}));
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "function",
                "function": {
                    "name": "listEvents",
                    "description": "List",
                    "parameters": {"type": "object"}
                }
            })
        );
    }
}
