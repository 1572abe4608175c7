//! MCP Client implementation
//!
//! Talks to an MCP server running as a child process.

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, RawContent, Tool},
    service::{RoleClient, RunningService, ServiceExt},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::Value as JsonValue;
use tokio::process::Command;

use askcal_core::{Error, Result, ToolDefinition};

use crate::config::McpServerConfig;

/// Tool advertised by a tool host
#[derive(Debug, Clone, PartialEq)]
pub struct McpTool {
    pub name: String,
    pub description: Option<String>,
    /// JSON schema for input parameters
    pub input_schema: JsonValue,
}

impl McpTool {
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameter_schema: self.input_schema.clone(),
        }
    }
}

impl From<Tool> for McpTool {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool
                .description
                .map(|d| d.to_string())
                .filter(|d| !d.is_empty()),
            input_schema: serde_json::to_value(&tool.input_schema).unwrap_or(JsonValue::Null),
        }
    }
}

/// Result of one tool call on the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Text content fragments, in order
    pub parts: Vec<String>,
    /// The tool itself reported a failure
    pub is_error: bool,
}

/// A connection able to run tools
///
/// `Err` means the host could not be reached; a tool that ran and failed
/// comes back as [`ToolOutput`] with `is_error` set.
#[async_trait]
pub trait ToolHost: Send + Sync {
    fn server_name(&self) -> &str;

    async fn call_tool(&self, name: &str, args: JsonValue) -> Result<ToolOutput>;
}

/// MCP Client for communicating with MCP servers
pub struct McpClient {
    service: RunningService<RoleClient, ()>,
    server_name: String,
}

impl McpClient {
    /// Start the configured server and complete the MCP handshake
    pub async fn connect(config: &McpServerConfig) -> Result<Self> {
        let mut parts = config.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(Error::Config(format!(
                "Empty command for MCP server {}",
                config.name
            )));
        };
        let args: Vec<&str> = parts.chain(config.args.iter().map(String::as_str)).collect();

        let transport = TokioChildProcess::new(Command::new(program).configure(|c| {
            c.args(&args);
            c.envs(&config.env);
        }))
        .map_err(|e| Error::ToolHost(format!("Failed to create transport: {}", e)))?;

        // Unit handler: client-only mode
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Error::ToolHost(format!("Failed to connect: {}", e)))?;

        let server_name = service
            .peer_info()
            .map(|info| info.server_info.name.to_string())
            .unwrap_or_else(|| config.name.clone());

        Ok(Self {
            service,
            server_name,
        })
    }

    /// List available tools from the MCP server
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let result = self
            .service
            .list_tools(Default::default())
            .await
            .map_err(|e| Error::ToolHost(format!("Failed to list tools: {}", e)))?;

        Ok(result.tools.into_iter().map(McpTool::from).collect())
    }

    /// Gracefully close the connection
    pub async fn shutdown(self) -> Result<()> {
        self.service
            .cancel()
            .await
            .map_err(|e| Error::ToolHost(format!("Shutdown failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ToolHost for McpClient {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    async fn call_tool(&self, name: &str, args: JsonValue) -> Result<ToolOutput> {
        let result = self
            .service
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_string().into(),
                arguments: args.as_object().cloned(),
                task: None,
            })
            .await
            .map_err(|e| Error::ToolHost(format!("Tool call failed: {}", e)))?;

        let parts = result
            .content
            .into_iter()
            .filter_map(|c| match c.raw {
                RawContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect();

        Ok(ToolOutput {
            parts,
            is_error: result.is_error.unwrap_or(false),
        })
    }
}
