//! MCP Registry
//!
//! Connects the configured servers and registers their tools.

use std::sync::Arc;
use tracing::{error, info, warn};

use askcal_core::{McpConfig, Result, Tool, ToolManager};

use crate::client::{McpClient, ToolHost};
use crate::{McpServerConfig, McpServers, McpToolAdapter};

/// Registry for managing all MCP clients
#[derive(Default)]
pub struct McpRegistry {
    clients: Vec<Arc<McpClient>>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn connect_server(config: &McpServerConfig) -> Result<McpClient> {
        info!(
            server_name = %config.name,
            command = %config.command,
            "Connecting to MCP server"
        );

        McpClient::connect(config).await.inspect_err(|e| {
            error!(server_name = %config.name, error = %e, "Failed to connect to MCP server");
        })
    }

    /// Connect every enabled server and register its tools
    ///
    /// A server that cannot be reached or listed is skipped. Returns `None`
    /// when no server ends up connected.
    pub async fn initialize(
        config: &McpServers,
        tool_manager: &mut ToolManager,
    ) -> Result<Option<Self>> {
        let enabled_servers = config.enabled_servers();

        if enabled_servers.is_empty() {
            info!("No MCP servers configured");
            return Ok(None);
        }

        let mut registry = Self::new();
        let mut total_tools = 0;

        for server_config in enabled_servers {
            let client = match Self::connect_server(server_config).await {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    warn!(
                        server_name = %server_config.name,
                        error = %e,
                        "Skipping MCP server due to connection error"
                    );
                    continue;
                }
            };

            let tools = match client.list_tools().await {
                Ok(tools) => tools,
                Err(e) => {
                    warn!(
                        server_name = %server_config.name,
                        error = %e,
                        "Failed to list tools from MCP server"
                    );
                    continue;
                }
            };

            info!(
                server_name = client.server_name(),
                tool_count = tools.len(),
                "Discovered MCP tools"
            );

            for tool in tools {
                if tool_manager.contains(&tool.name) {
                    warn!(tool_name = %tool.name, "MCP tool replaces an existing tool");
                }
                let host: Arc<dyn ToolHost> = client.clone();
                let adapter = McpToolAdapter::new(host, tool);
                info!(
                    server_name = adapter.server_name(),
                    tool_name = adapter.name(),
                    "Registered MCP tool"
                );
                tool_manager.register(Arc::new(adapter));
                total_tools += 1;
            }

            registry.clients.push(client);
        }

        if registry.clients.is_empty() {
            warn!("No MCP servers connected successfully");
            Ok(None)
        } else {
            info!(
                server_count = registry.clients.len(),
                total_tools, "MCP registry initialized"
            );
            Ok(Some(registry))
        }
    }

    /// Gracefully shutdown all MCP clients
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down MCP registry");

        for client in self.clients {
            match Arc::try_unwrap(client) {
                Ok(client) => {
                    if let Err(e) = client.shutdown().await {
                        warn!(error = %e, "Failed to shutdown MCP client");
                    }
                }
                Err(shared) => {
                    warn!(
                        server_name = shared.server_name(),
                        "MCP client still has references, skipping graceful shutdown"
                    );
                }
            }
        }

        Ok(())
    }

    /// Get the number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

/// Register MCP tools according to the core configuration
///
/// Does nothing unless MCP is enabled and a server list path is set.
pub async fn initialize_mcp_tools(
    config: &McpConfig,
    tool_manager: &mut ToolManager,
) -> Result<Option<McpRegistry>> {
    if !config.enabled {
        info!("MCP integration disabled");
        return Ok(None);
    }
    let Some(path) = config.config_path.as_deref() else {
        info!("No MCP configuration file specified, skipping MCP initialization");
        return Ok(None);
    };

    info!(path, "Loading MCP configuration from file");
    let servers = McpServers::from_file(path)?;
    McpRegistry::initialize(&servers, tool_manager).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = McpRegistry::new();
        assert_eq!(registry.client_count(), 0);
    }

    #[tokio::test]
    async fn test_no_servers() {
        let mut manager = ToolManager::new();
        let registry = McpRegistry::initialize(&McpServers::default(), &mut manager)
            .await
            .unwrap();
        assert!(registry.is_none());
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_skipped() {
        let servers = McpServers {
            servers: vec![McpServerConfig {
                name: "ghost".to_string(),
                command: "askcal-test-no-such-mcp-server".to_string(),
                ..McpServerConfig::default()
            }],
        };
        let mut manager = ToolManager::new();

        let registry = McpRegistry::initialize(&servers, &mut manager).await.unwrap();
        assert!(registry.is_none());
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_or_unconfigured() {
        let mut manager = ToolManager::new();

        let disabled = McpConfig {
            config_path: Some("/nonexistent/servers.json".to_string()),
            enabled: false,
        };
        assert!(initialize_mcp_tools(&disabled, &mut manager).await.unwrap().is_none());

        let no_path = McpConfig {
            config_path: None,
            enabled: true,
        };
        assert!(initialize_mcp_tools(&no_path, &mut manager).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let mut manager = ToolManager::new();
        let config = McpConfig {
            config_path: Some("/nonexistent/servers.json".to_string()),
            enabled: true,
        };
        assert!(initialize_mcp_tools(&config, &mut manager).await.is_err());
    }
}
