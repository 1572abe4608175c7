//! MCP server list
//!
//! Loaded from the file named by `MCP_CONFIG_PATH`; `.toml` files are read
//! as TOML, anything else as JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use askcal_core::{Error, Result};

/// MCP Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Server name (used for identification)
    pub name: String,

    /// Command to start the MCP server
    /// Example: "npx -y @acme/calendar-mcp"
    pub command: String,

    /// Extra arguments appended to the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables to pass to the server
    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            command: String::new(),
            args: Vec::new(),
            env: HashMap::new(),
            enabled: true,
        }
    }
}

/// All configured MCP servers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpServers {
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
}

impl McpServers {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid MCP config JSON: {}", e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid MCP config TOML: {}", e)))
    }

    /// Load from a JSON or TOML file, chosen by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read MCP config: {}", e)))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Get only enabled servers
    pub fn enabled_servers(&self) -> Vec<&McpServerConfig> {
        self.servers.iter().filter(|s| s.enabled).collect()
    }
}
