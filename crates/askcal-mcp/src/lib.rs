//! askcal-mcp: MCP (Model Context Protocol) tool hosts
//!
//! Connects to MCP servers and exposes their tools through the core
//! `Tool` trait.

pub mod adapter;
pub mod client;
pub mod config;
pub mod registry;

pub use adapter::McpToolAdapter;
pub use client::{McpClient, McpTool, ToolHost, ToolOutput};
pub use config::{McpServerConfig, McpServers};
pub use registry::{McpRegistry, initialize_mcp_tools};
