//! askcal: natural-language calendar assistant
//!
//! Usage:
//!   askcal <prompt...>   - Run one conversation for the prompt
//!   askcal               - Read prompts line by line from stdin
//!   askcal --help        - Show help

mod cli;

use std::sync::Arc;

use askcal_calendar::{CalendarStore, register_calendar_tools};
use askcal_core::{ChatBackend, Config, LlmClient, Orchestrator, ToolBridge, ToolManager};
use askcal_mcp::initialize_mcp_tools;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// One prompt from the command line
    Prompt(String),
    /// Prompts from stdin, one per line
    Stdin,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1));

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("askcal {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Logs go to stderr so answers on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting askcal...");
    tracing::info!("Model: {}", config.llm.model);

    let llm_client = LlmClient::new(&config.llm)
        .map_err(|e| anyhow::anyhow!("Failed to create LLM client: {}", e))?;
    tracing::info!("Model endpoint: {}", llm_client.endpoint());
    let backend: Arc<dyn ChatBackend> = Arc::new(llm_client);

    let mut tool_manager = ToolManager::new();
    let store = Arc::new(CalendarStore::new(config.caldav.clone()));
    register_calendar_tools(&mut tool_manager, store);
    tracing::info!(
        "Registered {} calendar tools: {:?}",
        tool_manager.len(),
        tool_manager.tool_names()
    );

    let mcp_registry = match initialize_mcp_tools(&config.mcp, &mut tool_manager).await {
        Ok(registry) => registry,
        Err(e) => {
            tracing::warn!("MCP initialization failed: {}", e);
            None
        }
    };

    tracing::info!("Total {} tools registered", tool_manager.len());

    let bridge = ToolBridge::new(Arc::new(tool_manager));
    let orchestrator = Orchestrator::new(backend, bridge, &config.conversation);

    let result = match mode {
        RunMode::Prompt(prompt) => cli::run_prompt(&orchestrator, &prompt).await,
        RunMode::Stdin => cli::run_stdin(&orchestrator).await,
        RunMode::Help | RunMode::Version => Ok(()),
    };

    if let Some(registry) = mcp_registry {
        if let Err(e) = registry.shutdown().await {
            tracing::warn!("Error during MCP shutdown: {}", e);
        }
    }

    result
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> RunMode
where
    I: IntoIterator<Item = String>,
{
    let mut words = Vec::new();

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-V" => return RunMode::Version,
            _ => words.push(arg),
        }
    }

    let prompt = words.join(" ");
    if prompt.trim().is_empty() {
        RunMode::Stdin
    } else {
        RunMode::Prompt(prompt)
    }
}

/// Print help message
fn print_help() {
    println!("askcal - natural-language calendar assistant");
    println!();
    println!("Usage:");
    println!("  askcal <prompt...>   Run one conversation and print the answer");
    println!("  askcal               Read prompts from stdin, one per line");
    println!("  askcal --help        Show this help message");
    println!("  askcal --version     Show version");
    println!();
    println!("Environment Variables:");
    println!("  LLM_API_KEY          API key for the model backend");
    println!("  LLM_MODEL            Model name (default: gpt-4o-mini)");
    println!("  LLM_BASE_URL         Model endpoint (default: https://api.openai.com/v1)");
    println!("  LLM_TIMEOUT_SECS     Model request timeout (default: 120)");
    println!("  MAX_ROUNDS           Tool-calling round budget (default: 5)");
    println!("  DEFAULT_TIMEZONE     IANA zone for relative dates (default: Europe/Helsinki)");
    println!("  CALDAV_SERVER_URL    CalDAV server (default: http://localhost:5232/)");
    println!("  CALDAV_USERNAME      CalDAV user name");
    println!("  CALDAV_PASSWORD      CalDAV password");
    println!("  MCP_ENABLED          Enable MCP integration (default: true)");
    println!("  MCP_CONFIG_PATH      Path to MCP server list (JSON or TOML)");
}
