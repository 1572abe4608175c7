//! Configuration management
//!
//! Configuration is resolved in this order:
//! 1. Environment variables
//! 2. `askcal.toml` configuration file
//! 3. Defaults
//!
//! `${VAR_NAME}` references inside the configuration file are expanded from
//! the environment before the file is parsed.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key (optional, proxies often accept unauthenticated requests)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the chat-completion endpoint
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Conversation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum number of tool-execution rounds per conversation
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Timezone announced to the model alongside the current date
    #[serde(default = "default_timezone")]
    pub default_timezone: Tz,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            default_timezone: default_timezone(),
        }
    }
}

/// CalDAV calendar store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalDavConfig {
    /// CalDAV server URL
    #[serde(default = "default_caldav_url")]
    pub server_url: String,

    /// Username for basic authentication
    #[serde(default)]
    pub username: String,

    /// Password for basic authentication
    #[serde(default)]
    pub password: String,

    /// Domain appended to generated event UIDs
    #[serde(default = "default_uid_domain")]
    pub uid_domain: String,

    /// Request timeout in seconds
    #[serde(default = "default_caldav_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CalDavConfig {
    fn default() -> Self {
        Self {
            server_url: default_caldav_url(),
            username: String::new(),
            password: String::new(),
            uid_domain: default_uid_domain(),
            timeout_secs: default_caldav_timeout_secs(),
        }
    }
}

/// MCP tool host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Path to MCP server list (JSON or TOML)
    pub config_path: Option<String>,

    /// Whether MCP integration is enabled
    #[serde(default = "default_mcp_enabled")]
    pub enabled: bool,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            enabled: default_mcp_enabled(),
        }
    }
}

/// Main configuration for askcal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub caldav: CalDavConfig,

    #[serde(default)]
    pub mcp: McpConfig,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_max_rounds() -> usize {
    5
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Helsinki
}

fn default_caldav_url() -> String {
    "http://localhost:5232/".to_string()
}

fn default_uid_domain() -> String {
    "askcal.local".to_string()
}

fn default_caldav_timeout_secs() -> u64 {
    30
}

fn default_mcp_enabled() -> bool {
    true
}

impl Config {
    /// Expand `${VAR_NAME}` references with environment values.
    ///
    /// Missing variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Strip one pair of matching wrapping quotes (`'...'` or `"..."`).
    ///
    /// `.env` files written for other tooling often quote URLs.
    pub fn strip_wrapping_quotes(value: &str) -> String {
        let s = value.trim();
        let quoted = s.len() >= 2
            && ((s.starts_with('\'') && s.ends_with('\''))
                || (s.starts_with('"') && s.ends_with('"')));
        if quoted {
            s[1..s.len() - 1].to_string()
        } else {
            s.to_string()
        }
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Parse configuration from TOML text (after `${VAR}` expansion)
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Self::from_toml_config(toml)
    }

    /// Load from `./askcal.toml` if present, otherwise from the environment only
    pub fn load() -> crate::Result<Self> {
        if Path::new("askcal.toml").exists() {
            return Self::from_toml_file("askcal.toml");
        }

        Self::from_env()
    }

    /// Load configuration from environment variables over defaults
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn from_toml_config(toml: TomlConfig) -> crate::Result<Self> {
        let llm = toml.llm.unwrap_or_default();
        let llm_config = LlmConfig {
            api_key: llm.api_key.filter(|k| !k.is_empty()),
            model: llm.model.unwrap_or_else(default_model),
            base_url: llm.base_url.unwrap_or_else(default_llm_base_url),
            timeout_secs: llm.timeout_secs.unwrap_or_else(default_llm_timeout_secs),
        };

        let conversation = toml.conversation.unwrap_or_default();
        let conversation_config = ConversationConfig {
            max_rounds: conversation.max_rounds.unwrap_or_else(default_max_rounds),
            default_timezone: match conversation.default_timezone {
                Some(tz) => parse_timezone(&tz)?,
                None => default_timezone(),
            },
        };

        let caldav = toml.caldav.unwrap_or_default();
        let caldav_config = CalDavConfig {
            server_url: caldav.server_url.unwrap_or_else(default_caldav_url),
            username: caldav.username.unwrap_or_default(),
            password: caldav.password.unwrap_or_default(),
            uid_domain: caldav.uid_domain.unwrap_or_else(default_uid_domain),
            timeout_secs: caldav.timeout_secs.unwrap_or_else(default_caldav_timeout_secs),
        };

        let mcp = toml.mcp.unwrap_or_default();
        let mcp_config = McpConfig {
            config_path: mcp.config_path,
            enabled: mcp.enabled.unwrap_or_else(default_mcp_enabled),
        };

        Ok(Config {
            llm: llm_config,
            conversation: conversation_config,
            caldav: caldav_config,
            mcp: mcp_config,
        })
    }

    /// Override settings with environment variables (environment wins)
    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        if let Some(key) = env_value("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = env_value("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = env_value("LLM_BASE_URL").or_else(|| env_value("OPENAI_PROXY_URL")) {
            self.llm.base_url = url;
        }
        if let Some(secs) = env_value("LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_number("LLM_TIMEOUT_SECS", &secs)?;
        }

        if let Some(rounds) = env_value("MAX_ROUNDS") {
            self.conversation.max_rounds = parse_number("MAX_ROUNDS", &rounds)?;
        }
        if let Some(tz) = env_value("DEFAULT_TIMEZONE") {
            self.conversation.default_timezone = parse_timezone(&tz)?;
        }

        if let Some(url) = env_value("CALDAV_SERVER_URL") {
            self.caldav.server_url = url;
        }
        if let Some(username) = env_value("CALDAV_USERNAME") {
            self.caldav.username = username;
        }
        if let Some(password) = env_value("CALDAV_PASSWORD") {
            self.caldav.password = password;
        }
        if let Some(domain) = env_value("CALDAV_UID_DOMAIN") {
            self.caldav.uid_domain = domain;
        }
        if let Some(secs) = env_value("CALDAV_TIMEOUT_SECS") {
            self.caldav.timeout_secs = parse_number("CALDAV_TIMEOUT_SECS", &secs)?;
        }

        if let Some(path) = env_value("MCP_CONFIG_PATH") {
            self.mcp.config_path = Some(path);
        }
        if let Some(enabled) = env_value("MCP_ENABLED") {
            self.mcp.enabled = enabled.to_lowercase() != "false";
        }

        Ok(())
    }
}

/// Read a non-empty environment variable with wrapping quotes removed
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| Config::strip_wrapping_quotes(&v))
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> crate::Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", name, value)))
}

fn parse_timezone(value: &str) -> crate::Result<Tz> {
    value
        .parse::<Tz>()
        .map_err(|_| Error::Config(format!("Unknown IANA timezone: {}", value)))
}

// ============================================================================
// TOML file structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    llm: Option<TomlLlmConfig>,
    conversation: Option<TomlConversationConfig>,
    caldav: Option<TomlCalDavConfig>,
    mcp: Option<TomlMcpConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLlmConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlConversationConfig {
    #[serde(default)]
    max_rounds: Option<usize>,
    #[serde(default)]
    default_timezone: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlCalDavConfig {
    #[serde(default)]
    server_url: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    uid_domain: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlMcpConfig {
    config_path: Option<String>,
    enabled: Option<bool>,
}
