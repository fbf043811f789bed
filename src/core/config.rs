//! Configuration management for Cofounder
//!
//! Supports environment variables, config files, and runtime overrides.
//! Absent credentials (project id, search key) are recorded, not rejected:
//! the tools that need them degrade at call time.
//!
//! Config file location: ~/.config/cofounder/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{CofounderError, Result};

/// Main configuration for Cofounder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language model configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Session history store configuration
    #[serde(default)]
    pub history: HistoryConfig,
    /// Web search configuration
    #[serde(default)]
    pub search: SearchConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Agent behavior configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Supported model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Google Gemini via the Generative Language API
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
}

impl std::str::FromStr for ProviderType {
    type Err = CofounderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(CofounderError::config(format!("Unknown provider: {}", other))),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which backend serves the model
    pub provider: ProviderType,
    /// Model identifier
    /// Default: gemini-1.5-flash-001
    pub model: String,
    /// API key for Gemini
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the Generative Language API
    pub base_url: String,
    /// Ollama server address
    pub ollama_host: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature for agent calls
    pub temperature: f32,
}

/// Where session history lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// Cloud Firestore (requires a project id)
    #[default]
    Firestore,
    /// In-process store, lost on restart
    Memory,
}

/// Session history store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub backend: HistoryBackend,
    /// Cloud project that owns the Firestore database
    pub project_id: Option<String>,
    /// Firestore database id
    pub database: String,
    /// Firestore emulator address (host:port); disables auth when set
    pub emulator_host: Option<String>,
    /// Timeout for a single store call in seconds
    pub timeout_secs: u64,
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Serper API key
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Search endpoint
    pub endpoint: String,
    /// Country code sent as `gl`
    pub country: String,
    /// Language code sent as `hl`
    pub language: String,
    /// Results requested per query
    pub num_results: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port (default: 8080)
    pub port: u16,
    /// Bind address
    pub bind: String,
    /// Allowed CORS origins; "*" allows any
    pub allow_origins: Vec<String>,
    /// Serve the bundled web UI at "/"
    pub web_ui: bool,
}

/// How the orchestrator picks a specialist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterKind {
    /// Deterministic routing-hint matching
    #[default]
    Keyword,
    /// Ask the model to pick a specialist
    Llm,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Delegation strategy
    pub router: RouterKind,
    /// Maximum model/tool round trips per agent run
    /// Default: 6
    pub max_turns: usize,
    /// Correction attempts for a malformed response envelope
    /// Default: 1
    pub format_retries: usize,
    /// Number of recent session messages given to agents
    /// Default: 20
    pub history_window: usize,
    /// Whether to show debug output
    pub debug: bool,
}

/// (section, key) pairs whose defaults come from environment variables
const ENV_DERIVED_KEYS: &[(&str, &str)] = &[
    ("llm", "provider"),
    ("llm", "model"),
    ("llm", "ollama_host"),
    ("history", "project_id"),
    ("history", "emulator_host"),
    ("server", "port"),
    ("agent", "debug"),
];

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: env_nonempty("COFOUNDER_PROVIDER")
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            model: env_nonempty("ADK_LLM_MODEL_NAME")
                .unwrap_or_else(|| "gemini-1.5-flash-001".to_string()),
            api_key: env_nonempty("GOOGLE_API_KEY").or_else(|| env_nonempty("GEMINI_API_KEY")),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            ollama_host: env_nonempty("OLLAMA_HOST")
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            timeout_secs: 60,
            temperature: 0.7,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::default(),
            project_id: env_nonempty("GOOGLE_CLOUD_PROJECT")
                .or_else(|| env_nonempty("GCLOUD_PROJECT")),
            database: "(default)".to_string(),
            emulator_host: env_nonempty("FIRESTORE_EMULATOR_HOST"),
            timeout_secs: 10,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: env_nonempty("SERPER_API_KEY"),
            endpoint: "https://google.serper.dev/search".to_string(),
            country: "us".to_string(),
            language: "en".to_string(),
            num_results: 5,
            timeout_secs: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            bind: "0.0.0.0".to_string(),
            allow_origins: vec![
                "http://localhost".to_string(),
                "http://localhost:8080".to_string(),
                "*".to_string(),
            ],
            web_ui: true,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            router: RouterKind::default(),
            max_turns: 6,
            format_retries: 1,
            history_window: 20,
            debug: env_flag("COFOUNDER_DEBUG"),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cofounder")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        match Self::load_from_path(&Self::config_file()) {
            Ok(config) => config,
            Err(CofounderError::Config(msg)) if msg == "Config file not found" => Self::default(),
            Err(e) => {
                log::warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file. Missing sections and keys
    /// fall back to their defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CofounderError::config("Config file not found"));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| CofounderError::config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| CofounderError::config(format!("Failed to parse config: {}", e)))
    }

    /// Write a starter config file to `path`. Settings that default from
    /// the environment are left commented out so the environment still
    /// applies once the file exists. Secrets are never written.
    pub fn init_file(path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| CofounderError::config(format!("Failed to create config dir: {}", e)))?;
        }

        fs::write(path, Self::default_config_toml()?)
            .map_err(|e| CofounderError::config(format!("Failed to write config: {}", e)))
    }

    /// Default configuration as TOML, with environment-derived keys commented out
    pub fn default_config_toml() -> Result<String> {
        let rendered = toml::to_string_pretty(&Config::default())
            .map_err(|e| CofounderError::config(format!("Failed to serialize config: {}", e)))?;

        let mut section = "";
        let mut out = String::with_capacity(rendered.len() + 64);
        for line in rendered.lines() {
            let trimmed = line.trim();
            if let Some(name) = trimmed.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                section = name;
            }
            let key = trimmed.split('=').next().unwrap_or_default().trim();
            if ENV_DERIVED_KEYS.contains(&(section, key)) {
                out.push_str("# ");
            }
            out.push_str(line);
            out.push('\n');
        }
        Ok(out)
    }

    /// Whether live web search is configured
    pub fn search_available(&self) -> bool {
        self.search.api_key.is_some()
    }

    /// Socket address string for the HTTP server
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
