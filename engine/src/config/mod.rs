//! Configuration management
//!
//! This module handles loading, validation, and management of the DeepDive
//! configuration. Configuration is stored in TOML format at
//! ~/.deepdive/config.toml and created with defaults on first use.
//!
//! # Configuration Sections
//!
//! - **core**: log level, data directory
//! - **llm**: default provider and per-provider endpoint/model/timeout
//! - **research**: default depth tier, generation parameters, memory bounds
//!
//! # Examples
//!
//! ```no_run
//! use deepdive_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Default provider: {}", config.llm.default_provider);
//! println!("Default depth: {}", config.research.default_depth);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Provider identifiers understood by the provider registry.
pub const KNOWN_PROVIDERS: [&str; 4] = ["ollama", "openai", "anthropic", "gemini"];

/// Upper bound on simultaneously active memory contexts.
pub const MAX_ACTIVE_MEMORIES: usize = 5;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// LLM provider configuration
    pub llm: LLMConfig,

    /// Research run defaults
    #[serde(default)]
    pub research: ResearchConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (ollama, openai, anthropic, gemini)
    pub default_provider: String,

    #[serde(default = "ProviderConfig::ollama")]
    pub ollama: ProviderConfig,

    #[serde(default = "ProviderConfig::openai")]
    pub openai: ProviderConfig,

    #[serde(default = "ProviderConfig::anthropic")]
    pub anthropic: ProviderConfig,

    #[serde(default = "ProviderConfig::gemini")]
    pub gemini: ProviderConfig,
}

/// Endpoint settings for one provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Base URL for the provider API
    pub base_url: String,

    /// Model used when a request does not name one
    pub model: String,

    /// HTTP timeout enforced by the provider client.
    /// The research engine itself never times out a pass.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn ollama() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn openai() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn anthropic() -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn gemini() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-pro".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LLMConfig {
    /// Settings for a provider id, if the id is known.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "ollama" => Some(&self.ollama),
            "openai" => Some(&self.openai),
            "anthropic" => Some(&self.anthropic),
            "gemini" => Some(&self.gemini),
            _ => None,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: "ollama".to_string(),
            ollama: ProviderConfig::ollama(),
            openai: ProviderConfig::openai(),
            anthropic: ProviderConfig::anthropic(),
            gemini: ProviderConfig::gemini(),
        }
    }
}

/// Defaults applied to research requests built by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Depth tier used when none is given (quick, standard, deep, exhaustive)
    #[serde(default = "default_depth")]
    pub default_depth: String,

    /// Token ceiling for each generation call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature in [0, 2]
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// How many memory contexts may be active at once (1..=5)
    #[serde(default = "default_max_active_memories")]
    pub max_active_memories: usize,

    /// Session that history and memory are scoped to
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Number of results shown by `deepdive history`
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_active_memories: default_max_active_memories(),
            session_id: default_session_id(),
            history_limit: default_history_limit(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.deepdive")
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_depth() -> String {
    "standard".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_active_memories() -> usize {
    MAX_ACTIVE_MEMORIES
}

fn default_session_id() -> String {
    "default".to_string()
}

fn default_history_limit() -> usize {
    20
}

impl Config {
    /// Load configuration from the default location (~/.deepdive/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save it to `path`
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();

        // Serialize before processing so the file keeps the portable ~ form
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.deepdive/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".deepdive").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
            },
            llm: LLMConfig::default(),
            research: ResearchConfig::default(),
        }
    }

    /// Path of the SQLite database holding history and memory
    pub fn db_path(&self) -> PathBuf {
        self.core.data_dir.join("deepdive.db")
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates log level, provider and research parameters
    /// - Expands ~ in the data directory and creates it if missing
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !KNOWN_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.research.max_tokens == 0 {
            return Err(EngineError::Config(
                "research.max_tokens must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.research.temperature) {
            return Err(EngineError::Config(
                "research.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if !(1..=MAX_ACTIVE_MEMORIES).contains(&self.research.max_active_memories) {
            return Err(EngineError::Config(format!(
                "research.max_active_memories must be between 1 and {}",
                MAX_ACTIVE_MEMORIES
            )));
        }

        if self.research.session_id.trim().is_empty() {
            return Err(EngineError::Config(
                "research.session_id must not be empty".to_string(),
            ));
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
