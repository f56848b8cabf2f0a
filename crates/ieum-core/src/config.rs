use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{IeumError, Result};

/// Top-level configuration for the Ieum backend.
///
/// Loaded from `~/.ieum/config.toml` by default. Each section corresponds
/// to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IeumConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl IeumConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: IeumConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| IeumError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// API server port.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.ieum/data".to_string(),
            log_level: "info".to_string(),
            port: 8080,
        }
    }
}

/// Upstream Assistants API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the Assistants API.
    pub base_url: String,
    /// API key. When empty, the key is read from `api_key_env`.
    pub api_key: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Text-to-speech model.
    pub tts_model: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl LlmConfig {
    /// Resolve the API key: explicit value first, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            tts_model: "tts-1".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// Chat exchange settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Deadline for a non-streaming run to complete.
    pub run_timeout_secs: u64,
    /// Days of inactivity after which a conversation thread is replaced.
    pub thread_rotation_days: i64,
    /// Maximum user message length in characters.
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            run_timeout_secs: 30,
            thread_rotation_days: 30,
            max_message_length: 2000,
        }
    }
}

/// Report analysis settings.
///
/// The analysis assistant and its thread are long-lived and provisioned
/// out of band; their identifiers are supplied here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// External id of the assistant configured for report generation.
    pub assistant_id: String,
    /// Thread handle dedicated to report analysis.
    pub thread_id: String,
    /// Deadline for the analysis run to complete.
    pub run_timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            assistant_id: String::new(),
            thread_id: String::new(),
            run_timeout_secs: 60,
        }
    }
}
