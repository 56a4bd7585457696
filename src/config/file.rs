//! Optional configuration file
//!
//! Settings can be kept in a TOML file pointed to by `CRETCOM_CONFIG`:
//!
//! ```toml
//! [llm]
//! provider = "gemini"
//! model = "gemini-3-flash-preview"
//! api_key_env = "GEMINI_API_KEY"
//! reply_timeout_secs = 60
//! ```
//!
//! Every key is optional; environment variables take precedence.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// LLM provider settings
    #[serde(default)]
    pub llm: LlmConfig,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(model) = &self.llm.model {
            if model.trim().is_empty() {
                return Err(ConfigError::Validation("llm.model must not be empty".into()));
            }
        }
        if let Some(endpoint) = &self.llm.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "llm.endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }
        Ok(())
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name, currently only "gemini"
    #[serde(default)]
    pub provider: Option<String>,

    /// Model identifier
    #[serde(default)]
    pub model: Option<String>,

    /// Name of the environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Custom API endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Seconds to wait for the connection or the next fragment, 0 to wait forever
    #[serde(default)]
    pub reply_timeout_secs: Option<u64>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
