//! Application configuration

pub mod file;
pub mod prompts;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use file::{ConfigError, FileConfig};

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_REPLY_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    /// 0 disables the timeout
    pub reply_timeout_secs: u64,
}

impl Config {
    /// Build the configuration from `CRETCOM_CONFIG` (if set) and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match env::var("CRETCOM_CONFIG") {
            Ok(path) => {
                let path = PathBuf::from(path);
                tracing::debug!("Loading config from {}", path.display());
                Some(FileConfig::from_file(&path)?)
            }
            Err(_) => None,
        };

        Self::resolve(file, |key| env::var(key).ok())
    }

    /// Merge file settings with variables from `lookup`; variables win.
    pub fn resolve(
        file: Option<FileConfig>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let llm = file.map(|f| f.llm).unwrap_or_default();

        let api_key_env = llm
            .api_key_env
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = lookup(&api_key_env)
            .or_else(|| lookup("API_KEY"))
            .filter(|key| !key.trim().is_empty());

        let reply_timeout_secs = match lookup("CRETCOM_REPLY_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::Validation(format!(
                    "CRETCOM_REPLY_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    raw
                ))
            })?,
            None => llm.reply_timeout_secs.unwrap_or(DEFAULT_REPLY_TIMEOUT_SECS),
        };

        Ok(Self {
            provider: llm
                .provider
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            model: lookup("CRETCOM_MODEL")
                .or(llm.model)
                .unwrap_or_else(|| prompts::DEFAULT_MODEL.to_string()),
            api_key,
            endpoint: lookup("CRETCOM_ENDPOINT").or(llm.endpoint),
            reply_timeout_secs,
        })
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        (self.reply_timeout_secs > 0).then(|| Duration::from_secs(self.reply_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let env = vars(&[]);
        let config = Config::resolve(None, |k| env.get(k).cloned()).unwrap();

        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, prompts::DEFAULT_MODEL);
        assert!(config.api_key.is_none());
        assert_eq!(config.reply_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_api_key_fallback() {
        let env = vars(&[("API_KEY", "legacy")]);
        let config = Config::resolve(None, |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("legacy"));

        let env = vars(&[("API_KEY", "legacy"), ("GEMINI_API_KEY", "primary")]);
        let config = Config::resolve(None, |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileConfig::from_str(
            r#"
[llm]
model = "from-file"
api_key_env = "CUSTOM_KEY"
reply_timeout_secs = 10
"#,
        )
        .unwrap();
        let env = vars(&[
            ("CUSTOM_KEY", "secret"),
            ("CRETCOM_MODEL", "from-env"),
            ("CRETCOM_REPLY_TIMEOUT_SECS", "0"),
        ]);

        let config = Config::resolve(Some(file), |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.model, "from-env");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.reply_timeout(), None);
    }

    #[test]
    fn test_invalid_timeout() {
        let env = vars(&[("CRETCOM_REPLY_TIMEOUT_SECS", "soon")]);
        let err = Config::resolve(None, |k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
