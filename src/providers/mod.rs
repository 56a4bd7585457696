//! AI provider integrations

mod gemini;
mod sse;

#[cfg(test)]
pub mod scripted;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::config::Config;
use crate::conversation::Turn;

pub use gemini::{GeminiConfig, GeminiProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No response within {0:?}")]
    Timeout(Duration),
}

/// Reply text as delivered by the backend, chunk by chunk
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// One generation call: everything said so far plus the new user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub history: Vec<Turn>,
    pub new_message: String,
}

/// A model backend able to stream a reply.
///
/// `open` resolves once the backend has accepted the request; failures after
/// that arrive as `Err` items on the returned stream.
#[async_trait]
pub trait ReplyBackend: Send + Sync {
    async fn open(&self, request: ReplyRequest) -> Result<FragmentStream, ProviderError>;
}

pub enum Provider {
    Gemini(GeminiProvider),
}

impl Provider {
    pub fn from_name(name: &str, config: &Config) -> Result<Self, ProviderError> {
        match name.to_lowercase().as_str() {
            "gemini" | "google" => {
                let api_key = config
                    .api_key
                    .clone()
                    .ok_or_else(|| ProviderError::NotConfigured("gemini: missing API key".into()))?;

                let mut gemini = GeminiConfig::new(api_key, config.model.clone());
                if let Some(endpoint) = &config.endpoint {
                    gemini.endpoint = endpoint.trim_end_matches('/').to_string();
                }
                Ok(Provider::Gemini(GeminiProvider::new(gemini)?))
            }
            _ => Err(ProviderError::UnknownProvider(name.to_string())),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        Self::from_name(&config.provider, config)
    }
}

#[async_trait]
impl ReplyBackend for Provider {
    async fn open(&self, request: ReplyRequest) -> Result<FragmentStream, ProviderError> {
        match self {
            Provider::Gemini(p) => p.open(request).await,
        }
    }
}
