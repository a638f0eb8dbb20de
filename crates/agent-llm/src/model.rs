//! Model selection from a `provider/model` string.

use crate::openai::DEFAULT_OPENAI_BASE_URL;
use crate::OpenAiChatModel;
use agent_types::{ChatModel, ChatModelError};
use std::sync::Arc;

/// Parsed `provider/model` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: String,
    pub model: String,
}

impl ModelSpec {
    /// Split on the first `/`. A bare model name defaults to the `openai` provider.
    pub fn parse(spec: &str) -> Result<Self, ChatModelError> {
        let spec = spec.trim();
        let (provider, model) = match spec.split_once('/') {
            Some((p, m)) => (p.trim(), m.trim()),
            None => ("openai", spec),
        };
        if provider.is_empty() || model.is_empty() {
            return Err(ChatModelError::Other(format!(
                "invalid model spec '{}', expected provider/model",
                spec
            )));
        }
        Ok(Self {
            provider: provider.to_ascii_lowercase(),
            model: model.to_string(),
        })
    }
}

/// Endpoint and credentials for a provider. Unset fields fall back to the environment.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl ProviderSettings {
    /// Read `AGENT_MODEL_BASE_URL` / `AGENT_MODEL_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            base_url: non_empty("AGENT_MODEL_BASE_URL"),
            api_key: non_empty("AGENT_MODEL_API_KEY"),
        }
    }
}

/// Build a chat model for `spec`.
pub fn load_chat_model(
    spec: &str,
    settings: &ProviderSettings,
) -> Result<Arc<dyn ChatModel>, ChatModelError> {
    let spec = ModelSpec::parse(spec)?;
    match spec.provider.as_str() {
        "openai" => {
            let base_url = settings
                .base_url
                .clone()
                .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
            let api_key = settings
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
            Ok(Arc::new(OpenAiChatModel::new(base_url, api_key, spec.model)))
        }
        "openai-compatible" => {
            let base_url = settings.base_url.clone().ok_or_else(|| {
                ChatModelError::Other("openai-compatible provider requires a base_url".to_string())
            })?;
            Ok(Arc::new(OpenAiChatModel::new(
                base_url,
                settings.api_key.clone(),
                spec.model,
            )))
        }
        other => Err(ChatModelError::Other(format!(
            "unsupported model provider: {}",
            other
        ))),
    }
}
