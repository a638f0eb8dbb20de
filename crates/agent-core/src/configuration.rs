//! Agent configuration: defaults, environment, and per-run overrides.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant.\n\nSystem time: {system_time}";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfiguration {
    /// Prompt template; `{system_time}` is replaced on every model call.
    pub system_prompt: String,
    /// `provider/model`.
    pub model: String,
    pub max_search_results: usize,
    /// Memory owner. Fixed so memory is shared across sessions.
    pub memory_user_id: String,
    pub memory_search_limit: usize,
    pub agent_id: String,
}

impl Default for AgentConfiguration {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: "openai/gpt-4.1".to_string(),
            max_search_results: 10,
            memory_user_id: "123".to_string(),
            memory_search_limit: 5,
            agent_id: "react-agent".to_string(),
        }
    }
}

impl AgentConfiguration {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("AGENT_SYSTEM_PROMPT") {
            cfg.system_prompt = v;
        }
        if let Ok(v) = std::env::var("AGENT_MODEL") {
            cfg.model = v;
        }
        if let Ok(v) = std::env::var("AGENT_MAX_SEARCH_RESULTS") {
            cfg.max_search_results = v.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: "AGENT_MAX_SEARCH_RESULTS".to_string(),
                    message: e.to_string(),
                }
            })?;
        }
        if let Ok(v) = std::env::var("AGENT_MEMORY_USER_ID") {
            cfg.memory_user_id = v;
        }
        Ok(cfg)
    }

    /// Apply per-run overrides. Unknown keys are ignored; known keys must have the right type.
    pub fn with_overrides(
        &self,
        configurable: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ConfigError> {
        if configurable.is_empty() {
            return Ok(self.clone());
        }
        let mut base = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(m)) => m,
            _ => return Ok(self.clone()),
        };
        for (key, value) in configurable {
            if !base.contains_key(key) {
                continue;
            }
            base.insert(key.clone(), value.clone());
            // Check per key so the error names the offending override.
            serde_json::from_value::<Self>(serde_json::Value::Object(base.clone())).map_err(
                |e| ConfigError::InvalidValue {
                    key: key.clone(),
                    message: e.to_string(),
                },
            )?;
        }
        serde_json::from_value(serde_json::Value::Object(base)).map_err(|e| {
            ConfigError::InvalidValue {
                key: "configurable".to_string(),
                message: e.to_string(),
            }
        })
    }

    pub fn render_system_prompt(&self, now: DateTime<Utc>) -> String {
        self.system_prompt.replace(
            "{system_time}",
            &now.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}
