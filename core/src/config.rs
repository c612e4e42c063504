use serde::{Deserialize, Serialize};

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_LLM_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_LOCAL_SEARCH_BASE_URL: &str = "https://openapi.naver.com";
pub const DEFAULT_REGION: &str = "부산";

/// Configuration for the LLM provider
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: Some(DEFAULT_LLM_MODEL.to_string()),
            base_url: Some(DEFAULT_LLM_BASE_URL.to_string()),
        }
    }
}

impl LlmConfig {
    /// True when an API key is present and non-empty
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
        }
    }
}

/// Configuration for the local-search provider
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LocalSearchConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: Option<String>,
    /// Region prefixed to every query unless the caller overrides it
    pub region: Option<String>,
    /// Transport-level timeout for a single request
    pub request_timeout_secs: Option<u64>,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: Some(DEFAULT_LOCAL_SEARCH_BASE_URL.to_string()),
            region: Some(DEFAULT_REGION.to_string()),
            request_timeout_secs: Some(10),
        }
    }
}

impl LocalSearchConfig {
    /// Both credentials must be present for the provider to be usable
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.client_id) && present(&self.client_secret)
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            client_id: other.client_id.clone().or_else(|| self.client_id.clone()),
            client_secret: other
                .client_secret
                .clone()
                .or_else(|| self.client_secret.clone()),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            region: other.region.clone().or_else(|| self.region.clone()),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
        }
    }
}
