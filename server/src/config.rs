use anyhow::{Context, Result};
use ddugi_core::{LlmConfig, LocalSearchConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::synthesizer::{SynthesizerSettings, VerificationStrategy};

const APP_NAME: &str = "ddugi";

/// Controls whether internal error detail reaches HTTP clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategy: VerificationStrategy,
    pub draft_timeout_secs: u64,
    pub merge_timeout_secs: u64,
    /// Deadline for one entity lookup or tool search
    pub lookup_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: VerificationStrategy::default(),
            draft_timeout_secs: 30,
            merge_timeout_secs: 30,
            lookup_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Turns kept per session after each exchange
    pub max_turns: usize,
    /// Idle seconds before a session expires; unset keeps sessions for the process lifetime
    pub ttl_secs: Option<u64>,
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            ttl_secs: None,
            cleanup_interval_secs: 300,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Option<chrono::Duration> {
        self.ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub environment: Environment,
    pub llm: LlmConfig,
    pub local_search: LocalSearchConfig,
    pub pipeline: PipelineConfig,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            environment: Environment::default(),
            llm: LlmConfig::default(),
            local_search: LocalSearchConfig::default(),
            pipeline: PipelineConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Overlay provider settings from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        self.llm = self.llm.merge(&LlmConfig {
            api_key: var("ANTHROPIC_API_KEY"),
            model_name: var("CLAUDE_MODEL"),
            base_url: var("ANTHROPIC_BASE_URL"),
        });
        self.local_search = self.local_search.merge(&LocalSearchConfig {
            client_id: var("NAVER_CLIENT_ID"),
            client_secret: var("NAVER_CLIENT_SECRET"),
            base_url: None,
            region: var("DDUGI_REGION"),
            request_timeout_secs: None,
        });
        if let Some(environment) = var("DDUGI_ENV").and_then(|v| v.parse().ok()) {
            self.environment = environment;
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn synthesizer_settings(&self) -> SynthesizerSettings {
        SynthesizerSettings {
            strategy: self.pipeline.strategy,
            draft_timeout: Duration::from_secs(self.pipeline.draft_timeout_secs),
            merge_timeout: Duration::from_secs(self.pipeline.merge_timeout_secs),
            lookup_timeout: Duration::from_secs(self.pipeline.lookup_timeout_secs),
        }
    }
}

/// `~/.config/ddugi/config.toml`
pub fn get_default_config_file() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home_dir.join(".config").join(APP_NAME).join("config.toml"))
}
