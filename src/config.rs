//! Environment configuration

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Most recent history entries given to the reasoner as context
pub const CONTEXT_WINDOW: usize = 10;

/// Reasoning passes after which the controller reports the iteration guard
pub const MAX_ITERATIONS: u32 = 5;

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_FHIR_BASE_URL: &str = "https://hapi.fhir.org/baseR4";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;
const DEFAULT_FHIR_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Tunables of the orchestration core
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub context_window: usize,
    pub max_iterations: u32,
    pub temperature: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            context_window: CONTEXT_WINDOW,
            max_iterations: MAX_ITERATIONS,
            temperature: Some(DEFAULT_TEMPERATURE),
        }
    }
}

/// Generation service settings
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Full process configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub fhir_base_url: String,
    pub fhir_timeout: Duration,
    pub history_limit: Option<usize>,
    pub agent: AgentConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let temperature = parse_var(&var, "LLM_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE);
        let llm_timeout = parse_var(&var, "LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);
        let fhir_timeout =
            parse_var(&var, "FHIR_TIMEOUT_SECS")?.unwrap_or(DEFAULT_FHIR_TIMEOUT_SECS);

        Ok(Self {
            llm: LlmSettings {
                api_key,
                model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: var("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                timeout: Duration::from_secs(llm_timeout),
            },
            fhir_base_url: var("FHIR_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FHIR_BASE_URL.to_string()),
            fhir_timeout: Duration::from_secs(fhir_timeout),
            history_limit: parse_var(&var, "SESSION_HISTORY_LIMIT")?,
            agent: AgentConfig {
                temperature: Some(temperature),
                ..AgentConfig::default()
            },
        })
    }
}

fn parse_var<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}
