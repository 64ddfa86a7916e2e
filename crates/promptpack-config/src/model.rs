use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use promptpack_selectors::Selectors;
use promptpack_utils::types::ConfigSource;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_LLM_BUDGET: u32 = 20;

/// Configuration for promptpack.
///
/// `Config` is resolved once with precedence CLI > environment > config file
/// > built-in defaults and is immutable afterwards.
///
/// # Discovery
///
/// [`Config::discover()`] searches for `.promptpack/config.toml` upward from
/// the current directory, stopping at a repository root (`.git`, `.hg`,
/// `.svn`).
///
/// # Source Attribution
///
/// Each configuration value tracks its source (`cli`, `env`, `config`,
/// `programmatic` or `default`) for the `config` command.
///
/// # Example
///
/// ```rust,no_run
/// use promptpack_config::{CliArgs, Config};
///
/// let config = Config::discover(&CliArgs::default())?;
/// println!("Model: {}", config.model());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub llm: LlmConfig,
    pub selectors: Selectors,
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[defaults]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    pub model: Option<String>,
    /// `exact` or `fast`
    pub token_strategy: Option<String>,
    /// Overrides the context window of the active model.
    pub context_window: Option<usize>,
    pub verbose: Option<bool>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model: Some(DEFAULT_MODEL.to_string()),
            token_strategy: Some("exact".to_string()),
            context_window: None,
            verbose: Some(false),
        }
    }
}

/// `[llm]` section: the OpenAI-compatible completion endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    pub org_id: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Maximum number of completion requests per process.
    pub budget: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
            org_id: None,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            temperature: Some(DEFAULT_TEMPERATURE),
            budget: Some(DEFAULT_LLM_BUDGET),
        }
    }
}

impl LlmConfig {
    /// Section with every field unset, as parsed from an empty `[llm]` table.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            base_url: None,
            api_key_env: None,
            org_id: None,
            timeout_secs: None,
            max_tokens: None,
            temperature: None,
            budget: None,
        }
    }
}
