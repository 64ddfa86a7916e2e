//! Configuration management for promptpack
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. The TOML file lives at
//! `.promptpack/config.toml` and supports `[defaults]`, `[llm]` and
//! `[selectors]` sections.
//!
//! A [`Config`] is resolved once per process and then passed by reference;
//! nothing in the library reads configuration from global state.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;
pub use promptpack_selectors::Selectors;
pub use promptpack_utils::types::ConfigSource;

use promptpack_utils::error::ConfigError;
use promptpack_utils::types::TokenStrategy;
use std::time::Duration;

impl Config {
    /// Model id used for completions and context window lookup.
    #[must_use]
    pub fn model(&self) -> &str {
        self.defaults.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Parsed token counting strategy.
    pub fn token_strategy(&self) -> Result<TokenStrategy, ConfigError> {
        match self.defaults.token_strategy.as_deref() {
            None => Ok(TokenStrategy::default()),
            Some(raw) => TokenStrategy::parse(raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "token_strategy".to_string(),
                value: format!("Unknown token strategy: {raw}"),
            }),
        }
    }

    /// Explicit context window override for the active model, if configured.
    #[must_use]
    pub fn context_window(&self) -> Option<usize> {
        self.defaults.context_window
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    /// Timeout applied to each completion request.
    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Maximum number of completion requests per process.
    #[must_use]
    pub fn llm_budget(&self) -> u32 {
        self.llm.budget.unwrap_or(DEFAULT_LLM_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_fall_back_to_defaults() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.token_strategy().unwrap(), TokenStrategy::Exact);
        assert_eq!(config.context_window(), None);
        assert!(!config.verbose());
        assert_eq!(config.llm_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.llm_budget(), DEFAULT_LLM_BUDGET);
    }

    #[test]
    fn test_unknown_token_strategy_is_rejected() {
        let mut config = Config::builder().build().unwrap();
        config.defaults.token_strategy = Some("sloppy".to_string());
        assert!(matches!(
            config.token_strategy(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "token_strategy"
        ));
    }
}
