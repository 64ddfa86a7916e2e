use promptpack_utils::error::ConfigError;
use promptpack_utils::types::TokenStrategy;

use super::Config;

/// Largest context window accepted as an override.
pub const MAX_CONTEXT_WINDOW: usize = 2_000_000;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(model) = &self.defaults.model
            && model.trim().is_empty()
        {
            return Err(invalid("model", "must not be empty"));
        }

        if let Some(strategy) = &self.defaults.token_strategy
            && TokenStrategy::parse(strategy).is_none()
        {
            return Err(invalid(
                "token_strategy",
                format!("Unknown token strategy: {strategy}"),
            ));
        }

        if let Some(window) = self.defaults.context_window {
            if window == 0 {
                return Err(invalid("context_window", "must be greater than 0"));
            }
            if window > MAX_CONTEXT_WINDOW {
                return Err(invalid(
                    "context_window",
                    "exceeds maximum limit of 2,000,000 tokens",
                ));
            }
        }

        if let Some(base_url) = &self.llm.base_url
            && !(base_url.starts_with("https://") || base_url.starts_with("http://"))
        {
            return Err(invalid(
                "llm.base_url",
                format!("must be an http(s) URL, got '{base_url}'"),
            ));
        }

        if let Some(api_key_env) = &self.llm.api_key_env
            && api_key_env.trim().is_empty()
        {
            return Err(invalid("llm.api_key_env", "must not be empty"));
        }

        if let Some(timeout) = self.llm.timeout_secs {
            if timeout == 0 {
                return Err(invalid("llm.timeout_secs", "must be greater than 0"));
            }
            if timeout > 3600 {
                return Err(invalid(
                    "llm.timeout_secs",
                    "exceeds maximum limit of 3600 seconds (1 hour)",
                ));
            }
        }

        if let Some(max_tokens) = self.llm.max_tokens
            && max_tokens == 0
        {
            return Err(invalid("llm.max_tokens", "must be greater than 0"));
        }

        if let Some(temperature) = self.llm.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(invalid(
                "temperature",
                format!("must be between 0.0 and 2.0, got {temperature}"),
            ));
        }

        if let Some(budget) = self.llm.budget
            && budget == 0
        {
            return Err(invalid("llm.budget", "must be greater than 0"));
        }

        self.selectors.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(err: ConfigError) -> String {
        match err {
            ConfigError::InvalidValue { key, .. } => key,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::builder().build().is_ok());
    }

    #[test]
    fn test_rejects_zero_context_window() {
        let err = Config::builder().context_window(0).build().unwrap_err();
        assert_eq!(key_of(err), "context_window");
    }

    #[test]
    fn test_rejects_oversized_context_window() {
        let err = Config::builder()
            .context_window(MAX_CONTEXT_WINDOW + 1)
            .build()
            .unwrap_err();
        assert_eq!(key_of(err), "context_window");
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let err = Config::builder().temperature(3.5).build().unwrap_err();
        assert_eq!(key_of(err), "temperature");
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = Config::builder().llm_timeout_secs(0).build().unwrap_err();
        assert_eq!(key_of(err), "llm.timeout_secs");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = Config::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert_eq!(key_of(err), "llm.base_url");
    }

    #[test]
    fn test_rejects_unknown_token_strategy() {
        let err = Config::builder().token_strategy("vibes").build().unwrap_err();
        assert_eq!(key_of(err), "token_strategy");
    }
}
