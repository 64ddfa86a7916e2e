use std::collections::HashMap;
use std::time::Duration;

use promptpack_utils::error::ConfigError;

use super::{Config, ConfigSource, Defaults, LlmConfig, Selectors};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding promptpack without relying on environment
    /// variables or config files.
    ///
    /// # Example
    ///
    /// ```rust
    /// use promptpack_config::Config;
    ///
    /// let config = Config::builder()
    ///     .model("gpt-4")
    ///     .token_strategy("fast")
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.model(), "gpt-4");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`; anything left unset uses the built-in default.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    model: Option<String>,
    token_strategy: Option<String>,
    context_window: Option<usize>,
    verbose: Option<bool>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    org_id: Option<String>,
    timeout: Option<Duration>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    llm_budget: Option<u32>,
    selectors: Option<Selectors>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// `exact` or `fast`; checked at build time.
    #[must_use]
    pub fn token_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.token_strategy = Some(strategy.into());
        self
    }

    #[must_use]
    pub fn context_window(mut self, tokens: usize) -> Self {
        self.context_window = Some(tokens);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    #[must_use]
    pub fn org_id(mut self, org: impl Into<String>) -> Self {
        self.org_id = Some(org.into());
        self
    }

    #[must_use]
    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn llm_timeout_secs(self, secs: u64) -> Self {
        self.llm_timeout(Duration::from_secs(secs))
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn llm_budget(mut self, calls: u32) -> Self {
        self.llm_budget = Some(calls);
        self
    }

    #[must_use]
    pub fn selectors(mut self, selectors: Selectors) -> Self {
        self.selectors = Some(selectors);
        self
    }

    /// Build the configuration, validating every value.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut defaults = Defaults::default();
        let mut llm = LlmConfig::default();
        let mut selectors = Selectors::default();

        let mut set = |key: &str, present: bool| {
            let source = if present {
                ConfigSource::Programmatic
            } else {
                ConfigSource::Default
            };
            source_attribution.insert(key.to_string(), source);
        };

        set("model", self.model.is_some());
        if let Some(model) = self.model {
            defaults.model = Some(model);
        }
        set("token_strategy", self.token_strategy.is_some());
        if let Some(strategy) = self.token_strategy {
            defaults.token_strategy = Some(strategy);
        }
        if let Some(window) = self.context_window {
            set("context_window", true);
            defaults.context_window = Some(window);
        }
        set("verbose", self.verbose.is_some());
        if let Some(verbose) = self.verbose {
            defaults.verbose = Some(verbose);
        }

        set("llm_base_url", self.base_url.is_some());
        if let Some(url) = self.base_url {
            llm.base_url = Some(url);
        }
        set("llm_api_key_env", self.api_key_env.is_some());
        if let Some(var) = self.api_key_env {
            llm.api_key_env = Some(var);
        }
        if let Some(org) = self.org_id {
            set("llm_org_id", true);
            llm.org_id = Some(org);
        }
        set("llm_timeout_secs", self.timeout.is_some());
        if let Some(timeout) = self.timeout {
            llm.timeout_secs = Some(timeout.as_secs());
        }
        set("llm_max_tokens", self.max_tokens.is_some());
        if let Some(max_tokens) = self.max_tokens {
            llm.max_tokens = Some(max_tokens);
        }
        set("llm_temperature", self.temperature.is_some());
        if let Some(temperature) = self.temperature {
            llm.temperature = Some(temperature);
        }
        set("llm_budget", self.llm_budget.is_some());
        if let Some(budget) = self.llm_budget {
            llm.budget = Some(budget);
        }
        set("selectors_include", self.selectors.is_some());
        set("selectors_exclude", self.selectors.is_some());
        if let Some(custom) = self.selectors {
            selectors = custom;
        }

        let config = Config {
            defaults,
            llm,
            selectors,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }
}
