use std::collections::HashMap;

use super::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> String {
    source.copied().unwrap_or(ConfigSource::Default).to_string()
}

impl Config {
    /// Get effective configuration as key-value pairs with source attribution
    ///
    /// Values are `(value, source)` tuples. The API key itself is never
    /// included, only the name of the variable it is read from.
    #[must_use]
    pub fn effective_config(&self) -> HashMap<String, (String, String)> {
        let mut config = HashMap::new();

        let mut add_config = |key: &str, value: Option<String>| {
            if let Some(val) = value {
                let source = source_label(self.source_attribution.get(key));
                config.insert(key.to_string(), (val, source));
            }
        };

        add_config("model", Some(self.model().to_string()));
        add_config("token_strategy", self.defaults.token_strategy.clone());
        add_config(
            "context_window",
            self.defaults.context_window.map(|w| w.to_string()),
        );
        add_config("verbose", self.defaults.verbose.map(|v| v.to_string()));

        add_config("llm_base_url", self.llm.base_url.clone());
        add_config("llm_api_key_env", self.llm.api_key_env.clone());
        add_config("llm_org_id", self.llm.org_id.clone());
        add_config("llm_timeout_secs", self.llm.timeout_secs.map(|t| t.to_string()));
        add_config("llm_max_tokens", self.llm.max_tokens.map(|t| t.to_string()));
        add_config("llm_temperature", self.llm.temperature.map(|t| t.to_string()));
        add_config("llm_budget", self.llm.budget.map(|b| b.to_string()));

        add_config("selectors_include", Some(self.selectors.include.join(", ")));
        add_config("selectors_exclude", Some(self.selectors.exclude.join(", ")));

        config
    }
}
