use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use promptpack_utils::error::ConfigError;
use tracing::debug;

use super::{CliArgs, Config, ConfigSource, Defaults, LlmConfig, Selectors};

/// Environment variable overriding `[defaults] model`.
pub const ENV_MODEL: &str = "PROMPTPACK_MODEL";
/// Environment variable overriding `[llm] budget`.
pub const ENV_LLM_BUDGET: &str = "PROMPTPACK_LLM_BUDGET";

const CONFIG_DIR: &str = ".promptpack";
const CONFIG_FILE: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    defaults: Option<Defaults>,
    llm: Option<LlmConfig>,
    selectors: Option<Selectors>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("Failed to get current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover configuration starting from a specific directory, reading the
    /// process environment.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        Self::discover_with_env(start_dir, cli_args, |key| env::var(key).ok())
    }

    /// Path-driven discovery with an injectable environment lookup.
    ///
    /// Tests use this to avoid mutating process-global state.
    pub fn discover_with_env<F>(
        start_dir: &Path,
        cli_args: &CliArgs,
        env_lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut source_attribution = HashMap::new();

        let mut defaults = Defaults::default();
        let mut llm = LlmConfig::default();
        let mut selectors = Selectors::default();

        for key in [
            "model",
            "token_strategy",
            "verbose",
            "llm_base_url",
            "llm_api_key_env",
            "llm_timeout_secs",
            "llm_max_tokens",
            "llm_temperature",
            "llm_budget",
            "selectors_include",
            "selectors_exclude",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit_path) if !explicit_path.exists() => {
                return Err(ConfigError::NotFound {
                    path: explicit_path.display().to_string(),
                });
            }
            Some(explicit_path) => Some(explicit_path.clone()),
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "Loading config file");
            let file_config = Self::load_config_file(path)?;
            let src = ConfigSource::Config;

            if let Some(file_defaults) = file_config.defaults {
                if file_defaults.model.is_some() {
                    defaults.model = file_defaults.model;
                    source_attribution.insert("model".to_string(), src);
                }
                if file_defaults.token_strategy.is_some() {
                    defaults.token_strategy = file_defaults.token_strategy;
                    source_attribution.insert("token_strategy".to_string(), src);
                }
                if file_defaults.context_window.is_some() {
                    defaults.context_window = file_defaults.context_window;
                    source_attribution.insert("context_window".to_string(), src);
                }
                if file_defaults.verbose.is_some() {
                    defaults.verbose = file_defaults.verbose;
                    source_attribution.insert("verbose".to_string(), src);
                }
            }

            if let Some(file_llm) = file_config.llm {
                if file_llm.base_url.is_some() {
                    llm.base_url = file_llm.base_url;
                    source_attribution.insert("llm_base_url".to_string(), src);
                }
                if file_llm.api_key_env.is_some() {
                    llm.api_key_env = file_llm.api_key_env;
                    source_attribution.insert("llm_api_key_env".to_string(), src);
                }
                if file_llm.org_id.is_some() {
                    llm.org_id = file_llm.org_id;
                    source_attribution.insert("llm_org_id".to_string(), src);
                }
                if file_llm.timeout_secs.is_some() {
                    llm.timeout_secs = file_llm.timeout_secs;
                    source_attribution.insert("llm_timeout_secs".to_string(), src);
                }
                if file_llm.max_tokens.is_some() {
                    llm.max_tokens = file_llm.max_tokens;
                    source_attribution.insert("llm_max_tokens".to_string(), src);
                }
                if file_llm.temperature.is_some() {
                    llm.temperature = file_llm.temperature;
                    source_attribution.insert("llm_temperature".to_string(), src);
                }
                if file_llm.budget.is_some() {
                    llm.budget = file_llm.budget;
                    source_attribution.insert("llm_budget".to_string(), src);
                }
            }

            if let Some(file_selectors) = file_config.selectors {
                if !file_selectors.include.is_empty() {
                    selectors.include = file_selectors.include;
                    source_attribution.insert("selectors_include".to_string(), src);
                }
                if !file_selectors.exclude.is_empty() {
                    selectors.exclude = file_selectors.exclude;
                    source_attribution.insert("selectors_exclude".to_string(), src);
                }
            }
        }

        if let Some(model) = env_lookup(ENV_MODEL).filter(|m| !m.is_empty()) {
            defaults.model = Some(model);
            source_attribution.insert("model".to_string(), ConfigSource::Env);
        }

        if let Some(raw) = env_lookup(ENV_LLM_BUDGET).filter(|b| !b.is_empty()) {
            let budget = raw.trim().parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_LLM_BUDGET.to_string(),
                value: format!("expected a positive integer, got '{raw}'"),
            })?;
            llm.budget = Some(budget);
            source_attribution.insert("llm_budget".to_string(), ConfigSource::Env);
        }

        if let Some(model) = &cli_args.model {
            defaults.model = Some(model.clone());
            source_attribution.insert("model".to_string(), ConfigSource::Cli);
        }
        if let Some(strategy) = &cli_args.token_strategy {
            defaults.token_strategy = Some(strategy.clone());
            source_attribution.insert("token_strategy".to_string(), ConfigSource::Cli);
        }
        if let Some(window) = cli_args.context_window {
            defaults.context_window = Some(window);
            source_attribution.insert("context_window".to_string(), ConfigSource::Cli);
        }
        if let Some(verbose) = cli_args.verbose {
            defaults.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), ConfigSource::Cli);
        }

        let config = Self {
            defaults,
            llm,
            selectors,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.promptpack/config.toml`,
    /// stopping at repository root markers (.git, .hg, .svn) or filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir;

        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                return None;
            }

            current_dir = current_dir.parent()?;
        }
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::InvalidFile(format!("{}: {e}", path.display()))
            }),
            // A discovered file removed since discovery; defaults apply
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(ConfigError::DiscoveryFailed {
                reason: format!("Failed to read config file {}: {e}", path.display()),
            }),
        }
    }
}
