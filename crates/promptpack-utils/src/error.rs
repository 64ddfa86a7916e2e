use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type with user-friendly reporting.
///
/// `PromptPackError` is what the command layer sees. It wraps the three
/// families of failures promptpack distinguishes:
///
/// | Variant | Description |
/// |---------|-------------|
/// | `Config` | Configuration file, environment or CLI argument errors |
/// | `Pack` | Retrieval, packing, compression and model request errors |
/// | `Io` | Reading inputs from disk or stdin |
///
/// Use [`to_exit_code()`](Self::to_exit_code) to map an error to the CLI exit
/// code and [`display_for_user()`](Self::display_for_user) for a rendered
/// message with context and suggestions.
///
/// # Example
///
/// ```rust
/// use promptpack_utils::error::{PackError, PromptPackError};
/// use promptpack_utils::exit_codes::ExitCode;
///
/// let err = PromptPackError::from(PackError::EmptyResult {
///     what: "files matching the question".to_string(),
/// });
/// assert_eq!(err.to_exit_code(), ExitCode::NO_RESULTS);
/// assert!(err.display_for_user().contains("Suggestions:"));
/// ```
#[derive(Error, Debug)]
pub enum PromptPackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<LlmError> for PromptPackError {
    fn from(err: LlmError) -> Self {
        Self::Pack(PackError::Request(err))
    }
}

/// Errors raised while turning candidate text into a budgeted prompt.
///
/// `EmptyResult` and `BudgetExceeded` are expected, user-facing outcomes
/// (nothing relevant was found, nothing fits). The other variants point at
/// the environment: a tokenizer that cannot load, a broken index, a failing
/// model endpoint. [`PackError::is_expected`] tells the two groups apart.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("Tokenization failed: {reason}")]
    Tokenization { reason: String },

    #[error("Search index error: {reason}")]
    SearchIndex { reason: String },

    #[error("No results: {what}")]
    EmptyResult { what: String },

    #[error("Token budget exceeded: {required} tokens required, budget is {budget}")]
    BudgetExceeded { required: usize, budget: usize },

    #[error("Compression of '{id}' failed: {source}")]
    Compression {
        id: String,
        #[source]
        source: LlmError,
    },

    #[error("Model request failed: {0}")]
    Request(#[from] LlmError),
}

impl PackError {
    /// True for conditions a user can act on by changing inputs, false for
    /// infrastructure failures.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(self, Self::EmptyResult { .. } | Self::BudgetExceeded { .. })
    }

    pub fn tokenization(reason: impl fmt::Display) -> Self {
        Self::Tokenization {
            reason: reason.to_string(),
        }
    }

    pub fn search_index(reason: impl fmt::Display) -> Self {
        Self::SearchIndex {
            reason: reason.to_string(),
        }
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Tokenization,
    Retrieval,
    Budget,
    LlmIntegration,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Tokenization => write!(f, "Tokenization"),
            Self::Retrieval => write!(f, "Retrieval"),
            Self::Budget => write!(f, "Token Budget"),
            Self::LlmIntegration => write!(f, "LLM Integration"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => {
                format!("Required configuration '{key}' is missing")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => {
                format!("Configuration file not found: {path}")
            }
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with optional [defaults], [llm] and [selectors] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => None,
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "promptpack searches for .promptpack/config.toml starting from the current directory upward."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .promptpack/config.toml".to_string(),
                "Run 'promptpack config' to see the effective configuration".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!(
                "Add '{key}' to .promptpack/config.toml or pass it as a CLI flag"
            )],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "token_strategy" => vec!["Use 'exact' or 'fast'".to_string()],
                "context_window" => {
                    vec!["Use a positive token count no larger than 2,000,000".to_string()]
                }
                "temperature" => vec!["Use a value between 0.0 and 2.0".to_string()],
                _ => vec![
                    "Check the documentation for valid values for this option".to_string(),
                    "Remove the option to use the default value".to_string(),
                ],
            },
            Self::NotFound { .. } => vec![
                "Create .promptpack/config.toml in your project root".to_string(),
                "Use CLI flags instead of a configuration file".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check read permissions on the current and parent directories".to_string(),
                "Use --config <path> to specify the configuration file explicitly".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl UserFriendlyError for PackError {
    fn user_message(&self) -> String {
        match self {
            Self::Tokenization { reason } => format!("Could not count tokens: {reason}"),
            Self::SearchIndex { reason } => format!("Relevance search failed: {reason}"),
            Self::EmptyResult { what } => format!("No results found: {what}"),
            Self::BudgetExceeded { required, budget } => format!(
                "Prompt does not fit: {required} tokens required, the model allows {budget}"
            ),
            Self::Compression { id, source } => {
                format!("Could not compress '{id}': {}", source.user_message())
            }
            Self::Request(err) => err.user_message(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Tokenization { .. } => Some(
                "Exact token counts use the cl100k_base tokenizer; the fast strategy estimates four bytes per token."
                    .to_string(),
            ),
            Self::SearchIndex { .. } => Some(
                "An in-memory full-text index is built over the corpus for every invocation."
                    .to_string(),
            ),
            Self::EmptyResult { .. } => Some(
                "Only candidates that match the query terms are eligible for relevance packing."
                    .to_string(),
            ),
            Self::BudgetExceeded { .. } => Some(
                "The budget is the model's context window minus a safety margin.".to_string(),
            ),
            Self::Compression { source, .. } => source.context(),
            Self::Request(err) => err.context(),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Tokenization { .. } => vec![
                "Retry with --token-strategy fast".to_string(),
            ],
            Self::SearchIndex { .. } => vec![
                "Run with --verbose to see which candidate broke indexing".to_string(),
            ],
            Self::EmptyResult { .. } => vec![
                "Rephrase the question using identifiers that appear in the code".to_string(),
                "Check the [selectors] include patterns in .promptpack/config.toml".to_string(),
            ],
            Self::BudgetExceeded { .. } => vec![
                "Shorten the question or the issue text".to_string(),
                "Use a model with a larger context window (--model)".to_string(),
            ],
            Self::Compression { source, .. } => source.suggestions(),
            Self::Request(err) => err.suggestions(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Tokenization { .. } => ErrorCategory::Tokenization,
            Self::SearchIndex { .. } | Self::EmptyResult { .. } => ErrorCategory::Retrieval,
            Self::BudgetExceeded { .. } => ErrorCategory::Budget,
            Self::Compression { .. } | Self::Request(_) => ErrorCategory::LlmIntegration,
        }
    }
}

/// Errors that can occur during LLM backend operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP connectivity or response decoding failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Per-process call limit reached
    #[error("Call budget exceeded: attempted {attempted} calls, limit is {limit}")]
    CallBudgetExceeded { limit: u32, attempted: u32 },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("LLM provider service outage: {msg}"),
            Self::Timeout { duration } => {
                format!("LLM invocation timed out after {duration:?}")
            }
            Self::CallBudgetExceeded { limit, attempted } => {
                format!("LLM call budget exceeded: attempted {attempted} calls, limit is {limit}")
            }
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) => {
                Some("The model endpoint could not be reached or returned an unreadable response.".to_string())
            }
            Self::ProviderAuth(_) => {
                Some("Authentication errors indicate a missing or invalid API key.".to_string())
            }
            Self::ProviderQuota(_) => {
                Some("Quota errors occur when rate limits or usage limits are exceeded.".to_string())
            }
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            Self::Timeout { .. } => None,
            Self::CallBudgetExceeded { .. } => {
                Some("The call budget caps how many model requests one run may make.".to_string())
            }
            Self::Misconfiguration(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) | Self::ProviderOutage(_) => vec![
                "Check network connectivity and the [llm] base_url setting".to_string(),
                "Try again; promptpack does not retry failed requests".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that the API key environment variable named by [llm] api_key_env is set"
                    .to_string(),
            ],
            Self::ProviderQuota(_) => vec!["Wait a few minutes and try again".to_string()],
            Self::Timeout { .. } => vec![
                "Increase [llm] timeout_secs in .promptpack/config.toml".to_string(),
            ],
            Self::CallBudgetExceeded { .. } => vec![
                "Raise the limit with PROMPTPACK_LLM_BUDGET or [llm] budget".to_string(),
            ],
            Self::Misconfiguration(_) => vec![
                "Check the [llm] section in .promptpack/config.toml".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) => ErrorCategory::Configuration,
            Self::ProviderQuota(_) | Self::CallBudgetExceeded { .. } => ErrorCategory::Budget,
            _ => ErrorCategory::LlmIntegration,
        }
    }
}

impl UserFriendlyError for PromptPackError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Pack(err) => err.user_message(),
            Self::Io(err) => format!("Could not read input: {err}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Pack(err) => err.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Pack(err) => err.suggestions(),
            Self::Io(_) => vec!["Check that the path exists and is readable".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Pack(err) => err.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl PromptPackError {
    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// ```text
    /// Error: <user message>
    ///
    /// Context: <context if available>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// Map this error to the appropriate CLI exit code.
    ///
    /// | Exit Code | Name | Description |
    /// |-----------|------|-------------|
    /// | 1 | INTERNAL | Tokenizer, index or IO failure |
    /// | 2 | CLI_ARGS | Invalid configuration or arguments |
    /// | 3 | NO_RESULTS | Retrieval found nothing relevant |
    /// | 7 | BUDGET_EXCEEDED | Nothing fits the token budget |
    /// | 70 | LLM_FAILURE | Model request or compression failed |
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Pack(pack_err) => match pack_err {
                PackError::EmptyResult { .. } => ExitCode::NO_RESULTS,
                PackError::BudgetExceeded { .. } => ExitCode::BUDGET_EXCEEDED,
                PackError::Compression { .. } => ExitCode::LLM_FAILURE,
                PackError::Request(LlmError::Misconfiguration(_)) => ExitCode::CLI_ARGS,
                PackError::Request(_) => ExitCode::LLM_FAILURE,
                PackError::Tokenization { .. } | PackError::SearchIndex { .. } => {
                    ExitCode::INTERNAL
                }
            },
            Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::ExitCode;

    #[test]
    fn test_expected_conditions_are_distinguishable() {
        assert!(
            PackError::EmptyResult {
                what: "files".to_string()
            }
            .is_expected()
        );
        assert!(
            PackError::BudgetExceeded {
                required: 10,
                budget: 5
            }
            .is_expected()
        );
        assert!(!PackError::search_index("disk full").is_expected());
        assert!(!PackError::Request(LlmError::Transport("reset".to_string())).is_expected());
        assert!(!PackError::tokenization("no encoder").is_expected());
    }

    #[test]
    fn test_exit_code_mapping() {
        let cases: Vec<(PromptPackError, ExitCode)> = vec![
            (
                ConfigError::InvalidFile("bad".to_string()).into(),
                ExitCode::CLI_ARGS,
            ),
            (
                PackError::EmptyResult {
                    what: "x".to_string(),
                }
                .into(),
                ExitCode::NO_RESULTS,
            ),
            (
                PackError::BudgetExceeded {
                    required: 9000,
                    budget: 4000,
                }
                .into(),
                ExitCode::BUDGET_EXCEEDED,
            ),
            (
                LlmError::ProviderOutage("503".to_string()).into(),
                ExitCode::LLM_FAILURE,
            ),
            (
                LlmError::Misconfiguration("no key".to_string()).into(),
                ExitCode::CLI_ARGS,
            ),
            (
                PackError::search_index("locked").into(),
                ExitCode::INTERNAL,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_exit_code(), expected, "wrong exit code for {err}");
        }
    }

    #[test]
    fn test_display_for_user_includes_suggestions() {
        let err = PromptPackError::from(PackError::BudgetExceeded {
            required: 5000,
            budget: 3891,
        });
        let rendered = err.display_for_user();
        assert!(rendered.starts_with("Error: Prompt does not fit"));
        assert!(rendered.contains("Context:"));
        assert!(rendered.contains("--model"));
    }

    #[test]
    fn test_compression_error_keeps_source() {
        let err = PackError::Compression {
            id: "src/lib.rs".to_string(),
            source: LlmError::Timeout {
                duration: Duration::from_secs(30),
            },
        };
        assert!(err.to_string().contains("src/lib.rs"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.category(), ErrorCategory::LlmIntegration);
    }
}
