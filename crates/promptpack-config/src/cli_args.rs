use std::path::PathBuf;

/// CLI-provided overrides, the highest precedence layer.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file; disables upward discovery.
    pub config_path: Option<PathBuf>,
    pub model: Option<String>,
    pub token_strategy: Option<String>,
    pub context_window: Option<usize>,
    pub verbose: Option<bool>,
}
