use globset::{Glob, GlobSet, GlobSetBuilder};
use promptpack_utils::error::ConfigError;

/// High-confidence secret file patterns that are never sent to a model.
///
/// These are appended to the default excludes and enforced again when the
/// selectors are compiled, so a config that overrides `exclude` cannot drop
/// them.
///
/// # Patterns
///
/// - `.env` and `.env.*` - Environment variable files
/// - `*.pem`, `*.pfx`, `*.p12`, `*.key`, `*.p8` - Certificate/key files
/// - `id_rsa`, `id_ed25519` - SSH private keys
/// - `.ssh/**`, `.aws/**`, `.kube/**` - Credential directories
/// - `*.kdbx` - KeePass password databases
/// - `secrets.yaml`, `secrets.yml` - Secrets configuration files
pub const ALWAYS_EXCLUDE_PATTERNS: &[&str] = &[
    "**/.env",
    "**/.env.*",
    "**/*.pem",
    "**/id_rsa",
    "**/id_ed25519",
    "**/.ssh/**",
    "**/*.pfx",
    "**/*.p12",
    "**/*.key",
    "**/*.kdbx",
    "**/.aws/**",
    "**/.kube/**",
    "**/*.p8",
    "**/secrets.yaml",
    "**/secrets.yml",
];

/// Corpus selection configuration (`[selectors]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Selectors {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for Selectors {
    fn default() -> Self {
        let mut exclude = vec![
            "target/**".to_string(),
            "node_modules/**".to_string(),
            ".git/**".to_string(),
            "**/.DS_Store".to_string(),
            ".promptpack/**".to_string(),
        ];

        exclude.extend(ALWAYS_EXCLUDE_PATTERNS.iter().map(|s| (*s).to_string()));

        Self {
            include: vec!["**/*".to_string()],
            exclude,
        }
    }
}

impl Selectors {
    /// Validate glob patterns in selectors
    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in &self.include {
            parse_glob("selectors.include", pattern)?;
        }
        for pattern in &self.exclude {
            parse_glob("selectors.exclude", pattern)?;
        }
        Ok(())
    }

    /// Compile the patterns into matchers.
    ///
    /// The mandatory secret exclusions are always part of the exclude set.
    pub fn compile(&self) -> Result<CompiledSelectors, ConfigError> {
        let mut include = GlobSetBuilder::new();
        for pattern in &self.include {
            include.add(parse_glob("selectors.include", pattern)?);
        }

        let mut exclude = GlobSetBuilder::new();
        for pattern in self
            .exclude
            .iter()
            .map(String::as_str)
            .chain(ALWAYS_EXCLUDE_PATTERNS.iter().copied())
        {
            exclude.add(parse_glob("selectors.exclude", pattern)?);
        }

        Ok(CompiledSelectors {
            include: include.build().map_err(|e| invalid("selectors.include", e))?,
            exclude: exclude.build().map_err(|e| invalid("selectors.exclude", e))?,
        })
    }
}

/// Include/exclude matchers ready to test relative paths.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    include: GlobSet,
    exclude: GlobSet,
}

impl CompiledSelectors {
    /// True when `relative_path` matches an include pattern and no exclude
    /// pattern. Paths use `/` separators.
    #[must_use]
    pub fn is_selected(&self, relative_path: &str) -> bool {
        self.include.is_match(relative_path) && !self.exclude.is_match(relative_path)
    }
}

fn parse_glob(key: &str, pattern: &str) -> Result<Glob, ConfigError> {
    Glob::new(pattern).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: format!("Invalid glob pattern '{pattern}': {e}"),
    })
}

fn invalid(key: &str, err: globset::Error) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_are_valid() {
        let selectors = Selectors::default();
        assert!(selectors.validate().is_ok());
        assert!(selectors.exclude.iter().any(|p| p == "**/.env"));
    }

    #[test]
    fn test_invalid_glob_reports_key() {
        let selectors = Selectors {
            include: vec!["src/[".to_string()],
            exclude: vec![],
        };
        match selectors.validate() {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "selectors.include");
                assert!(value.contains("src/["));
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_compiled_selectors_apply_excludes() {
        let compiled = Selectors::default().compile().unwrap();
        assert!(compiled.is_selected("src/main.rs"));
        assert!(compiled.is_selected("README.md"));
        assert!(!compiled.is_selected("target/debug/build.log"));
        assert!(!compiled.is_selected("config/.env"));
        assert!(!compiled.is_selected("deploy/server.pem"));
    }

    #[test]
    fn test_secret_exclusions_survive_custom_excludes() {
        let selectors = Selectors {
            include: vec!["**/*".to_string()],
            exclude: vec![],
        };
        let compiled = selectors.compile().unwrap();
        assert!(compiled.is_selected("notes.txt"));
        assert!(!compiled.is_selected("home/.ssh/config"));
        assert!(!compiled.is_selected("secrets.yml"));
    }
}
