//! promptpack - token-budgeted prompt assembly
//!
//! promptpack builds prompts for an LLM from material that is too large to
//! send whole: repository files, unified diffs and issue threads. Candidates
//! are ranked by an ephemeral full-text index, packed greedily under the
//! model's token budget, and shrunk by a model-written summary when a single
//! fragment does not fit on its own.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Ask about the files most relevant to a question
//! promptpack ask . -q "Where is the retry limit configured?"
//!
//! # Write a pull request body from a branch diff
//! git diff main... | promptpack describe --title "Add retries" --log log.txt
//!
//! # Count tokens with the configured strategy
//! promptpack count src/lib.rs
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust
//! use promptpack::packet::{Candidate, PackPolicy, pack};
//! use promptpack::tokens::FastCounter;
//!
//! let candidates = vec![
//!     Candidate::with_token_count("a", "...", 100),
//!     Candidate::with_token_count("b", "...", 200),
//!     Candidate::with_token_count("c", "...", 50),
//! ];
//! let packed = pack(&candidates, PackPolicy::SizeFirst, 250, &FastCounter).unwrap();
//! assert_eq!(packed.ids(), ["c", "a"]);
//! assert_eq!(packed.total_tokens(), 150);
//! ```

pub mod assemble;
pub mod cli;
pub mod prompts;

/// Immutable configuration resolved once per process.
///
/// Use [`Config::discover()`] for CLI behaviour or [`Config::builder()`] for
/// programmatic construction.
pub use promptpack_config::{CliArgs, Config, ConfigBuilder};

/// Library-level error type with user-facing rendering and exit code mapping.
pub use promptpack_utils::error::{
    ConfigError, ErrorCategory, LlmError, PackError, PromptPackError, UserFriendlyError,
};

/// Exit codes for the `promptpack` binary.
pub use promptpack_utils::exit_codes::ExitCode;

pub use promptpack_config as config;
pub use promptpack_llm as llm;
pub use promptpack_packet as packet;
pub use promptpack_retrieval as retrieval;
pub use promptpack_tokens as tokens;
pub use promptpack_utils::logging;
