//! Exit code constants for the promptpack CLI.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `NO_RESULTS` | Retrieval found nothing relevant |
//! | 7 | `BUDGET_EXCEEDED` | Nothing fits the token budget |
//! | 70 | `LLM_FAILURE` | Model request or compression failed |

/// Exit codes matching the documented exit code table.
///
/// Use the named constants, or [`as_i32()`](Self::as_i32) to get the numeric
/// value for `std::process::exit()`.
///
/// # Example
///
/// ```rust
/// use promptpack_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::BUDGET_EXCEEDED.as_i32(), 7);
/// assert_eq!(ExitCode::SUCCESS, ExitCode::from_i32(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// No results - search and merge produced no eligible candidates
    pub const NO_RESULTS: ExitCode = ExitCode(3);

    /// Budget exceeded - the fixed part of the prompt alone exceeds the budget
    pub const BUDGET_EXCEEDED: ExitCode = ExitCode(7);

    /// LLM failure - the completion endpoint failed
    pub const LLM_FAILURE: ExitCode = ExitCode(70);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    ///
    /// Prefer using the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}
