//! Prompt assembly for each command.
//!
//! An [`Assembler`] pairs token counters with the active model's budget.
//! Every prompt reserves room for its system instruction and fixed text
//! first; the remainder is what the packer may fill. Reservations and fit
//! checks use the exact counter; the estimate only orders candidates.

mod ask;
mod describe;
mod issue;

pub use describe::{PullRequestInput, generate_title};
pub use issue::{IssueComment, IssueFile};

use promptpack_config::Config;
use promptpack_packet::{AssembledPrompt, TokenBudget};
use promptpack_tokens::{Counters, TokenCounter, max_tokens};
use promptpack_utils::error::PromptPackError;
use promptpack_utils::logging::log_prompt_assembled;

/// Builds prompts under one model budget.
pub struct Assembler<'a> {
    counters: Counters<'a>,
    limit: usize,
}

impl<'a> Assembler<'a> {
    /// Assembler that orders and decides with the same counter.
    #[must_use]
    pub const fn new(counter: &'a dyn TokenCounter, limit: usize) -> Self {
        Self::with_counters(Counters::single(counter), limit)
    }

    #[must_use]
    pub const fn with_counters(counters: Counters<'a>, limit: usize) -> Self {
        Self { counters, limit }
    }

    /// Assembler for the configured model and context window.
    #[must_use]
    pub fn for_config(config: &Config, counters: Counters<'a>) -> Self {
        Self::with_counters(counters, max_tokens(config.model(), config.context_window()))
    }

    /// Tokens allowed for system instruction plus user prompt.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Budget with the system instruction and fixed prompt parts reserved.
    fn reserve(&self, fixed: &[&str]) -> Result<TokenBudget, PromptPackError> {
        let fixed_tokens = self.counters.exact.count_all(fixed)?;
        Ok(TokenBudget::reserve(self.limit, fixed_tokens)?)
    }

    fn finish(&self, command: &str, text: String) -> Result<AssembledPrompt, PromptPackError> {
        let prompt = AssembledPrompt::new(text, self.counters.exact)?;
        log_prompt_assembled(command, prompt.tokens, &prompt.blake3_hash);
        Ok(prompt)
    }
}
