use std::time::Duration;

use promptpack_llm::{LlmBackend, complete};
use promptpack_packet::{
    AssembledPrompt, Candidate, Compressor, UNSPLIT_DIFF_ID, diff_header, split_unified_diff,
};
use promptpack_selectors::CompiledSelectors;
use promptpack_tokens::{TokenCounter, completion_room};
use promptpack_utils::error::PromptPackError;
use tracing::{debug, info};

use super::Assembler;
use crate::prompts::{PR_BODY_PROMPT, PR_TITLE_PROMPT};

/// What a pull request description is written from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestInput {
    pub title: String,
    /// Commit log lines for the branch.
    pub logs: String,
    /// Unified diff of the branch against its base.
    pub diff: String,
}

impl PullRequestInput {
    fn head(&self) -> String {
        format!("Title: {}\n\nGit logs: {}", self.title, self.logs)
    }
}

impl Assembler<'_> {
    /// Prompt for a pull request body.
    ///
    /// When title, logs and the whole diff fit, they are sent as is.
    /// Otherwise the diff is split per file, files excluded by `selectors`
    /// are dropped, and the rest are packed smallest first, compressing any
    /// file whose diff does not fit on its own.
    ///
    /// # Errors
    ///
    /// - `PackError::BudgetExceeded` when title and logs alone do not fit, or
    ///   no file fits even after compression
    /// - `PackError::Compression` when a compression request fails
    pub async fn describe(
        &self,
        input: &PullRequestInput,
        compressor: &Compressor<'_>,
        selectors: Option<&CompiledSelectors>,
    ) -> Result<AssembledPrompt, PromptPackError> {
        let head = input.head();
        let full = format!("{head}\n\nGit diff: {}", input.diff);
        let full_tokens = self.counters.exact.count_all(&[PR_BODY_PROMPT, full.as_str()])?;
        if full_tokens <= self.limit {
            debug!(tokens = full_tokens, "Full diff fits");
            return self.finish("describe", full);
        }

        let pieces: Vec<_> = split_unified_diff(&input.diff)
            .into_iter()
            .filter(|piece| {
                piece.path == UNSPLIT_DIFF_ID
                    || selectors.is_none_or(|s| s.is_selected(&piece.path))
            })
            .collect();
        let headers: Vec<String> = pieces.iter().map(|p| diff_header(&p.path)).collect();

        let mut fixed: Vec<&str> = vec![PR_BODY_PROMPT, head.as_str()];
        fixed.extend(headers.iter().map(String::as_str));
        let budget = self.reserve(&fixed)?;

        info!(
            files = pieces.len(),
            diff_tokens = full_tokens,
            budget = budget.remaining(),
            "Diff too large, packing per-file diffs"
        );

        let candidates: Vec<Candidate> = pieces.iter().map(|p| p.to_candidate()).collect();
        let packed = compressor
            .pack_with_compression(&candidates, budget.remaining(), self.counters)
            .await?;

        self.finish("describe", format!("{head}{}", packed.render_diffs()))
    }
}

/// One-line pull request title written from the commit logs.
///
/// The reply is limited to what the logs leave free of `window`.
pub async fn generate_title(
    backend: &dyn LlmBackend,
    model: &str,
    timeout: Duration,
    logs: &str,
    window: usize,
    counter: &dyn TokenCounter,
) -> Result<String, PromptPackError> {
    let room = completion_room(window, counter.count_all(&[PR_TITLE_PROMPT, logs])?);
    let title = complete(backend, model, timeout, PR_TITLE_PROMPT, logs, room).await?;
    Ok(title.trim().trim_matches('"').to_string())
}
