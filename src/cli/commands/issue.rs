//! `promptpack issue`

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use super::common::{DeferredBackend, RunCounters, deliver, merge_mode, walk_corpus};
use crate::Config;
use crate::cli::args::IgnoreArgs;
use crate::assemble::{Assembler, IssueFile};
use crate::prompts::QUESTION_PROMPT;

/// Answer `question` about an exported issue, using either its comments or
/// the repository files most relevant to it as context.
pub async fn execute_issue_command(
    issue_file: &Path,
    question: &str,
    comments: bool,
    repo: &Path,
    average: bool,
    ignore: &IgnoreArgs,
    prompt_only: bool,
    config: &Config,
) -> Result<()> {
    let issue = IssueFile::load(issue_file)?;
    debug!(number = issue.number, comments = issue.comments.len(), "Issue loaded");

    let run = RunCounters::load(config)?;
    let assembler = Assembler::for_config(config, run.counters());

    let prompt = if comments {
        assembler.issue_with_comments(&issue, question)?
    } else {
        let files = walk_corpus(repo, ignore, config)?;
        assembler.issue_with_files(&issue, &files, question, merge_mode(average))?
    };

    let backend = DeferredBackend::new(config);
    deliver(&prompt, QUESTION_PROMPT, prompt_only, &backend, run.exact(), config).await
}
