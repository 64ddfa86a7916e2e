//! `promptpack ask`

use std::path::Path;

use anyhow::{Context, Result};

use super::common::{DeferredBackend, RunCounters, deliver, merge_mode, walk_corpus};
use crate::Config;
use crate::cli::args::IgnoreArgs;
use crate::assemble::Assembler;
use crate::prompts::QUESTION_PROMPT;

/// Ask `question` about a file, or about the most relevant files under a
/// directory.
pub async fn execute_ask_command(
    path: &Path,
    question: &str,
    average: bool,
    ignore: &IgnoreArgs,
    prompt_only: bool,
    config: &Config,
) -> Result<()> {
    let run = RunCounters::load(config)?;
    let assembler = Assembler::for_config(config, run.counters());

    let prompt = if path.is_dir() {
        let files = walk_corpus(path, ignore, config)?;
        assembler.ask_corpus(&files, question, merge_mode(average))?
    } else {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        assembler.ask_file(&path.display().to_string(), &contents, question)?
    };

    let backend = DeferredBackend::new(config);
    deliver(&prompt, QUESTION_PROMPT, prompt_only, &backend, run.exact(), config).await
}
