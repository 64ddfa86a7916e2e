//! `promptpack describe`

use std::path::Path;

use anyhow::Result;
use promptpack_packet::Compressor;
use promptpack_tokens::effective_window;
use tracing::{debug, warn};

use super::common::{DeferredBackend, RunCounters, deliver, read_input};
use crate::assemble::{Assembler, PullRequestInput, generate_title};
use crate::prompts::PR_BODY_PROMPT;
use crate::{Config, ConfigError, PromptPackError};

/// Write a pull request body for a diff. Prints the title and the body, or
/// only the prompt with `--prompt-only`.
pub async fn execute_describe_command(
    diff_file: Option<&Path>,
    title: Option<String>,
    log_file: Option<&Path>,
    prompt_only: bool,
    config: &Config,
) -> Result<()> {
    let diff = read_input(diff_file)?;
    let logs = match log_file {
        Some(path) => read_input(Some(path))?,
        None => String::new(),
    };
    if diff.trim().is_empty() {
        warn!("Diff is empty");
    }

    let backend = DeferredBackend::new(config);
    let run = RunCounters::load(config)?;
    let window = effective_window(config.model(), config.context_window());

    let title = match title {
        Some(title) => title,
        None if logs.trim().is_empty() => {
            return Err(PromptPackError::from(ConfigError::MissingRequired(
                "--title (or --log to generate one)".to_string(),
            ))
            .into());
        }
        None => {
            debug!("Generating title from logs");
            generate_title(
                &backend,
                config.model(),
                config.llm_timeout(),
                &logs,
                window,
                run.exact(),
            )
            .await?
        }
    };

    let assembler = Assembler::for_config(config, run.counters());
    let selectors = config.selectors.compile().map_err(PromptPackError::from)?;
    let compressor = Compressor::new(&backend, config.model(), config.llm_timeout(), window);

    let input = PullRequestInput { title, logs, diff };
    let prompt = assembler
        .describe(&input, &compressor, Some(&selectors))
        .await?;

    if prompt_only {
        return deliver(&prompt, PR_BODY_PROMPT, true, &backend, run.exact(), config).await;
    }

    println!("Title: {}", input.title);
    print!("Body: ");
    deliver(&prompt, PR_BODY_PROMPT, false, &backend, run.exact(), config).await
}
