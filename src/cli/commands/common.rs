//! Helpers shared by the command handlers

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use once_cell::sync::OnceCell;
use promptpack_llm::{LlmBackend, LlmError, LlmInvocation, LlmResult, complete};
use promptpack_packet::{AssembledPrompt, CorpusFile, CorpusWalker};
use promptpack_retrieval::MergeMode;
use promptpack_tokens::{
    Counters, ExactCounter, TokenCounter, completion_room, counter_for, effective_window,
};
use promptpack_utils::types::TokenStrategy;
use tracing::info;

use crate::cli::args::IgnoreArgs;
use crate::{Config, PromptPackError};

/// Token counter for the configured strategy.
pub(super) fn token_counter(config: &Config) -> Result<Box<dyn TokenCounter>, PromptPackError> {
    let strategy = config.token_strategy()?;
    Ok(counter_for(strategy)?)
}

/// The tokenizer plus the configured strategy for estimates.
pub(super) struct RunCounters {
    exact: ExactCounter,
    strategy: TokenStrategy,
}

impl RunCounters {
    pub(super) fn load(config: &Config) -> Result<Self, PromptPackError> {
        Ok(Self {
            strategy: config.token_strategy()?,
            exact: ExactCounter::new()?,
        })
    }

    pub(super) fn counters(&self) -> Counters<'_> {
        Counters::for_strategy(self.strategy, &self.exact)
    }

    pub(super) fn exact(&self) -> &dyn TokenCounter {
        &self.exact
    }
}

/// Reply size that keeps `system` plus `prompt` plus the reply inside the
/// configured model's window.
pub(super) fn answer_room(
    prompt: &AssembledPrompt,
    system: &str,
    exact: &dyn TokenCounter,
    config: &Config,
) -> Result<usize, PromptPackError> {
    let window = effective_window(config.model(), config.context_window());
    let prompt_tokens = prompt.tokens.saturating_add(exact.count(system)?);
    Ok(completion_room(window, prompt_tokens))
}

pub(super) const fn merge_mode(average: bool) -> MergeMode {
    if average { MergeMode::Average } else { MergeMode::Sum }
}

/// Contents of `path`, or all of stdin when no path is given.
pub(super) fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Selected files under `root`, using the configured selectors and the
/// requested ignore files.
pub(super) fn walk_corpus(
    root: &Path,
    ignore: &IgnoreArgs,
    config: &Config,
) -> Result<Vec<CorpusFile>> {
    let root = utf8(root)?;
    let selectors = config.selectors.compile().map_err(PromptPackError::from)?;
    let mut walker = CorpusWalker::new(selectors).use_gitignore(!ignore.ignore_gitignore);
    if let Some(path) = &ignore.ignore_file {
        walker = walker.with_ignore_file(utf8(path)?);
    }
    let files = walker.walk(&root)?;
    info!(root = %root, files = files.len(), "Corpus collected");
    Ok(files)
}

fn utf8(path: &Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path.to_path_buf())
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))
}

/// Print the prompt, or send it and print the answer.
///
/// `prompt.tokens` must have been counted with `exact`.
pub(super) async fn deliver(
    prompt: &AssembledPrompt,
    system: &str,
    prompt_only: bool,
    backend: &dyn LlmBackend,
    exact: &dyn TokenCounter,
    config: &Config,
) -> Result<()> {
    if prompt_only {
        println!("{}", prompt.text);
        return Ok(());
    }

    let room = answer_room(prompt, system, exact, config)?;
    info!(
        tokens = prompt.tokens,
        max_completion = room,
        hash = %prompt.short_hash(),
        model = %config.model(),
        "Sending prompt"
    );
    let answer = complete(backend, config.model(), config.llm_timeout(), system, &prompt.text, room)
        .await
        .map_err(PromptPackError::from)?;
    println!("{answer}");
    Ok(())
}

/// Backend built from configuration on first use.
///
/// Commands that end up not calling the model (`--prompt-only` with nothing
/// to compress) never need an API key.
pub(super) struct DeferredBackend<'a> {
    config: &'a Config,
    inner: OnceCell<Box<dyn LlmBackend>>,
}

impl<'a> DeferredBackend<'a> {
    pub(super) fn new(config: &'a Config) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
        }
    }
}

#[async_trait]
impl LlmBackend for DeferredBackend<'_> {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let backend = self
            .inner
            .get_or_try_init(|| promptpack_llm::from_config(self.config))?;
        backend.invoke(inv).await
    }
}
