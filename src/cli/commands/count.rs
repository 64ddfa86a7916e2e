//! `promptpack count`

use std::path::PathBuf;

use anyhow::Result;
use promptpack_tokens::max_tokens;

use super::common::{read_input, token_counter};
use crate::{Config, PromptPackError};

/// Print the token count of each file (or stdin), a total and the model's
/// budget.
pub fn execute_count_command(files: &[PathBuf], config: &Config) -> Result<()> {
    let counter = token_counter(config)?;
    let mut total = 0usize;

    if files.is_empty() {
        let text = read_input(None)?;
        total = counter.count(&text).map_err(PromptPackError::from)?;
        println!("{total:>8} <stdin>");
    } else {
        for file in files {
            let text = read_input(Some(file))?;
            let tokens = counter.count(&text).map_err(PromptPackError::from)?;
            total = total.saturating_add(tokens);
            println!("{tokens:>8} {}", file.display());
        }
        if files.len() > 1 {
            println!("{total:>8} total");
        }
    }

    let budget = max_tokens(config.model(), config.context_window());
    println!(
        "model {} budget {budget} tokens ({} counting)",
        config.model(),
        counter.name()
    );
    if total > budget {
        println!("over budget by {} tokens", total - budget);
    }
    Ok(())
}
