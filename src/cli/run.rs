//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration once, initializes
//! logging, creates the tokio runtime and dispatches to a command handler.
//! It prints every error itself and returns the exit code.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use crate::{CliArgs, Config, ExitCode, PromptPackError};
use promptpack_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after printing the error; main.rs only maps it to
/// a process exit.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        model: cli.model.clone(),
        token_strategy: cli.token_strategy.clone(),
        context_window: cli.context_window,
        verbose: cli.verbose.then_some(true),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = PromptPackError::from(err);
            eprintln!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    if let Err(e) = init_tracing(config.verbose()) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let operation = match &cli.command {
        Commands::Ask { .. } => "ask",
        Commands::Issue { .. } => "issue",
        Commands::Describe { .. } => "describe",
        Commands::Count { .. } => "count",
        Commands::Config => "config",
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Ask {
                path,
                question,
                average,
                ignore,
                prompt_only,
            } => {
                commands::execute_ask_command(
                    &path,
                    &question,
                    average,
                    &ignore,
                    prompt_only,
                    &config,
                )
                .await
            }
            Commands::Issue {
                issue_file,
                question,
                comments,
                repo,
                average,
                ignore,
                prompt_only,
            } => {
                commands::execute_issue_command(
                    &issue_file,
                    &question,
                    comments,
                    &repo,
                    average,
                    &ignore,
                    prompt_only,
                    &config,
                )
                .await
            }
            Commands::Describe {
                diff_file,
                title,
                log,
                prompt_only,
            } => {
                commands::execute_describe_command(
                    diff_file.as_deref(),
                    title,
                    log.as_deref(),
                    prompt_only,
                    &config,
                )
                .await
            }
            Commands::Count { files } => commands::execute_count_command(&files, &config),
            Commands::Config => commands::execute_config_command(&config),
        }
    });

    if let Err(error) = result {
        if let Some(err) = error.downcast_ref::<PromptPackError>() {
            eprint!("{}", err.display_for_user());
            tracing::debug!(operation = operation, error = %format!("{error:#}"), "Command failed");
            return Err(err.to_exit_code());
        }

        eprintln!("✗ {operation} failed: {error:#}");
        if let Some(suggestions) = enhance_error_context(&error) {
            eprintln!("\n  Suggestions:");
            for (i, suggestion) in suggestions.iter().enumerate() {
                eprintln!("    {}. {}", i + 1, suggestion);
            }
        }
        return Err(ExitCode::INTERNAL);
    }

    Ok(())
}

/// Suggestions for common failures that are not `PromptPackError`s
fn enhance_error_context(error: &anyhow::Error) -> Option<Vec<String>> {
    let error_str = format!("{error:#}");

    if error_str.contains("Permission denied") {
        Some(vec![
            "Check file and directory permissions".to_string(),
            "Ensure the input files are readable".to_string(),
        ])
    } else if error_str.contains("No such file or directory") {
        Some(vec![
            "Verify the specified paths exist".to_string(),
            "Check that you're running from the correct directory".to_string(),
        ])
    } else if error_str.contains("Failed to parse issue file") {
        Some(vec![
            "The issue file must be JSON: {\"number\", \"title\", \"body\", \"comments\"}".to_string(),
            "Each comment needs \"author\" and \"body\" fields".to_string(),
        ])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_missing_file_suggestions() {
        let err = std::fs::read_to_string("/definitely/not/here.txt")
            .context("Failed to read diff")
            .unwrap_err();
        let suggestions = enhance_error_context(&err).unwrap();
        assert!(suggestions[0].contains("paths exist"));
    }

    #[test]
    fn test_issue_parse_suggestions() {
        let err = anyhow::anyhow!("Failed to parse issue file: issue.json");
        let suggestions = enhance_error_context(&err).unwrap();
        assert!(suggestions.iter().any(|s| s.contains("author")));
    }

    #[test]
    fn test_unknown_errors_have_no_suggestions() {
        assert!(enhance_error_context(&anyhow::anyhow!("boom")).is_none());
    }
}
