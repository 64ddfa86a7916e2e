//! CLI argument definitions and parsing structures

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// promptpack - token-budgeted prompts from files, diffs and issues
#[derive(Parser, Debug)]
#[command(name = "promptpack")]
#[command(about = "Assemble token-budgeted LLM prompts from repositories, diffs and issues")]
#[command(long_about = r#"
promptpack ranks repository files, per-file diffs and issue comments, packs
the best of them into the active model's token budget and asks the model.

EXAMPLES:
  # Ask about the files most relevant to a question
  promptpack ask . -q "How is the config file discovered?"

  # Ask about one file
  promptpack ask src/main.rs -q "What does main return?"

  # Answer a question about an exported GitHub issue using its comments
  promptpack issue --issue-file issue.json -q "What is the root cause?" --comments

  # Write a pull request body from a diff on stdin
  git diff main... | promptpack describe --title "Add retries" --log log.txt

  # Print the prompt without calling the model
  promptpack ask . -q "Where are tokens counted?" --prompt-only

  # Count tokens
  promptpack count src/lib.rs src/main.rs

CONFIGURATION:
  Precedence: CLI flags > environment > config file > defaults
  The config file is discovered by searching upward from the working
  directory for .promptpack/config.toml. Use --config to give a path.
  The API key is read from the variable named by [llm] api_key_env
  (OPENAI_API_KEY by default).
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model used for completions and budget lookup
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Token counting strategy (exact or fast)
    #[arg(long, global = true, value_parser = ["exact", "fast"])]
    pub token_strategy: Option<String>,

    /// Context window override for the active model
    #[arg(long, global = true)]
    pub context_window: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about a file or a directory of files
    Ask {
        /// File or directory to ask about
        path: PathBuf,

        /// The question to ask
        #[arg(short, long)]
        question: String,

        /// Rank files by average rather than summed score
        #[arg(long)]
        average: bool,

        #[command(flatten)]
        ignore: IgnoreArgs,

        /// Print the prompt instead of sending it
        #[arg(short, long)]
        prompt_only: bool,
    },

    /// Answer a question about an issue exported as JSON
    Issue {
        /// Issue JSON: {number, title, body, comments: [{author, body}]}
        #[arg(long)]
        issue_file: PathBuf,

        /// The question to ask
        #[arg(short, long)]
        question: String,

        /// Use the issue comments as context instead of repository files
        #[arg(short, long)]
        comments: bool,

        /// Repository searched for relevant files
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Rank files by average rather than summed score
        #[arg(long)]
        average: bool,

        #[command(flatten)]
        ignore: IgnoreArgs,

        /// Print the prompt instead of sending it
        #[arg(short, long)]
        prompt_only: bool,
    },

    /// Write a pull request body from a unified diff
    Describe {
        /// Diff file; reads stdin when omitted
        diff_file: Option<PathBuf>,

        /// Pull request title; generated from the logs when omitted
        #[arg(short, long)]
        title: Option<String>,

        /// File with the branch's commit logs
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// Print the prompt instead of sending it
        #[arg(short, long)]
        prompt_only: bool,
    },

    /// Count tokens in files (or stdin) with the configured strategy
    Count {
        /// Files to count; reads stdin when omitted
        files: Vec<PathBuf>,
    },

    /// Show the effective configuration and where each value came from
    Config,
}

/// Which ignore files prune a repository walk. The root's `.gptignore` is
/// always read.
#[derive(Args, Debug, Clone, Default)]
pub struct IgnoreArgs {
    /// Do not read the repository's .gitignore
    #[arg(long)]
    pub ignore_gitignore: bool,

    /// Extra gitignore-style file of paths to leave out
    #[arg(long = "ignore", value_name = "FILE")]
    pub ignore_file: Option<PathBuf>,
}
