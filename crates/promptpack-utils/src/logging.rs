//! Logging setup and structured log helpers for packing runs.

use tracing::{Level, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode enables debug output for
/// promptpack crates and span close events. Logs go to stderr so stdout stays
/// reserved for prompts and answers.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("promptpack=debug,info")
            } else {
                EnvFilter::try_new("promptpack=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one packing run.
pub fn pack_span(policy: &str, budget: usize) -> tracing::Span {
    span!(
        Level::INFO,
        "pack",
        policy = %policy,
        budget = budget,
    )
}

/// Log the outcome of a packing run with consistent field names.
pub fn log_pack_complete(policy: &str, selected: usize, considered: usize, total_tokens: usize, budget: usize) {
    info!(
        policy = %policy,
        selected = selected,
        considered = considered,
        total_tokens = total_tokens,
        budget = budget,
        "Packing completed"
    );
}

/// Log a fully assembled prompt by size and content hash.
pub fn log_prompt_assembled(command: &str, tokens: usize, hash: &str) {
    info!(
        command = %command,
        tokens = tokens,
        blake3 = %hash,
        "Prompt assembled"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_do_not_require_subscriber() {
        let span = pack_span("size_first", 100);
        let _guard = span.enter();
        log_pack_complete("size_first", 2, 3, 80, 100);
        log_prompt_assembled("ask", 80, "abc123");
    }

    #[test]
    fn test_init_tracing_twice_reports_error() {
        // A global subscriber can only be installed once per process.
        let first = init_tracing(false);
        let second = init_tracing(true);
        assert!(first.is_ok() || second.is_err());
        assert!(second.is_err());
    }
}
