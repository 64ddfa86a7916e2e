//! Compression fallback for fragments that do not fit on their own
//!
//! An oversized fragment is replaced by a short model-written description of
//! it. Each fragment is compressed at most once; a description that still
//! does not fit is dropped. So is a fragment too large to send in a single
//! request to the model.

use std::time::Duration;

use promptpack_llm::{LlmBackend, LlmInvocation, Message};
use promptpack_tokens::{CHAT_FRAMING_TOKENS, Counters, TokenCounter};
use promptpack_utils::error::PackError;
use tracing::{debug, info, warn};

use crate::candidate::Candidate;
use crate::packer::{PackedContext, pack_with_counters};
use crate::policy::PackPolicy;

/// Instruction sent with every compression request.
pub const COMPRESS_DIFF_PROMPT: &str = "You are a helpful assistant who describes git diff changes. You will be given a Git diff and you should use it to create a description of the changes. The description should be no longer than 75 characters long and should describe the changes in the diff. Do not include the file names in the description.";

/// Shrinks candidates through an LLM backend.
///
/// `window` is the model's context window. A request and its reply never
/// exceed it together.
pub struct Compressor<'a> {
    backend: &'a dyn LlmBackend,
    model: String,
    timeout: Duration,
    window: usize,
}

impl<'a> Compressor<'a> {
    #[must_use]
    pub fn new(
        backend: &'a dyn LlmBackend,
        model: impl Into<String>,
        timeout: Duration,
        window: usize,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout,
            window,
        }
    }

    /// Tokens a compression request for `candidate` takes up before the reply.
    fn request_tokens(&self, candidate: &Candidate, counter: &dyn TokenCounter) -> Result<usize, PackError> {
        Ok(counter.count(COMPRESS_DIFF_PROMPT)? + candidate.tokens(counter)? + CHAT_FRAMING_TOKENS)
    }

    /// Replace the candidate's content with a model-written summary.
    ///
    /// `hint` is forwarded to the backend as the completion's `max_tokens`,
    /// lowered to whatever room the request leaves in the window.
    ///
    /// # Errors
    ///
    /// - `PackError::BudgetExceeded` when the request alone fills the window;
    ///   the backend is not called
    /// - `PackError::Compression` carrying the candidate id when the backend
    ///   call fails
    /// - `PackError::Tokenization` when the counter fails
    pub async fn compress(
        &self,
        candidate: &Candidate,
        hint: usize,
        counter: &dyn TokenCounter,
    ) -> Result<Candidate, PackError> {
        let request = self.request_tokens(candidate, counter)?;
        if request >= self.window {
            return Err(PackError::BudgetExceeded {
                required: request + 1,
                budget: self.window,
            });
        }
        let room = self.window - request;

        let inv = LlmInvocation::new(
            "compress",
            self.model.as_str(),
            self.timeout,
            vec![
                Message::system(COMPRESS_DIFF_PROMPT),
                Message::user(candidate.content()),
            ],
        )
        .with_metadata("max_tokens", serde_json::json!(hint.min(room).max(1)));

        let result = self
            .backend
            .invoke(inv)
            .await
            .map_err(|source| PackError::Compression {
                id: candidate.id().to_string(),
                source,
            })?;

        debug!(
            id = %candidate.id(),
            original_chars = candidate.content().len(),
            compressed_chars = result.raw_response.len(),
            "Candidate compressed"
        );
        Ok(candidate.with_content(result.raw_response))
    }

    /// Size-first packing where candidates over `budget` on their own are
    /// compressed first.
    ///
    /// Fit is decided with the exact counter; the estimate only orders the
    /// final pack.
    ///
    /// # Errors
    ///
    /// - `PackError::Compression` when a compression call fails
    /// - `PackError::BudgetExceeded` when candidates were given but none of
    ///   them fits, even after compression
    /// - `PackError::Tokenization` when a counter fails
    pub async fn pack_with_compression(
        &self,
        candidates: &[Candidate],
        budget: usize,
        counters: Counters<'_>,
    ) -> Result<PackedContext, PackError> {
        let exact = counters.exact;
        let mut survivors = Vec::with_capacity(candidates.len());
        let mut smallest_dropped: Option<usize> = None;

        for candidate in PackPolicy::InsertionOrder.order(candidates, exact)? {
            let tokens = candidate.tokens(exact)?;
            if tokens <= budget {
                survivors.push(candidate.clone());
                continue;
            }

            if self.request_tokens(candidate, exact)? >= self.window {
                warn!(
                    id = %candidate.id(),
                    tokens = tokens,
                    window = self.window,
                    "Candidate too large to send for compression, dropping"
                );
                smallest_dropped = Some(smallest_dropped.map_or(tokens, |s| s.min(tokens)));
                continue;
            }

            let compressed = self.compress(candidate, budget, exact).await?;
            let compressed_tokens = compressed.tokens(exact)?;
            if compressed_tokens > budget {
                warn!(
                    id = %candidate.id(),
                    tokens = compressed_tokens,
                    budget = budget,
                    "Compressed candidate still over budget, dropping"
                );
                smallest_dropped = Some(
                    smallest_dropped.map_or(compressed_tokens, |s| s.min(compressed_tokens)),
                );
                continue;
            }
            info!(
                id = %candidate.id(),
                before = tokens,
                after = compressed_tokens,
                "Compressed oversized candidate"
            );
            survivors.push(compressed);
        }

        let packed = pack_with_counters(&survivors, PackPolicy::SizeFirst, budget, counters)?;
        if packed.is_empty()
            && let Some(required) = smallest_dropped
        {
            return Err(PackError::BudgetExceeded { required, budget });
        }
        Ok(packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use promptpack_llm::{LlmError, LlmResult};
    use promptpack_tokens::FastCounter;
    use std::sync::Mutex;

    /// Answers every request with a fixed reply and records the requests.
    struct FixedReply {
        reply: String,
        seen: Mutex<Vec<LlmInvocation>>,
    }

    impl FixedReply {
        fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmBackend for FixedReply {
        async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            self.seen.lock().unwrap().push(inv);
            Ok(LlmResult::new(self.reply.clone(), "fixed", "mock"))
        }
    }

    struct Unreachable;

    #[async_trait]
    impl LlmBackend for Unreachable {
        async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            Err(LlmError::Transport("connection refused".to_string()))
        }
    }

    const WINDOW: usize = 8192;

    fn timeout() -> Duration {
        Duration::from_secs(5)
    }

    fn fast() -> Counters<'static> {
        Counters::single(&FastCounter)
    }

    #[tokio::test]
    async fn test_compress_sends_instruction_and_hint() {
        let backend = FixedReply::new("Adds a retry counter");
        let compressor = Compressor::new(&backend, "gpt-4", timeout(), WINDOW);
        let candidate = Candidate::new("src/net.rs", "+ let retries = 3;");

        let compressed = compressor.compress(&candidate, 64, &FastCounter).await.unwrap();

        assert_eq!(compressed.id(), "src/net.rs");
        assert_eq!(compressed.content(), "Adds a retry counter");

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].purpose, "compress");
        assert_eq!(seen[0].model, "gpt-4");
        assert_eq!(seen[0].messages[0], Message::system(COMPRESS_DIFF_PROMPT));
        assert_eq!(seen[0].messages[1], Message::user("+ let retries = 3;"));
        assert_eq!(seen[0].metadata["max_tokens"], serde_json::json!(64));
    }

    #[tokio::test]
    async fn test_hint_is_lowered_to_fit_the_window() {
        let backend = FixedReply::new("short");
        let window = 300;
        let compressor = Compressor::new(&backend, "gpt-3.5-turbo", timeout(), window);
        let candidate = Candidate::new("src/big.rs", "x".repeat(400));

        compressor.compress(&candidate, 1000, &FastCounter).await.unwrap();

        let request = FastCounter.count(COMPRESS_DIFF_PROMPT).unwrap() + 100 + CHAT_FRAMING_TOKENS;
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].metadata["max_tokens"], serde_json::json!(window - request));
    }

    #[tokio::test]
    async fn test_request_larger_than_window_is_not_sent() {
        let backend = FixedReply::new("unused");
        let compressor = Compressor::new(&backend, "gpt-3.5-turbo", timeout(), 100);
        let candidate = Candidate::new("src/big.rs", "x".repeat(400));

        let result = compressor.compress(&candidate, 50, &FastCounter).await;

        assert!(matches!(
            result,
            Err(PackError::BudgetExceeded { budget: 100, .. })
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsendable_candidate_is_dropped_from_pack() {
        let backend = FixedReply::new("unused");
        let compressor = Compressor::new(&backend, "gpt-3.5-turbo", timeout(), 100);
        let candidates = vec![
            Candidate::new("huge.rs", "x".repeat(400)),
            Candidate::with_token_count("small.rs", "", 20),
        ];

        let packed = compressor
            .pack_with_compression(&candidates, 50, fast())
            .await
            .unwrap();

        assert_eq!(packed.ids(), ["small.rs"]);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_candidate_is_compressed_then_packed() {
        let backend = FixedReply::new("y".repeat(480));
        let compressor = Compressor::new(&backend, "gpt-4", timeout(), WINDOW);
        let candidates = vec![Candidate::new("big.rs", "x".repeat(2000))];

        let packed = compressor
            .pack_with_compression(&candidates, 300, fast())
            .await
            .unwrap();

        assert_eq!(packed.ids(), ["big.rs"]);
        assert_eq!(packed.total_tokens(), 120);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_fitting_candidates_are_not_compressed() {
        let backend = FixedReply::new("unused");
        let compressor = Compressor::new(&backend, "gpt-4", timeout(), WINDOW);
        let candidates = vec![
            Candidate::with_token_count("a", "", 100),
            Candidate::with_token_count("c", "", 50),
        ];

        let packed = compressor
            .pack_with_compression(&candidates, 250, fast())
            .await
            .unwrap();

        assert_eq!(packed.ids(), ["c", "a"]);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_still_oversized_after_compression_is_dropped() {
        let backend = FixedReply::new("z".repeat(1600));
        let compressor = Compressor::new(&backend, "gpt-4", timeout(), WINDOW);
        let candidates = vec![
            Candidate::new("huge.rs", "x".repeat(4000)),
            Candidate::with_token_count("small.rs", "", 40),
        ];

        let packed = compressor
            .pack_with_compression(&candidates, 300, fast())
            .await
            .unwrap();

        assert_eq!(packed.ids(), ["small.rs"]);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_nothing_fits_is_budget_exceeded() {
        let backend = FixedReply::new("z".repeat(1600));
        let compressor = Compressor::new(&backend, "gpt-4", timeout(), WINDOW);
        let candidates = vec![Candidate::new("huge.rs", "x".repeat(4000))];

        match compressor
            .pack_with_compression(&candidates, 300, fast())
            .await
        {
            Err(PackError::BudgetExceeded { required, budget }) => {
                assert_eq!(required, 400);
                assert_eq!(budget, 300);
            }
            other => panic!("Expected BudgetExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compression_failure_names_the_candidate() {
        let compressor = Compressor::new(&Unreachable, "gpt-4", timeout(), WINDOW);
        let candidates = vec![Candidate::new("big.rs", "x".repeat(2000))];

        match compressor
            .pack_with_compression(&candidates, 300, fast())
            .await
        {
            Err(PackError::Compression { id, source }) => {
                assert_eq!(id, "big.rs");
                assert!(matches!(source, LlmError::Transport(_)));
            }
            other => panic!("Expected Compression error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_empty_context() {
        let compressor = Compressor::new(&Unreachable, "gpt-4", timeout(), WINDOW);
        let packed = compressor
            .pack_with_compression(&[], 300, fast())
            .await
            .unwrap();
        assert!(packed.is_empty());
    }
}
