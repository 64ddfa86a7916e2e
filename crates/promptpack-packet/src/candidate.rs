use once_cell::sync::OnceCell;
use promptpack_tokens::{Counters, TokenCounter};
use promptpack_utils::error::PackError;

/// A unit of text eligible for a prompt: a file, a per-file diff, a comment.
///
/// The token count is computed on first use and cached, so repeated packing
/// runs over the same candidates never re-tokenize. The cache holds the
/// count budget decisions are made with; estimates used only for ordering
/// are never cached.
#[derive(Debug, Clone)]
pub struct Candidate {
    id: String,
    content: String,
    token_count: OnceCell<usize>,
}

impl Candidate {
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            token_count: OnceCell::new(),
        }
    }

    /// Candidate with a known token count.
    #[must_use]
    pub fn with_token_count(id: impl Into<String>, content: impl Into<String>, tokens: usize) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            token_count: OnceCell::with_value(tokens),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Token cost of the content, counted once.
    pub fn tokens(&self, counter: &dyn TokenCounter) -> Result<usize, PackError> {
        self.token_count
            .get_or_try_init(|| counter.count(&self.content))
            .copied()
    }

    /// Cost used to order candidates.
    ///
    /// A cached count is reused. Otherwise the estimating counter is used,
    /// and its result is only cached when it counts like the exact one.
    pub fn estimated_tokens(&self, counters: Counters<'_>) -> Result<usize, PackError> {
        if let Some(tokens) = self.cached_tokens() {
            return Ok(tokens);
        }
        if counters.estimates_are_exact() {
            return self.tokens(counters.exact);
        }
        counters.estimate.count(&self.content)
    }

    /// The cached count, if one has been computed.
    #[must_use]
    pub fn cached_tokens(&self) -> Option<usize> {
        self.token_count.get().copied()
    }

    /// Same id, new content. The token count is recomputed on next use.
    #[must_use]
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self::new(self.id.clone(), content)
    }
}
