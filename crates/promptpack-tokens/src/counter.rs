use promptpack_utils::error::PackError;
use promptpack_utils::types::TokenStrategy;
use tiktoken_rs::CoreBPE;

/// Maps text to an integer token cost.
///
/// Implementations must be deterministic: the same text always has the same
/// cost under the same counter.
pub trait TokenCounter: Send + Sync {
    /// Token cost of `text`.
    fn count(&self, text: &str) -> Result<usize, PackError>;

    /// Short name for logs. Counters with the same name count identically.
    fn name(&self) -> &'static str;

    /// Sum of the per-text costs.
    fn count_all(&self, texts: &[&str]) -> Result<usize, PackError> {
        texts.iter().try_fold(0usize, |acc, text| {
            Ok(acc.saturating_add(self.count(text)?))
        })
    }
}

/// Exact counts from the `cl100k_base` BPE tokenizer.
pub struct ExactCounter {
    tokenizer: CoreBPE,
}

impl ExactCounter {
    /// Load the tokenizer.
    pub fn new() -> Result<Self, PackError> {
        let tokenizer = tiktoken_rs::cl100k_base().map_err(|e| {
            PackError::tokenization(format!("Failed to load cl100k_base tokenizer: {e}"))
        })?;
        Ok(Self { tokenizer })
    }
}

impl std::fmt::Debug for ExactCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactCounter").finish_non_exhaustive()
    }
}

impl TokenCounter for ExactCounter {
    fn count(&self, text: &str) -> Result<usize, PackError> {
        Ok(self.tokenizer.encode_ordinary(text).len())
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

/// Byte length divided by four. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastCounter;

impl TokenCounter for FastCounter {
    fn count(&self, text: &str) -> Result<usize, PackError> {
        Ok(text.len() / 4)
    }

    fn name(&self) -> &'static str {
        "fast"
    }
}

/// The two counters one packing run uses.
///
/// `estimate` orders candidates and feeds logs. `exact` makes every
/// accept/reject decision against a budget, so it is always the tokenizer
/// outside of tests.
#[derive(Clone, Copy)]
pub struct Counters<'a> {
    pub estimate: &'a dyn TokenCounter,
    pub exact: &'a dyn TokenCounter,
}

impl<'a> Counters<'a> {
    #[must_use]
    pub const fn new(estimate: &'a dyn TokenCounter, exact: &'a dyn TokenCounter) -> Self {
        Self { estimate, exact }
    }

    /// One counter in both roles.
    #[must_use]
    pub const fn single(counter: &'a dyn TokenCounter) -> Self {
        Self::new(counter, counter)
    }

    /// Counters for a configured strategy: `fast` only changes the estimates.
    #[must_use]
    pub fn for_strategy(strategy: TokenStrategy, exact: &'a ExactCounter) -> Self {
        match strategy {
            TokenStrategy::Exact => Self::single(exact),
            TokenStrategy::Fast => Self::new(&FastCounter, exact),
        }
    }

    /// True when estimates and decisions count the same way.
    #[must_use]
    pub fn estimates_are_exact(&self) -> bool {
        self.estimate.name() == self.exact.name()
    }
}

impl std::fmt::Debug for Counters<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counters")
            .field("estimate", &self.estimate.name())
            .field("exact", &self.exact.name())
            .finish()
    }
}

/// Counter for a configured strategy.
pub fn counter_for(strategy: TokenStrategy) -> Result<Box<dyn TokenCounter>, PackError> {
    match strategy {
        TokenStrategy::Exact => Ok(Box::new(ExactCounter::new()?)),
        TokenStrategy::Fast => Ok(Box::new(FastCounter)),
    }
}
