use promptpack_tokens::{Counters, TokenCounter};
use promptpack_utils::error::PackError;
use promptpack_utils::logging::{log_pack_complete, pack_span};
use tracing::debug;

use crate::budget::TokenBudget;
use crate::candidate::Candidate;
use crate::policy::PackPolicy;

/// The outcome of one packing run: the selected candidates in scan order and
/// their combined token cost.
#[derive(Debug, Clone)]
pub struct PackedContext {
    candidates: Vec<Candidate>,
    total_tokens: usize,
    budget: usize,
}

impl PackedContext {
    #[must_use]
    pub const fn empty(budget: usize) -> Self {
        Self {
            candidates: Vec::new(),
            total_tokens: 0,
            budget,
        }
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.candidates.iter().map(Candidate::id).collect()
    }

    #[must_use]
    pub const fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[must_use]
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// Greedily select candidates under `budget`.
///
/// Candidates are scanned in the order `policy` dictates. Each one is
/// included while the running total stays within the budget; the scan stops
/// at the first candidate that would overflow it, even if a later and smaller
/// one would still fit. When the first candidate alone is over budget the
/// result is empty rather than an error.
///
/// # Errors
///
/// Returns `PackError::Tokenization` when the counter fails.
pub fn pack(
    candidates: &[Candidate],
    policy: PackPolicy<'_>,
    budget: usize,
    counter: &dyn TokenCounter,
) -> Result<PackedContext, PackError> {
    pack_with_counters(candidates, policy, budget, Counters::single(counter))
}

/// [`pack`] with separate counters for ordering and for the budget.
///
/// The estimating counter only decides scan order. Whether a candidate fits
/// is always decided with the exact counter.
///
/// # Errors
///
/// Returns `PackError::Tokenization` when either counter fails.
pub fn pack_with_counters(
    candidates: &[Candidate],
    policy: PackPolicy<'_>,
    budget: usize,
    counters: Counters<'_>,
) -> Result<PackedContext, PackError> {
    let span = pack_span(policy.name(), budget);
    let _enter = span.enter();

    let ordered = policy.order_with(candidates, counters)?;
    let considered = ordered.len();
    let mut usage = TokenBudget::new(budget);
    let mut selected = Vec::new();

    for candidate in ordered {
        let tokens = candidate.tokens(counters.exact)?;
        if usage.would_exceed(tokens) {
            debug!(
                id = %candidate.id(),
                tokens = tokens,
                remaining = usage.remaining(),
                "Candidate does not fit, stopping scan"
            );
            break;
        }
        usage.add(tokens);
        selected.push(candidate.clone());
    }

    log_pack_complete(policy.name(), selected.len(), considered, usage.used, budget);

    Ok(PackedContext {
        candidates: selected,
        total_tokens: usage.used,
        budget,
    })
}
