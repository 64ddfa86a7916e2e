use std::collections::{HashMap, HashSet};

use promptpack_retrieval::{ScoreSheet, rank};
use promptpack_tokens::{Counters, TokenCounter};
use promptpack_utils::error::PackError;
use tracing::warn;

use crate::candidate::Candidate;

/// The order in which the packer considers candidates.
///
/// Every policy feeds the same scan: include while the running total fits,
/// stop at the first candidate that does not.
#[derive(Debug, Clone, Copy)]
pub enum PackPolicy<'a> {
    /// Descending score from the sheet, ties by insertion order. Candidates
    /// absent from the sheet are not eligible.
    RelevanceFirst(&'a ScoreSheet),
    /// Ascending token count, ties by insertion order. Ignores relevance.
    SizeFirst,
    /// The order the candidates were given in.
    InsertionOrder,
}

impl PackPolicy<'_> {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RelevanceFirst(_) => "relevance-first",
            Self::SizeFirst => "size-first",
            Self::InsertionOrder => "insertion-order",
        }
    }

    /// Eligible candidates in scan order, duplicates removed.
    ///
    /// # Errors
    ///
    /// Size-first ordering counts tokens and propagates tokenizer failures.
    pub fn order<'c>(
        &self,
        candidates: &'c [Candidate],
        counter: &dyn TokenCounter,
    ) -> Result<Vec<&'c Candidate>, PackError> {
        self.order_with(candidates, Counters::single(counter))
    }

    /// Like [`order`](Self::order), sizing candidates with the estimating
    /// counter.
    ///
    /// # Errors
    ///
    /// Size-first ordering counts tokens and propagates tokenizer failures.
    pub fn order_with<'c>(
        &self,
        candidates: &'c [Candidate],
        counters: Counters<'_>,
    ) -> Result<Vec<&'c Candidate>, PackError> {
        let unique = unique_candidates(candidates);

        match self {
            Self::InsertionOrder => Ok(unique),
            Self::SizeFirst => {
                let mut sized = unique
                    .into_iter()
                    .map(|c| Ok((c.estimated_tokens(counters)?, c)))
                    .collect::<Result<Vec<_>, PackError>>()?;
                // sort_by_key is stable, so equal sizes keep insertion order
                sized.sort_by_key(|(tokens, _)| *tokens);
                Ok(sized.into_iter().map(|(_, c)| c).collect())
            }
            Self::RelevanceFirst(sheet) => {
                let ids: Vec<&str> = unique.iter().map(|c| c.id()).collect();
                let by_id: HashMap<&str, &'c Candidate> =
                    unique.iter().map(|c| (c.id(), *c)).collect();
                Ok(rank(sheet, &ids)
                    .iter()
                    .filter_map(|id| by_id.get(id.as_str()).copied())
                    .collect())
            }
        }
    }
}

/// First occurrence of each id, in input order.
fn unique_candidates(candidates: &[Candidate]) -> Vec<&Candidate> {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if seen.insert(candidate.id()) {
            unique.push(candidate);
        } else {
            warn!(id = %candidate.id(), "Duplicate candidate id, keeping first occurrence");
        }
    }
    unique
}
