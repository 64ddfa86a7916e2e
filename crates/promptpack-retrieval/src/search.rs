use promptpack_utils::error::PackError;
use tracing::debug;

use crate::index::RelevanceIndex;
use crate::query::split_terms;
use crate::scores::{ScoreSheet, average, merge};

/// How per-query sheets are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    #[default]
    Sum,
    Average,
}

/// Search the whole query, then each of its terms on its own, and combine
/// the resulting sheets.
///
/// Documents that match the full query and several individual terms
/// accumulate score from every search they appear in.
pub fn multi_query_search(
    index: &RelevanceIndex,
    query: &str,
    mode: MergeMode,
) -> Result<ScoreSheet, PackError> {
    let terms = split_terms(query);
    let mut sheets = Vec::with_capacity(terms.len() + 1);

    sheets.push(index.search(query)?);
    for term in &terms {
        sheets.push(index.search(term)?);
    }

    let combined = match mode {
        MergeMode::Sum => merge(&sheets),
        MergeMode::Average => average(&sheets),
    };

    debug!(
        searches = sheets.len(),
        mode = ?mode,
        hits = combined.len(),
        "Multi-query search completed"
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_rewards_documents_matching_more_terms() {
        let index = RelevanceIndex::build(vec![
            ("both", "packer budget greedy scan"),
            ("one", "packer only, nothing else here at all"),
            ("none", "unrelated words"),
        ])
        .unwrap();

        let sheet = multi_query_search(&index, "packer budget", MergeMode::Sum).unwrap();
        assert!(sheet.get("both").unwrap() > sheet.get("one").unwrap());
        assert!(!sheet.contains("none"));
    }

    #[test]
    fn test_average_keeps_every_hit() {
        let index = RelevanceIndex::build(vec![("a", "alpha beta"), ("b", "beta")]).unwrap();
        let sheet = multi_query_search(&index, "alpha beta", MergeMode::Average).unwrap();
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn test_no_terms_no_hits() {
        let index = RelevanceIndex::build(vec![("a", "alpha")]).unwrap();
        let sheet = multi_query_search(&index, "?!", MergeMode::Sum).unwrap();
        assert!(sheet.is_empty());
    }
}
