//! Relevance retrieval for promptpack.
//!
//! A [`RelevanceIndex`] is built over the candidate corpus for a single
//! invocation and dropped afterwards. Searches produce [`ScoreSheet`]s that
//! are combined with [`merge`] or [`average`] and turned into an ordering with
//! [`rank`].

mod index;
mod query;
mod scores;
mod search;

pub use index::RelevanceIndex;
pub use query::{match_expression, split_terms};
pub use scores::{ScoreSheet, average, merge, rank};
pub use search::{MergeMode, multi_query_search};
