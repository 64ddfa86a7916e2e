//! Token-budgeted prompt packing for promptpack.
//!
//! Candidates (files, per-file diffs, comments) are ordered by a
//! [`PackPolicy`] and greedily packed under a token budget by [`pack`]. The
//! scan stops at the first candidate that does not fit. [`Compressor`]
//! shrinks fragments that are too large on their own before a size-first
//! pack. The corpus and diff helpers produce candidates from a working tree
//! or `git diff` output.

mod budget;
mod candidate;
mod compress;
mod corpus;
mod diff;
mod packer;
mod policy;
mod render;

pub use budget::TokenBudget;
pub use candidate::Candidate;
pub use compress::{COMPRESS_DIFF_PROMPT, Compressor};
pub use corpus::{CorpusFile, CorpusWalker, DEFAULT_MAX_FILE_SIZE};
pub use diff::{FileDiff, UNSPLIT_DIFF_ID, split_unified_diff};
pub use packer::{PackedContext, pack, pack_with_counters};
pub use policy::PackPolicy;
pub use render::{AssembledPrompt, comment_section, diff_header, file_section};
