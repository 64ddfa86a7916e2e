use crate::candidate::Candidate;

/// Id used when a diff has no `diff --git` headers to split on.
pub const UNSPLIT_DIFF_ID: &str = "diff";

/// The part of a unified diff that touches one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Post-image path (`b/` side) of the file.
    pub path: String,
    /// The diff text for this file, starting at its `diff --git` line.
    pub diff: String,
}

impl FileDiff {
    #[must_use]
    pub fn to_candidate(&self) -> Candidate {
        Candidate::new(self.path.clone(), self.diff.clone())
    }
}

/// Split `git diff` output into per-file pieces, in input order.
///
/// Text before the first `diff --git` line is dropped. Input without any
/// such line but with non-blank content comes back as a single piece with id
/// [`UNSPLIT_DIFF_ID`].
#[must_use]
pub fn split_unified_diff(diff: &str) -> Vec<FileDiff> {
    let mut pieces: Vec<FileDiff> = Vec::new();

    for line in diff.split_inclusive('\n') {
        if let Some(header) = line.strip_prefix("diff --git ") {
            pieces.push(FileDiff {
                path: header_path(header.trim_end()),
                diff: String::new(),
            });
        }
        if let Some(current) = pieces.last_mut() {
            current.diff.push_str(line);
        }
    }

    if pieces.is_empty() && !diff.trim().is_empty() {
        pieces.push(FileDiff {
            path: UNSPLIT_DIFF_ID.to_string(),
            diff: diff.to_string(),
        });
    }
    pieces
}

/// `a/old b/new` -> `new`
fn header_path(header: &str) -> String {
    match header.rfind(" b/") {
        Some(idx) => header[idx + 3..].to_string(),
        None => header.to_string(),
    }
}
