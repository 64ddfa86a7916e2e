use blake3::Hasher;
use promptpack_tokens::TokenCounter;
use promptpack_utils::error::PackError;

use crate::candidate::Candidate;
use crate::packer::PackedContext;

/// `\n\nFile: path\ncontents`
#[must_use]
pub fn file_section(path: &str, contents: &str) -> String {
    format!("\n\nFile: {path}\n{contents}")
}

/// `\n\nComment:\nAuthor: a\nBody: b`
#[must_use]
pub fn comment_section(author: &str, body: &str) -> String {
    format!("\n\nComment:\nAuthor: {author}\nBody: {body}")
}

/// Header placed before each per-file diff (or its summary).
#[must_use]
pub fn diff_header(path: &str) -> String {
    format!("\n\n{path}:\n")
}

impl PackedContext {
    /// Candidate contents joined in packed order.
    #[must_use]
    pub fn concat(&self) -> String {
        self.candidates().iter().map(Candidate::content).collect()
    }

    /// Each candidate's content preceded by its diff header.
    #[must_use]
    pub fn render_diffs(&self) -> String {
        let mut out = String::new();
        for candidate in self.candidates() {
            out.push_str(&diff_header(candidate.id()));
            out.push_str(candidate.content());
        }
        out
    }
}

/// A finished prompt with its token cost and content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    pub tokens: usize,
    /// BLAKE3 hash of `text`, hex encoded.
    pub blake3_hash: String,
}

impl AssembledPrompt {
    /// Count and hash `text`.
    ///
    /// # Errors
    ///
    /// Returns `PackError::Tokenization` when the counter fails.
    pub fn new(text: String, counter: &dyn TokenCounter) -> Result<Self, PackError> {
        let tokens = counter.count(&text)?;
        let blake3_hash = content_hash(&text);
        Ok(Self {
            text,
            tokens,
            blake3_hash,
        })
    }

    #[must_use]
    pub fn short_hash(&self) -> &str {
        &self.blake3_hash[..self.blake3_hash.len().min(12)]
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content.as_bytes());
    hasher.finalize().to_hex().to_string()
}
