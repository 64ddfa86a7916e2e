use std::path::Path;

use anyhow::{Context, Result};
use promptpack_packet::{
    AssembledPrompt, Candidate, CorpusFile, PackPolicy, comment_section, pack_with_counters,
};
use promptpack_retrieval::MergeMode;
use promptpack_utils::error::{PackError, PromptPackError};
use serde::Deserialize;
use tracing::debug;

use super::Assembler;
use super::ask::rank_files;
use crate::prompts::QUESTION_PROMPT;

/// A GitHub issue exported to JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueFile {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub comments: Vec<IssueComment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueComment {
    pub author: String,
    pub body: String,
}

impl IssueFile {
    /// Read and parse an issue export.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read issue file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse issue file: {}", path.display()))
    }

    fn header(&self) -> String {
        format!("Issue #{}: Title: {}\n\n{}", self.number, self.title, self.body)
    }

    fn search_query(&self, question: &str) -> String {
        format!("{}\n{}\n{question}", self.title, self.body)
    }
}

fn question_suffix(question: &str) -> String {
    format!("\n\nGiven the following context, answer the following question: {question}")
}

impl Assembler<'_> {
    /// Prompt answering `question` from an issue and its comments, packed in
    /// the order they were written.
    ///
    /// # Errors
    ///
    /// `PackError::BudgetExceeded` when the issue and question alone do not
    /// fit.
    pub fn issue_with_comments(
        &self,
        issue: &IssueFile,
        question: &str,
    ) -> Result<AssembledPrompt, PromptPackError> {
        let header = issue.header();
        let suffix = question_suffix(question);
        let budget = self.reserve(&[QUESTION_PROMPT, header.as_str(), suffix.as_str()])?;

        let candidates: Vec<Candidate> = issue
            .comments
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                Candidate::new(
                    format!("comment-{}", idx + 1),
                    comment_section(&c.author, &c.body),
                )
            })
            .collect();
        let packed = pack_with_counters(
            &candidates,
            PackPolicy::InsertionOrder,
            budget.remaining(),
            self.counters,
        )?;
        debug!(
            included = packed.len(),
            total = candidates.len(),
            "Comments packed"
        );

        self.finish("issue", format!("{header}{}{suffix}", packed.concat()))
    }

    /// Prompt answering `question` from an issue and the repository files
    /// most relevant to it.
    ///
    /// # Errors
    ///
    /// - `PackError::BudgetExceeded` when the issue and question alone do
    ///   not fit, or leave no room for even the best-ranked file
    /// - `PackError::EmptyResult` when no file matches the issue
    pub fn issue_with_files(
        &self,
        issue: &IssueFile,
        files: &[CorpusFile],
        question: &str,
        mode: MergeMode,
    ) -> Result<AssembledPrompt, PromptPackError> {
        let header = issue.header();
        let suffix = question_suffix(question);
        let budget = self.reserve(&[QUESTION_PROMPT, header.as_str(), suffix.as_str()])?;

        let candidates: Vec<Candidate> = files.iter().map(CorpusFile::to_candidate).collect();
        let sheet = rank_files(files, &issue.search_query(question), mode)?;
        if sheet.is_empty() {
            return Err(PackError::EmptyResult {
                what: format!("files relevant to issue #{}", issue.number),
            }
            .into());
        }

        let policy = PackPolicy::RelevanceFirst(&sheet);
        let packed = pack_with_counters(&candidates, policy, budget.remaining(), self.counters)?;
        if packed.is_empty() {
            return Err(self.nothing_fits(&candidates, policy, budget.used)?.into());
        }
        debug!(files = ?packed.ids(), "Files selected for issue");

        self.finish("issue", format!("{header}{}{suffix}", packed.concat()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptpack_tokens::FastCounter;

    fn issue() -> IssueFile {
        serde_json::from_str(
            r#"{
                "number": 42,
                "title": "Crash on empty config",
                "body": "Parsing an empty file panics.",
                "comments": [
                    {"author": "alice", "body": "Reproduced on main."},
                    {"author": "bob", "body": "The parser unwraps the first table."}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_issue_defaults_for_missing_fields() {
        let issue: IssueFile = serde_json::from_str(r#"{"number": 1, "title": "t"}"#).unwrap();
        assert_eq!(issue.body, "");
        assert!(issue.comments.is_empty());
    }

    #[test]
    fn test_comments_prompt_layout() {
        let assembler = Assembler::new(&FastCounter, 10_000);
        let prompt = assembler.issue_with_comments(&issue(), "Why?").unwrap();
        assert_eq!(
            prompt.text,
            "Issue #42: Title: Crash on empty config\n\nParsing an empty file panics.\
             \n\nComment:\nAuthor: alice\nBody: Reproduced on main.\
             \n\nComment:\nAuthor: bob\nBody: The parser unwraps the first table.\
             \n\nGiven the following context, answer the following question: Why?"
        );
    }

    #[test]
    fn test_comments_stop_at_first_that_does_not_fit() {
        let header = issue().header();
        let suffix = question_suffix("Why?");
        let fixed = [QUESTION_PROMPT, header.as_str(), suffix.as_str()]
            .iter()
            .map(|s| s.len() / 4)
            .sum::<usize>();
        let first_comment = comment_section("alice", "Reproduced on main.").len() / 4;

        let assembler = Assembler::new(&FastCounter, fixed + first_comment);
        let prompt = assembler.issue_with_comments(&issue(), "Why?").unwrap();
        assert!(prompt.text.contains("Author: alice"));
        assert!(!prompt.text.contains("Author: bob"));
    }

    #[test]
    fn test_oversized_issue_is_budget_exceeded() {
        let assembler = Assembler::new(&FastCounter, 10);
        let err = assembler.issue_with_comments(&issue(), "Why?").unwrap_err();
        assert!(matches!(
            err,
            PromptPackError::Pack(PackError::BudgetExceeded { budget: 10, .. })
        ));
    }

    #[test]
    fn test_files_prompt_uses_issue_text_as_query() {
        let files = vec![
            CorpusFile {
                path: "src/parser.rs".to_string(),
                content: "fn parse_config(input: &str) { first_table().unwrap(); }".to_string(),
            },
            CorpusFile {
                path: "src/render.rs".to_string(),
                content: "fn draw() {}".to_string(),
            },
        ];
        let assembler = Assembler::new(&FastCounter, 10_000);
        let prompt = assembler
            .issue_with_files(&issue(), &files, "Which function parses config?", MergeMode::Sum)
            .unwrap();

        assert!(prompt.text.contains("\n\nFile: src/parser.rs\n"));
        assert!(prompt.text.ends_with("answer the following question: Which function parses config?"));
    }

    #[test]
    fn test_files_that_do_not_fit_are_budget_exceeded() {
        let header = issue().header();
        let suffix = question_suffix("Which function parses config?");
        let fixed = [QUESTION_PROMPT, header.as_str(), suffix.as_str()]
            .iter()
            .map(|s| s.len() / 4)
            .sum::<usize>();
        let files = vec![CorpusFile {
            path: "src/parser.rs".to_string(),
            content: format!("fn parse_config() {{ first_table().unwrap(); }}\n{}", "// pad\n".repeat(200)),
        }];
        let file_tokens = files[0].to_candidate().tokens(&FastCounter).unwrap();

        let assembler = Assembler::new(&FastCounter, fixed + 10);
        let err = assembler
            .issue_with_files(&issue(), &files, "Which function parses config?", MergeMode::Sum)
            .unwrap_err();

        match err {
            PromptPackError::Pack(PackError::BudgetExceeded { required, budget }) => {
                assert_eq!(budget, fixed + 10);
                assert_eq!(required, fixed + file_tokens);
            }
            other => panic!("Expected BudgetExceeded, got {other:?}"),
        }
    }
}
