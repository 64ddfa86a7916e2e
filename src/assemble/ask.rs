use promptpack_packet::{AssembledPrompt, Candidate, CorpusFile, PackPolicy, pack_with_counters};
use promptpack_retrieval::{MergeMode, RelevanceIndex, ScoreSheet, multi_query_search};
use promptpack_utils::error::{PackError, PromptPackError};
use tracing::debug;

use super::Assembler;
use crate::prompts::QUESTION_PROMPT;

const ANSWER_CUE: &str = "\nAnswer:";

impl Assembler<'_> {
    /// Prompt asking `question` about a single file.
    ///
    /// # Errors
    ///
    /// `PackError::BudgetExceeded` when the file and question do not fit.
    pub fn ask_file(
        &self,
        path: &str,
        contents: &str,
        question: &str,
    ) -> Result<AssembledPrompt, PromptPackError> {
        let text = format!(
            "File Name: {path}\nQuestion: {question}\n\n{}{ANSWER_CUE}",
            contents.trim_end_matches([' ', '\n'])
        );
        let required = self.counters.exact.count_all(&[QUESTION_PROMPT, text.as_str()])?;
        if required > self.limit {
            return Err(PackError::BudgetExceeded {
                required,
                budget: self.limit,
            }
            .into());
        }
        self.finish("ask", text)
    }

    /// Prompt asking `question` about the most relevant files of a corpus.
    ///
    /// Files are ranked by a multi-query search over an index that lives only
    /// for the duration of this call, then packed relevance-first.
    ///
    /// # Errors
    ///
    /// - `PackError::EmptyResult` when no file matches the question
    /// - `PackError::BudgetExceeded` when the question leaves no room for
    ///   even the best-ranked file
    /// - `PackError::SearchIndex` when the index cannot be built or queried
    pub fn ask_corpus(
        &self,
        files: &[CorpusFile],
        question: &str,
        mode: MergeMode,
    ) -> Result<AssembledPrompt, PromptPackError> {
        let candidates: Vec<Candidate> = files.iter().map(CorpusFile::to_candidate).collect();
        let sheet = rank_files(files, question, mode)?;
        if sheet.is_empty() {
            return Err(PackError::EmptyResult {
                what: format!("files relevant to \"{question}\""),
            }
            .into());
        }

        let head = format!("Question: {question}\n");
        let budget = self.reserve(&[QUESTION_PROMPT, head.as_str(), ANSWER_CUE])?;
        let policy = PackPolicy::RelevanceFirst(&sheet);
        let packed = pack_with_counters(&candidates, policy, budget.remaining(), self.counters)?;
        if packed.is_empty() {
            return Err(self.nothing_fits(&candidates, policy, budget.used)?.into());
        }

        debug!(files = ?packed.ids(), "Files selected for question");
        self.finish("ask", format!("{head}{}{ANSWER_CUE}", packed.concat()))
    }
}

impl Assembler<'_> {
    /// Error for a pack that came back empty: the cost of the fixed text plus
    /// the first candidate the policy would have taken.
    pub(super) fn nothing_fits(
        &self,
        candidates: &[Candidate],
        policy: PackPolicy<'_>,
        reserved: usize,
    ) -> Result<PackError, PackError> {
        let best = policy.order_with(candidates, self.counters)?;
        let required = match best.first() {
            Some(candidate) => reserved.saturating_add(candidate.tokens(self.counters.exact)?),
            None => reserved,
        };
        Ok(PackError::BudgetExceeded {
            required,
            budget: self.limit,
        })
    }
}

/// Scores for `files` against `query`, keyed by path. Each file is indexed
/// as its path followed by its contents. The index is dropped on return.
pub(super) fn rank_files(
    files: &[CorpusFile],
    query: &str,
    mode: MergeMode,
) -> Result<ScoreSheet, PackError> {
    let documents: Vec<String> = files
        .iter()
        .map(|f| format!("{}\n{}", f.path, f.content))
        .collect();
    let index = RelevanceIndex::build(
        files
            .iter()
            .zip(&documents)
            .map(|(f, doc)| (f.path.as_str(), doc.as_str())),
    )?;
    multi_query_search(&index, query, mode)
}
