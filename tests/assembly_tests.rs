//! End-to-end assembly over a small repository on disk
//!
//! These tests walk a temporary tree, rank it with the full-text index and
//! check the prompts the assembler produces.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use camino::Utf8Path;
use promptpack::assemble::{Assembler, IssueComment, IssueFile};
use promptpack::config::Selectors;
use promptpack::llm::{LlmBackend, LlmInvocation, LlmResult, complete};
use promptpack::packet::CorpusWalker;
use promptpack::prompts::QUESTION_PROMPT;
use promptpack::retrieval::MergeMode;
use promptpack::tokens::{
    CHAT_FRAMING_TOKENS, Counters, ExactCounter, FastCounter, TokenCounter, completion_room,
    effective_window,
};
use promptpack::{Config, LlmError, PackError, PromptPackError};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn sample_repo() -> Result<TempDir> {
    let temp = TempDir::new()?;
    write(
        temp.path(),
        "src/budget.rs",
        "pub struct TokenBudget { limit: usize }\n// tracks the token budget while packing\n",
    )?;
    write(
        temp.path(),
        "src/render.rs",
        "pub fn render_markdown(text: &str) -> String { text.to_string() }\n",
    )?;
    write(temp.path(), "README.md", "A tool that renders markdown.\n")?;
    write(temp.path(), "target/debug/build.log", "token budget noise\n")?;
    Ok(temp)
}

fn walk(root: &Path, selectors: &Selectors) -> Result<Vec<promptpack::packet::CorpusFile>> {
    let root = Utf8Path::from_path(root).ok_or_else(|| anyhow::anyhow!("non UTF-8 temp dir"))?;
    Ok(CorpusWalker::new(selectors.compile()?).walk(root)?)
}

#[test]
fn ask_corpus_puts_the_best_match_first() -> Result<()> {
    let repo = sample_repo()?;
    let files = walk(repo.path(), &Selectors::default())?;
    assert_eq!(files.len(), 3);

    let assembler = Assembler::new(&FastCounter, 4_000);
    let prompt = assembler.ask_corpus(&files, "token budget", MergeMode::Sum)?;

    assert!(prompt.text.starts_with("Question: token budget\n"));
    assert!(prompt.text.ends_with("\nAnswer:"));
    assert!(prompt.text.contains("File: src/budget.rs"));
    assert!(!prompt.text.contains("target/debug/build.log"));
    assert!(!prompt.text.contains("File: src/render.rs"));
    assert_eq!(prompt.blake3_hash.len(), 64);
    Ok(())
}

#[test]
fn ask_corpus_reports_no_matches() -> Result<()> {
    let repo = sample_repo()?;
    let files = walk(repo.path(), &Selectors::default())?;
    let assembler = Assembler::new(&FastCounter, 4_000);

    let err = assembler
        .ask_corpus(&files, "kubernetes", MergeMode::Average)
        .unwrap_err();
    assert!(matches!(
        err,
        PromptPackError::Pack(PackError::EmptyResult { .. })
    ));
    assert_eq!(err.to_exit_code().as_i32(), 3);
    Ok(())
}

#[test]
fn ask_corpus_fails_when_question_leaves_no_room() -> Result<()> {
    let repo = sample_repo()?;
    let files = walk(repo.path(), &Selectors::default())?;
    let assembler = Assembler::new(&FastCounter, 10);

    let err = assembler
        .ask_corpus(&files, "token budget", MergeMode::Sum)
        .unwrap_err();
    assert!(matches!(
        err,
        PromptPackError::Pack(PackError::BudgetExceeded { budget: 10, .. })
    ));
    assert_eq!(err.to_exit_code().as_i32(), 7);
    Ok(())
}

#[test]
fn issue_comments_are_truncated_in_order() -> Result<()> {
    let issue = IssueFile {
        number: 12,
        title: "Crash on empty diff".to_string(),
        body: "Running describe with an empty diff panics.".to_string(),
        comments: (1..=20)
            .map(|n| IssueComment {
                author: format!("user{n}"),
                body: format!("comment number {n} {}", "x".repeat(200)),
            })
            .collect(),
    };

    let assembler = Assembler::new(&FastCounter, 800);
    let prompt = assembler.issue_with_comments(&issue, "What is the root cause?")?;

    assert!(prompt.text.starts_with("Issue #12: Title: Crash on empty diff"));
    assert!(prompt.text.contains("Author: user1\n"));
    assert!(!prompt.text.contains("Author: user20\n"));
    assert!(prompt.text.ends_with("answer the following question: What is the root cause?"));
    assert!(prompt.tokens <= 800);
    Ok(())
}

#[test]
fn assembler_uses_the_configured_window() -> Result<()> {
    let config = Config::builder()
        .model("gpt-4")
        .token_strategy("fast")
        .build()?;
    assert_eq!(Assembler::for_config(&config, Counters::single(&FastCounter)).limit(), 7_782);

    let config = Config::builder()
        .model("gpt-4")
        .context_window(1_000)
        .build()?;
    assert_eq!(Assembler::for_config(&config, Counters::single(&FastCounter)).limit(), 950);
    Ok(())
}

/// Replies "ok" and keeps every request.
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<LlmInvocation>>,
}

#[async_trait]
impl LlmBackend for Recorder {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        self.seen.lock().unwrap().push(inv);
        Ok(LlmResult::new("ok", "recorder", "mock"))
    }
}

#[tokio::test]
async fn answer_request_stays_inside_the_context_window() -> Result<()> {
    let repo = TempDir::new()?;
    for n in 0..20 {
        write(
            repo.path(),
            &format!("src/module_{n}.rs"),
            &format!("// budget notes {n}\n{}", "let budget = tokens + 1;\n".repeat(40)),
        )?;
    }
    let files = walk(repo.path(), &Selectors::default())?;
    assert_eq!(files.len(), 20);

    let config = Config::builder().model("gpt-3.5-turbo").build()?;
    let exact = ExactCounter::new()?;
    let assembler = Assembler::for_config(&config, Counters::single(&exact));
    let prompt = assembler.ask_corpus(&files, "token budget", MergeMode::Sum)?;
    // packed close to the 3891-token prompt limit
    assert!(prompt.tokens > 3_000);

    let prompt_tokens = prompt.tokens + exact.count(QUESTION_PROMPT)?;
    assert!(prompt_tokens <= assembler.limit());
    let room = completion_room(
        effective_window(config.model(), config.context_window()),
        prompt_tokens,
    );

    let backend = Recorder::default();
    complete(
        &backend,
        config.model(),
        config.llm_timeout(),
        QUESTION_PROMPT,
        &prompt.text,
        room,
    )
    .await?;

    let seen = backend.seen.lock().unwrap();
    let max_tokens = seen[0].metadata["max_tokens"]
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .unwrap();
    assert_eq!(max_tokens, room);
    assert!(prompt_tokens + CHAT_FRAMING_TOKENS + max_tokens <= 4_096);
    assert!(max_tokens >= 4_096 - 3_891 - CHAT_FRAMING_TOKENS);
    Ok(())
}

#[test]
fn fast_strategy_decides_fit_with_the_tokenizer() -> Result<()> {
    // Single letters separated by spaces cost one token each but four of
    // them fit in the fast estimate of a single token.
    let spaced = "a b c d e f g h i j k l m n o p ".repeat(20);
    let files = vec![promptpack::packet::CorpusFile {
        path: "notes/budget.txt".to_string(),
        content: format!("budget\n{spaced}"),
    }];
    let candidate = files[0].to_candidate();
    let exact = ExactCounter::new()?;
    let file_tokens = exact.count(candidate.content())?;
    let fixed = exact.count_all(&[QUESTION_PROMPT, "Question: budget\n", "\nAnswer:"])?;
    let fast_tokens = FastCounter.count(candidate.content())?;
    assert!(fast_tokens < file_tokens);

    // Room for the estimate but not for the real count
    let limit = fixed + fast_tokens;
    let mixed = Assembler::with_counters(Counters::new(&FastCounter, &exact), limit);
    let err = mixed.ask_corpus(&files, "budget", MergeMode::Sum).unwrap_err();
    assert!(matches!(
        err,
        PromptPackError::Pack(PackError::BudgetExceeded { required, .. }) if required == fixed + file_tokens
    ));

    let roomy = Assembler::with_counters(Counters::new(&FastCounter, &exact), fixed + file_tokens);
    let prompt = roomy.ask_corpus(&files, "budget", MergeMode::Sum)?;
    assert!(prompt.text.contains("File: notes/budget.txt"));
    Ok(())
}
