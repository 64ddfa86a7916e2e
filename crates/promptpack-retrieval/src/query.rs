use once_cell::sync::Lazy;
use regex::Regex;

static TERM_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{P}\p{Zs}]+").unwrap());

/// Split free text on runs of punctuation and space separators, dropping
/// empty pieces.
///
/// ```rust
/// use promptpack_retrieval::split_terms;
///
/// assert_eq!(split_terms("where is parse_config()?"), vec!["where", "is", "parse", "config"]);
/// ```
#[must_use]
pub fn split_terms(text: &str) -> Vec<String> {
    TERM_SEPARATOR
        .split(text)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// FTS5 MATCH expression for a query: each term quoted as a phrase, phrases
/// joined with `OR`.
///
/// Returns `None` when the query has no term containing a letter or digit.
#[must_use]
pub fn match_expression(query: &str) -> Option<String> {
    let phrases: Vec<String> = split_terms(query)
        .into_iter()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();

    if phrases.is_empty() {
        None
    } else {
        Some(phrases.join(" OR "))
    }
}
