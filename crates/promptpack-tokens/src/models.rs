use tracing::warn;

/// Context windows of known models, in tokens.
pub const KNOWN_MODELS: &[(&str, usize)] = &[
    ("gpt-3.5-turbo", 4_096),
    ("gpt-3.5-turbo-16k", 16_384),
    ("gpt-4", 8_192),
    ("gpt-4-32k", 32_768),
    ("gpt-4-turbo", 128_000),
    ("gpt-4o", 128_000),
    ("gpt-4o-mini", 128_000),
];

/// Share of the window held back from prompts, rounded up.
pub const SAFETY_MARGIN_PERCENT: usize = 5;

/// Context window of a model, matched by longest known prefix.
///
/// `gpt-4-0613` resolves to `gpt-4`, `gpt-4o-mini-2024-07-18` to
/// `gpt-4o-mini`.
#[must_use]
pub fn context_window(model: &str) -> Option<usize> {
    KNOWN_MODELS
        .iter()
        .filter(|(name, _)| model.starts_with(name))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, window)| *window)
}

/// Tokens the chat format adds around a system and a user message.
pub const CHAT_FRAMING_TOKENS: usize = 11;

/// Context window used for `model`.
///
/// `window_override` replaces the table value. Unknown models fail closed to
/// the smallest known window.
#[must_use]
pub fn effective_window(model: &str, window_override: Option<usize>) -> usize {
    match window_override.or_else(|| context_window(model)) {
        Some(window) => window,
        None => {
            let fallback = smallest_window();
            warn!(
                model = %model,
                fallback_window = fallback,
                "Unknown model, using smallest known context window"
            );
            fallback
        }
    }
}

/// Maximum prompt tokens for `model`: its window minus the safety margin.
#[must_use]
pub fn max_tokens(model: &str, window_override: Option<usize>) -> usize {
    let window = effective_window(model, window_override);
    window - window.saturating_mul(SAFETY_MARGIN_PERCENT).div_ceil(100)
}

/// Completion size that keeps a request inside `window`.
///
/// `prompt_tokens` covers the system and user messages. Never less than one,
/// so an over-full request is rejected by the provider instead of asking for
/// an empty reply.
#[must_use]
pub fn completion_room(window: usize, prompt_tokens: usize) -> usize {
    window
        .saturating_sub(prompt_tokens.saturating_add(CHAT_FRAMING_TOKENS))
        .max(1)
}

fn smallest_window() -> usize {
    KNOWN_MODELS
        .iter()
        .map(|(_, window)| *window)
        .min()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(context_window("gpt-4"), Some(8_192));
        assert_eq!(context_window("gpt-4-0613"), Some(8_192));
        assert_eq!(context_window("gpt-4-32k-0613"), Some(32_768));
        assert_eq!(context_window("gpt-4o-2024-05-13"), Some(128_000));
        assert_eq!(context_window("gpt-3.5-turbo-16k-0613"), Some(16_384));
        assert_eq!(context_window("claude-3-opus"), None);
    }

    #[test]
    fn test_margin_is_rounded_up() {
        // 5% of 4096 is 204.8
        assert_eq!(max_tokens("gpt-3.5-turbo", None), 4_096 - 205);
        assert_eq!(max_tokens("gpt-4", None), 8_192 - 410);
        assert_eq!(max_tokens("gpt-4o", None), 128_000 - 6_400);
    }

    #[test]
    fn test_unknown_model_fails_closed() {
        assert_eq!(max_tokens("mystery-model", None), max_tokens("gpt-3.5-turbo", None));
    }

    #[test]
    fn test_override_replaces_window() {
        assert_eq!(max_tokens("gpt-3.5-turbo", Some(1_000)), 950);
        assert_eq!(max_tokens("mystery-model", Some(100_000)), 95_000);
    }

    #[test]
    fn test_effective_window_prefers_override() {
        assert_eq!(effective_window("gpt-4", None), 8_192);
        assert_eq!(effective_window("gpt-4", Some(2_000)), 2_000);
        assert_eq!(effective_window("mystery-model", None), 4_096);
    }

    #[test]
    fn test_completion_room_fills_the_window() {
        let prompt = max_tokens("gpt-3.5-turbo", None);
        let room = completion_room(4_096, prompt);
        assert_eq!(prompt + room + CHAT_FRAMING_TOKENS, 4_096);
        assert!(room >= 4_096 * SAFETY_MARGIN_PERCENT / 100 - CHAT_FRAMING_TOKENS);
    }

    #[test]
    fn test_completion_room_is_at_least_one() {
        assert_eq!(completion_room(4_096, 4_096), 1);
        assert_eq!(completion_room(100, usize::MAX), 1);
    }

    #[test]
    fn test_every_known_model_has_positive_budget() {
        for (name, window) in KNOWN_MODELS {
            let budget = max_tokens(name, None);
            assert!(budget > 0 && budget < *window, "{name}");
        }
    }
}
