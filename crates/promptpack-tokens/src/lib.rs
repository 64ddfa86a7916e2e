//! Token estimation for promptpack.
//!
//! Two [`TokenCounter`] strategies are provided: [`ExactCounter`] runs the
//! `cl100k_base` BPE tokenizer, [`FastCounter`] approximates four bytes per
//! token. [`max_tokens`] answers how many prompt tokens a model accepts and
//! [`completion_room`] how many are left for the reply.

mod counter;
mod models;

pub use counter::{Counters, ExactCounter, FastCounter, TokenCounter, counter_for};
pub use models::{
    CHAT_FRAMING_TOKENS, KNOWN_MODELS, SAFETY_MARGIN_PERCENT, completion_room, context_window,
    effective_window, max_tokens,
};
