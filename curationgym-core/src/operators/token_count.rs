//! token_count.rs - Deterministic token counting (§4.1).
//!
//! No external tokenizer model is fabricated as a dependency: the spec
//! permits "a fixed tokenizer identified by name", so this ships a
//! deterministic whitespace/punctuation splitter named `"whitespace-v1"`.
//! Idempotent: running it twice over the same text yields the same count.

use crate::document::Document;

pub const TOKENIZER_NAME: &str = "whitespace-v1";

/// Splits `text` on whitespace and punctuation boundaries, discarding empty
/// tokens, returning the token count.
pub fn count_tokens(text: &str) -> u64 {
    text.split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '\''))
        .filter(|t| !t.is_empty())
        .count() as u64
}

pub struct TokenCountOperator;

impl TokenCountOperator {
    pub fn apply(&self, doc: &mut Document) {
        doc.metadata.known.token_count = Some(count_tokens(&doc.text));
    }
}
