//! Prompt assembly from ranked passages.
//!
//! Passages are joined in rank order with `"\n"`. When the joined context
//! holds more than `max_words` whitespace tokens it is cut to exactly the
//! first `max_words` tokens, re-joined with single spaces. The cut ignores
//! passage boundaries, so the lowest-ranked passage may be split mid-way.

use std::fmt;

use serde::Serialize;

use crate::models::SearchHit;

pub const DEFAULT_MAX_WORDS: usize = 512;

/// An assembled prompt, rendered by [`Display`](fmt::Display).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub context: String,
    pub query: String,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Context: {}\n\nQuestion: {}\nAnswer:",
            self.context, self.query
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAssembler {
    max_words: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORDS)
    }
}

impl ContextAssembler {
    pub fn new(max_words: usize) -> Self {
        Self { max_words }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn assemble(&self, query: &str, passages: &[SearchHit]) -> Prompt {
        let texts: Vec<&str> = passages.iter().map(|h| h.metadata.text.as_str()).collect();
        self.assemble_texts(query, &texts)
    }

    pub fn assemble_texts(&self, query: &str, passages: &[&str]) -> Prompt {
        let joined = passages.join("\n");
        let context = if joined.split_whitespace().count() > self.max_words {
            joined
                .split_whitespace()
                .take(self.max_words)
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            joined
        };
        Prompt {
            context,
            query: query.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_context_is_verbatim() {
        let prompt = ContextAssembler::default().assemble_texts("Q?", &["a  b", "c"]);
        assert_eq!(prompt.context, "a  b\nc");
        assert_eq!(prompt.to_string(), "Context: a  b\nc\n\nQuestion: Q?\nAnswer:");
    }

    #[test]
    fn test_long_context_keeps_first_words() {
        let prompt = ContextAssembler::new(4).assemble_texts("Q?", &["one two three", "four five six"]);
        assert_eq!(prompt.context, "one two three four");
    }

    #[test]
    fn test_exact_limit_is_not_truncated() {
        let prompt = ContextAssembler::new(3).assemble_texts("Q?", &["one\ttwo", "three"]);
        assert_eq!(prompt.context, "one\ttwo\nthree");
    }

    #[test]
    fn test_truncation_at_default_limit() {
        let words: Vec<String> = (0..600).map(|i| format!("w{}", i)).collect();
        let first = words[..300].join(" ");
        let second = words[300..].join(" ");
        let prompt = ContextAssembler::default().assemble_texts("Q?", &[&first, &second]);
        let kept: Vec<&str> = prompt.context.split(' ').collect();
        assert_eq!(kept.len(), 512);
        assert_eq!(kept[0], "w0");
        assert_eq!(kept[511], "w511");
    }

    #[test]
    fn test_no_passages() {
        let prompt = ContextAssembler::default().assemble_texts("Anything?", &[]);
        assert_eq!(prompt.to_string(), "Context: \n\nQuestion: Anything?\nAnswer:");
    }
}
