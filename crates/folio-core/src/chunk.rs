//! Whitespace-boundary passage chunker.
//!
//! Splits the corrected text of a document into passages that respect a
//! configurable `max_chars` limit. Each passage becomes one record in the
//! index with its position as `chunk_index`.
//!
//! # Algorithm
//!
//! 1. With `max_chars == 0` the whole text is one passage.
//! 2. Otherwise split on whitespace and accumulate words, separated by a
//!    single space, until adding the next word would exceed `max_chars`.
//! 3. When exceeded, flush the buffer as a passage and start a new one.
//! 4. A single word longer than `max_chars` becomes its own passage.
//! 5. Guarantee at least one passage per document (even for empty text).
//!
//! Lengths are counted in characters, not bytes.
//!
//! # Example
//!
//! ```rust
//! use folio_core::chunk::chunk_text;
//!
//! let passages = chunk_text("Paris is the capital of France", 12);
//! assert_eq!(passages, vec!["Paris is the", "capital of", "France"]);
//! ```

/// Split `text` into passages of at most `max_chars` characters.
///
/// # Guarantees
///
/// - At least one passage is always returned (even for empty text).
/// - With a non-zero limit, passages hold whole words joined by single
///   spaces, in document order.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }

    let mut passages = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        let would_be = if current.is_empty() {
            word_chars
        } else {
            current_chars + 1 + word_chars
        };

        if would_be > max_chars && !current.is_empty() {
            passages.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;
    }

    if !current.is_empty() {
        passages.push(current);
    }
    if passages.is_empty() {
        passages.push(String::new());
    }
    passages
}
