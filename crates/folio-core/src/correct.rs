//! Post-OCR text correction.
//!
//! Correction is two passes over the raw OCR text:
//!
//! 1. Every purely alphabetic whitespace token is offered to a
//!    [`Dictionary`]; a proposal replaces the token, otherwise it is kept.
//!    Tokens are re-joined with single spaces.
//! 2. An ordered list of literal [`Substitution`]s is applied to the whole
//!    string, each one seeing the result of the previous.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use folio_core::correct::{FrequencyDictionary, TextCorrector};
//!
//! let dict = FrequencyDictionary::from_words("en-test", ["capital", "france"]);
//! let corrector = TextCorrector::new(Arc::new(dict));
//! assert_eq!(corrector.correct("the capitol of Frnce"), "the capital of France");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A spelling dictionary consulted token by token.
///
/// Implementations must be deterministic for a given [`version`](Dictionary::version).
pub trait Dictionary: Send + Sync {
    /// Identifier of the word list snapshot.
    fn version(&self) -> &str;

    /// Proposed replacement for `word`, or `None` to keep it.
    fn correction(&self, word: &str) -> Option<String>;
}

/// Dictionary that never proposes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDictionary;

impl Dictionary for NoDictionary {
    fn version(&self) -> &str {
        "none"
    }

    fn correction(&self, _word: &str) -> Option<String> {
        None
    }
}

/// Frequency-ranked word list with edit-distance candidates.
///
/// Known words correct to themselves. Unknown ASCII words take the most
/// frequent known word at edit distance 1, then 2, ties broken
/// lexicographically. Non-ASCII words are only matched exactly.
#[derive(Debug, Clone)]
pub struct FrequencyDictionary {
    version: String,
    counts: HashMap<String, u64>,
    /// Longest known word, in chars.
    max_word_len: usize,
}

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

impl FrequencyDictionary {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            counts: HashMap::new(),
            max_word_len: 0,
        }
    }

    /// Build from bare words, each with count 1.
    pub fn from_words<I, S>(version: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self::new(version);
        for word in words {
            dict.add(word.as_ref(), 1);
        }
        dict
    }

    /// Parse a word list with one `word [count]` entry per line.
    ///
    /// Blank lines and lines starting with `#` are ignored; a missing or
    /// unparsable count is 1.
    pub fn parse(version: impl Into<String>, source: &str) -> Self {
        let mut dict = Self::new(version);
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let count = parts.next().and_then(|c| c.parse().ok()).unwrap_or(1);
            dict.add(word, count);
        }
        dict
    }

    pub fn add(&mut self, word: &str, count: u64) {
        let lower = word.to_lowercase();
        self.max_word_len = self.max_word_len.max(lower.chars().count());
        *self.counts.entry(lower).or_insert(0) += count;
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.counts.contains_key(&word.to_lowercase())
    }

    fn best_known<I: IntoIterator<Item = String>>(&self, candidates: I) -> Option<String> {
        let mut best: Option<(u64, String)> = None;
        for candidate in candidates {
            let Some(&count) = self.counts.get(&candidate) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((best_count, best_word)) => {
                    count > *best_count || (count == *best_count && candidate < *best_word)
                }
            };
            if better {
                best = Some((count, candidate));
            }
        }
        best.map(|(_, word)| word)
    }

    fn lookup(&self, lower: &str) -> Option<String> {
        if self.counts.contains_key(lower) {
            return Some(lower.to_string());
        }
        // Nothing known lies within two edits of a token this long.
        if !lower.is_ascii() || lower.len() > self.max_word_len + 2 {
            return None;
        }
        let first = edits1(lower);
        if let Some(found) = self.best_known(first.iter().cloned()) {
            return Some(found);
        }
        self.best_known(first.iter().flat_map(|w| edits1(w)))
    }
}

impl Dictionary for FrequencyDictionary {
    fn version(&self) -> &str {
        &self.version
    }

    fn correction(&self, word: &str) -> Option<String> {
        let lower = word.to_lowercase();
        let found = self.lookup(&lower)?;
        Some(match_case(word, &found))
    }
}

/// All strings one deletion, transposition, replacement or insertion away.
///
/// `word` must be ASCII so every byte offset is a char boundary.
fn edits1(word: &str) -> Vec<String> {
    let n = word.len();
    let bytes = word.as_bytes();
    let mut out = Vec::with_capacity(54 * n + 25);
    for i in 0..n {
        out.push(format!("{}{}", &word[..i], &word[i + 1..]));
    }
    for i in 0..n.saturating_sub(1) {
        out.push(format!(
            "{}{}{}{}",
            &word[..i],
            bytes[i + 1] as char,
            bytes[i] as char,
            &word[i + 2..]
        ));
    }
    for i in 0..n {
        for &c in ALPHABET {
            if c != bytes[i] {
                out.push(format!("{}{}{}", &word[..i], c as char, &word[i + 1..]));
            }
        }
    }
    for i in 0..=n {
        for &c in ALPHABET {
            out.push(format!("{}{}{}", &word[..i], c as char, &word[i..]));
        }
    }
    out
}

/// Re-apply the case shape of `original` (UPPER, Capitalized, lower) to
/// the lowercase `proposal`. Mixed case keeps the dictionary form.
fn match_case(original: &str, proposal: &str) -> String {
    let mut chars = original.chars();
    let Some(first) = chars.next() else {
        return proposal.to_string();
    };
    if !first.is_uppercase() {
        return proposal.to_string();
    }
    let rest: Vec<char> = chars.collect();
    if rest.iter().all(|c| c.is_uppercase()) {
        return proposal.to_uppercase();
    }
    if rest.iter().all(|c| !c.is_uppercase()) {
        let mut p = proposal.chars();
        return match p.next() {
            Some(c) => c.to_uppercase().chain(p).collect(),
            None => String::new(),
        };
    }
    proposal.to_string()
}

/// A literal `from → to` replacement applied after dictionary correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

impl Substitution {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Fixes for OCR confusions the dictionary cannot see.
pub fn default_substitutions() -> Vec<Substitution> {
    vec![
        Substitution::new("\\CHELOR", "BACHELOR"),
        Substitution::new("Jniversity", "University"),
    ]
}

#[derive(Clone)]
pub struct TextCorrector {
    dictionary: Arc<dyn Dictionary>,
    substitutions: Vec<Substitution>,
}

impl std::fmt::Debug for TextCorrector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextCorrector")
            .field("dictionary", &self.dictionary.version())
            .field("substitutions", &self.substitutions)
            .finish()
    }
}

impl Default for TextCorrector {
    fn default() -> Self {
        Self::new(Arc::new(NoDictionary))
    }
}

impl TextCorrector {
    /// Corrector with the default substitution list.
    pub fn new(dictionary: Arc<dyn Dictionary>) -> Self {
        Self {
            dictionary,
            substitutions: default_substitutions(),
        }
    }

    pub fn with_substitutions(mut self, substitutions: Vec<Substitution>) -> Self {
        self.substitutions = substitutions;
        self
    }

    pub fn dictionary_version(&self) -> &str {
        self.dictionary.version()
    }

    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    pub fn correct(&self, raw: &str) -> String {
        let mut text = raw
            .split_whitespace()
            .map(|token| {
                if token.chars().all(char::is_alphabetic) {
                    self.dictionary
                        .correction(token)
                        .unwrap_or_else(|| token.to_string())
                } else {
                    token.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        for sub in &self.substitutions {
            if !sub.from.is_empty() {
                text = text.replace(&sub.from, &sub.to);
            }
        }
        text
    }
}
